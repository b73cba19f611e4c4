//! geotally - demo HTTP service for exercising a CI/CD pipeline
//!
//! Serves a handful of text routes in one of three incremental variants.
//! The instrumented variant tags every request with a mock country and records
//! per-country Prometheus metrics, exposed at `/metrics`.

pub mod cli;
pub mod config;
pub mod error;
pub mod geo;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod telemetry;
