//! Prometheus metrics collection for geotally
//!
//! This module provides metrics instrumentation for tracking:
//! - Request counts by method, endpoint, status and country
//! - Request latency by endpoint
//! - Route visits by path and country
//! - Requests currently in flight by country
//! - Error responses by endpoint and error kind
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.
//! The registry is owned by [`Metrics`] and injected through application state,
//! so every test can build a fresh one.

use crate::error::ErrorKind;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

pub const REQUESTS_TOTAL: &str = "app_requests_total";
pub const REQUEST_LATENCY: &str = "app_request_latency_seconds";
pub const ROUTE_VISITS: &str = "app_route_visits_total";
pub const ACTIVE_USERS: &str = "app_active_users";
pub const ERRORS_TOTAL: &str = "app_errors_total";
pub const RECORDING_FAILURES: &str = "app_metrics_recording_failures_total";

/// Metrics collector for geotally
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    requests_total: IntCounterVec,
    request_latency: HistogramVec,
    route_visits: IntCounterVec,
    active_users: IntGaugeVec,
    errors_total: IntCounterVec,
    metrics_recording_failures: IntCounterVec,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: methods × routes × statuses × (countries + Local + Unknown).
        // Unmatched paths collapse to endpoint="unknown".
        let requests_total = IntCounterVec::new(
            Opts::new(
                REQUESTS_TOTAL,
                "Total HTTP requests by method, endpoint, status and country",
            ),
            &["method", "endpoint", "status", "country"],
        )?;

        let request_latency = HistogramVec::new(
            HistogramOpts::new(REQUEST_LATENCY, "HTTP request latency in seconds by endpoint")
                .buckets(prometheus::DEFAULT_BUCKETS.to_vec()),
            &["endpoint"],
        )?;

        let route_visits = IntCounterVec::new(
            Opts::new(ROUTE_VISITS, "Route visits by route path and country"),
            &["path", "country"],
        )?;

        let active_users = IntGaugeVec::new(
            Opts::new(ACTIVE_USERS, "Requests currently in flight by country"),
            &["country"],
        )?;

        let errors_total = IntCounterVec::new(
            Opts::new(ERRORS_TOTAL, "Error responses by endpoint and error type"),
            &["endpoint", "error_type"],
        )?;

        // Labels:
        // - operation: record_request, record_latency, record_route_visit,
        //   record_error, track_active
        let metrics_recording_failures = IntCounterVec::new(
            Opts::new(
                RECORDING_FAILURES,
                "Metrics recording operation failures by operation. \
                Indicates Prometheus internal errors - frequent failures require investigation.",
            ),
            &["operation"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_latency.clone()))?;
        registry.register(Box::new(route_visits.clone()))?;
        registry.register(Box::new(active_users.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;
        registry.register(Box::new(metrics_recording_failures.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            request_latency,
            route_visits,
            active_users,
            errors_total,
            metrics_recording_failures,
        })
    }

    /// Record a completed request
    ///
    /// `endpoint` is the route's endpoint name, or `"unknown"` when no route matched.
    pub fn record_request(
        &self,
        method: &str,
        endpoint: &str,
        status: u16,
        country: &str,
    ) -> Result<(), prometheus::Error> {
        let status = status.to_string();
        self.requests_total
            .get_metric_with_label_values(&[method, endpoint, status.as_str(), country])?
            .inc();
        Ok(())
    }

    /// Record request latency in seconds
    ///
    /// # Errors
    ///
    /// Returns an error if `seconds` is NaN, infinite or negative. Such values
    /// corrupt histogram sums and quantiles.
    pub fn record_latency(&self, endpoint: &str, seconds: f64) -> Result<(), prometheus::Error> {
        if !seconds.is_finite() {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be finite (not NaN or Infinity), got: {}",
                seconds
            )));
        }

        if seconds < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be non-negative (duration cannot be negative), got: {}",
                seconds
            )));
        }

        self.request_latency
            .get_metric_with_label_values(&[endpoint])?
            .observe(seconds);
        Ok(())
    }

    /// Record a visit to a route for a country
    pub fn record_route_visit(&self, path: &str, country: &str) -> Result<(), prometheus::Error> {
        self.route_visits
            .get_metric_with_label_values(&[path, country])?
            .inc();
        Ok(())
    }

    /// Record an error response
    pub fn record_error(&self, endpoint: &str, kind: ErrorKind) -> Result<(), prometheus::Error> {
        self.errors_total
            .get_metric_with_label_values(&[endpoint, kind.as_str()])?
            .inc();
        Ok(())
    }

    /// Mark a request for `country` as in flight
    ///
    /// The returned guard decrements the gauge when dropped, so the gauge is
    /// released on every exit path: normal return, early return, unwinding
    /// and cancellation of the request future.
    pub fn track_active(&self, country: &str) -> Result<ActiveRequestGuard, prometheus::Error> {
        let gauge = self.active_users.get_metric_with_label_values(&[country])?;
        gauge.inc();
        Ok(ActiveRequestGuard { gauge })
    }

    /// Record a metrics recording operation failure
    pub fn metrics_recording_failure(&self, operation: &str) {
        self.metrics_recording_failures
            .with_label_values(&[operation])
            .inc();
    }

    /// Total metrics recording failures across all operations
    pub fn metrics_recording_failures_count(&self) -> u64 {
        self.counter_sum(RECORDING_FAILURES, &[]) as u64
    }

    /// Current in-flight requests for a country (0 if never seen)
    pub fn active_users(&self, country: &str) -> i64 {
        self.registry
            .gather()
            .iter()
            .find(|mf| mf.name() == ACTIVE_USERS)
            .and_then(|mf| {
                mf.get_metric()
                    .iter()
                    .find(|m| has_labels(m, &[("country", country)]))
                    .map(|m| m.gauge.value.unwrap_or(0.0) as i64)
            })
            .unwrap_or(0)
    }

    /// Sum of all in-flight gauges across countries
    pub fn active_users_total(&self) -> i64 {
        self.registry
            .gather()
            .iter()
            .find(|mf| mf.name() == ACTIVE_USERS)
            .map(|mf| {
                mf.get_metric()
                    .iter()
                    .map(|m| m.gauge.value.unwrap_or(0.0) as i64)
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Error count for an error kind, summed across endpoints
    pub fn errors_count(&self, kind: ErrorKind) -> u64 {
        self.counter_sum(ERRORS_TOTAL, &[("error_type", kind.as_str())]) as u64
    }

    /// Request count matching every given `(label, value)` pair
    pub fn requests_count(&self, filter: &[(&str, &str)]) -> u64 {
        self.counter_sum(REQUESTS_TOTAL, filter) as u64
    }

    /// Sum a counter family across series whose labels match `filter`
    ///
    /// Reads through `gather()` so that querying never creates empty series.
    fn counter_sum(&self, name: &str, filter: &[(&str, &str)]) -> f64 {
        self.registry
            .gather()
            .iter()
            .find(|mf| mf.name() == name)
            .map(|mf| {
                mf.get_metric()
                    .iter()
                    .filter(|m| has_labels(m, filter))
                    .map(|m| m.counter.value.unwrap_or(0.0))
                    .sum()
            })
            .unwrap_or(0.0)
    }

    /// Gather all metrics and encode them in Prometheus text format
    ///
    /// # Returns
    ///
    /// A string containing all metrics in Prometheus exposition format,
    /// suitable for the `/metrics` endpoint. A registry with no observed
    /// series encodes to an empty string.
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();
        let metric_count = metric_families.len();

        tracing::debug!(
            metric_family_count = metric_count,
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();

        encoder.encode(&metric_families, &mut buffer).map_err(|e| {
            let metric_names: Vec<_> = metric_families.iter().map(|mf| mf.name()).collect();

            tracing::error!(
                error = %e,
                metric_family_count = metric_count,
                metric_names = ?metric_names,
                "Prometheus text encoder failed"
            );

            prometheus::Error::Msg(format!(
                "Failed to encode {} metric families: {}",
                metric_count, e
            ))
        })?;

        String::from_utf8(buffer).map_err(|e| {
            let valid_up_to = e.utf8_error().valid_up_to();

            tracing::error!(
                invalid_byte_index = valid_up_to,
                "Prometheus encoder produced invalid UTF-8"
            );

            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8 at byte {}: {}",
                valid_up_to, e
            ))
        })
    }
}

fn has_labels(metric: &prometheus::proto::Metric, filter: &[(&str, &str)]) -> bool {
    filter.iter().all(|(name, value)| {
        metric
            .label
            .iter()
            .any(|pair| pair.name() == *name && pair.value() == *value)
    })
}

/// In-flight marker for one request
///
/// Created by [`Metrics::track_active`]; decrements the country's gauge on drop.
#[must_use = "dropping the guard immediately releases the in-flight gauge"]
pub struct ActiveRequestGuard {
    gauge: IntGauge,
}

impl Drop for ActiveRequestGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}
