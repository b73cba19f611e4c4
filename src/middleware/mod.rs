//! Request interceptors composed around the route dispatcher
//!
//! Order, outermost first: [`context::tag_request`] assigns the request
//! context, [`metrics::record_metrics`] records entry and exit, and
//! [`panic::handle_panic`] turns handler panics into exception responses.

pub mod context;
pub mod metrics;
pub mod panic;
