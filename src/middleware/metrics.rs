//! Metrics recording middleware
//!
//! Entry: marks the request in flight for its country.
//! Exit: records the request counter, latency, route visit and, for error
//! responses, the error counter. The in-flight gauge is released by a guard,
//! so it is decremented on every exit path.

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::error::ErrorKind;
use crate::geo::UNKNOWN_LABEL;
use crate::handlers::AppState;
use crate::metrics::Metrics;
use crate::middleware::context::RequestContext;

/// Endpoint and path label for requests that matched no route
pub const UNMATCHED_LABEL: &str = "unknown";

/// Endpoint name for a matched route template
///
/// `/` becomes `index`; other templates drop the leading slash and path
/// parameter braces and join segments with `_` (`/api/data` → `api_data`).
pub fn endpoint_name(route: &str) -> String {
    let trimmed = route.trim_matches('/');
    if trimmed.is_empty() {
        return "index".to_string();
    }

    trimmed
        .split('/')
        .map(|segment| segment.trim_start_matches('{').trim_end_matches('}'))
        .collect::<Vec<_>>()
        .join("_")
}

/// Middleware that records request metrics
pub async fn record_metrics(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let metrics = state.metrics();

    let (country, started_at) = match request.extensions().get::<RequestContext>() {
        Some(context) => (context.country().to_string(), context.started_at()),
        None => (UNKNOWN_LABEL.to_string(), Instant::now()),
    };
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string());

    let _active = match metrics.track_active(&country) {
        Ok(guard) => Some(guard),
        Err(e) => {
            report_failure(metrics, "track_active", &e);
            None
        }
    };

    let response = next.run(request).await;

    let status = response.status();
    let endpoint = route.as_deref().map(endpoint_name);
    let endpoint_label = endpoint.as_deref().unwrap_or(UNMATCHED_LABEL);
    let elapsed = started_at.elapsed().as_secs_f64();

    if let Err(e) = metrics.record_request(&method, endpoint_label, status.as_u16(), &country) {
        report_failure(metrics, "record_request", &e);
    }
    if let Err(e) = metrics.record_latency(endpoint_label, elapsed) {
        report_failure(metrics, "record_latency", &e);
    }
    if let Err(e) =
        metrics.record_route_visit(route.as_deref().unwrap_or(UNMATCHED_LABEL), &country)
    {
        report_failure(metrics, "record_route_visit", &e);
    }

    let error_kind = response
        .extensions()
        .get::<ErrorKind>()
        .copied()
        .or_else(|| ErrorKind::from_status(status));

    if let Some(kind) = error_kind {
        let error_endpoint = endpoint.as_deref().unwrap_or(kind.fallback_endpoint());
        if let Err(e) = metrics.record_error(error_endpoint, kind) {
            report_failure(metrics, "record_error", &e);
        }
    }

    tracing::debug!(
        method = %method,
        endpoint = endpoint_label,
        status = status.as_u16(),
        country = %country,
        elapsed_ms = elapsed * 1000.0,
        error_type = error_kind.map(|kind| kind.as_str()),
        "Request completed"
    );

    response
}

// Recording failures never change the response
fn report_failure(metrics: &Metrics, operation: &str, error: &prometheus::Error) {
    tracing::warn!(
        operation,
        error = %error,
        "Failed to record request metrics"
    );
    metrics.metrics_recording_failure(operation);
}
