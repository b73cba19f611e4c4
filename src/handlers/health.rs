//! Health check endpoint
//!
//! Provides a simple health check for monitoring and load balancers.

/// Body returned by `/health`
pub const HEALTHY_BODY: &str = "Status: Healthy\n";

/// Health check handler
///
/// Always 200 with a fixed body, independent of country tagging and metrics.
pub async fn handler() -> &'static str {
    HEALTHY_BODY
}
