//! Integration tests for request tagging and metrics recording
//!
//! Drives the instrumented router end to end and checks the recorded series.

mod common;

use axum::{
    Router,
    http::{Method, StatusCode},
    routing::get as get_route,
};
use common::{
    DEFAULT_COUNTRIES, LOCAL_PEER, REMOTE_PEER, app_for, body_string, get, send, test_state,
    test_state_with,
};
use geotally::{
    error::ErrorKind,
    handlers::{AppState, instrument},
};
use std::time::Duration;

#[tokio::test]
async fn test_request_counter_labels_for_local_caller() {
    let state = test_state("instrumented");
    let app = app_for(&state, LOCAL_PEER);

    get(&app, "/").await;
    get(&app, "/about").await;
    get(&app, "/about").await;

    let metrics = state.metrics();
    assert_eq!(
        metrics.requests_count(&[
            ("method", "GET"),
            ("endpoint", "about"),
            ("status", "200"),
            ("country", "Local"),
        ]),
        2
    );
    assert_eq!(metrics.requests_count(&[("endpoint", "index")]), 1);

    let snapshot = metrics.gather().unwrap();
    assert!(snapshot.contains("app_route_visits_total{country=\"Local\",path=\"/about\"} 2"));
    assert!(snapshot.contains("app_request_latency_seconds_count{endpoint=\"about\"} 2"));
}

#[tokio::test]
async fn test_loopback_caller_always_tagged_local() {
    let state = test_state("instrumented");
    let app = app_for(&state, LOCAL_PEER);

    for _ in 0..20 {
        get(&app, "/health").await;
    }
    let response = send(&app, Method::POST, "/health").await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let snapshot = state.metrics().gather().unwrap();
    assert!(snapshot.contains(
        "app_requests_total{country=\"Local\",endpoint=\"health\",method=\"GET\",status=\"200\"} 20"
    ));
    assert!(snapshot.contains(
        "app_requests_total{country=\"Local\",endpoint=\"health\",method=\"POST\",status=\"405\"} 1"
    ));
    for country in DEFAULT_COUNTRIES {
        assert!(
            !snapshot.contains(&format!("country=\"{}\"", country)),
            "loopback caller tagged {}",
            country
        );
    }
}

#[tokio::test]
async fn test_remote_callers_recorded_under_country_set() {
    let state = test_state("instrumented");
    let app = app_for(&state, REMOTE_PEER);

    for _ in 0..30 {
        get(&app, "/status").await;
    }

    let metrics = state.metrics();
    let total: u64 = DEFAULT_COUNTRIES
        .iter()
        .map(|country| metrics.requests_count(&[("country", country)]))
        .sum();
    assert_eq!(total, 30);
    assert_eq!(metrics.requests_count(&[("country", "Local")]), 0);
}

#[tokio::test]
async fn test_forbidden_increments_error_series_by_one() {
    let state = test_state("instrumented");
    let app = app_for(&state, LOCAL_PEER);

    for expected in 1..=3 {
        let response = get(&app, "/forbidden").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(state.metrics().errors_count(ErrorKind::Forbidden), expected);
    }

    let snapshot = state.metrics().gather().unwrap();
    assert!(snapshot.contains("app_errors_total{endpoint=\"forbidden\",error_type=\"forbidden\"} 3"));
    assert_eq!(
        state
            .metrics()
            .requests_count(&[("endpoint", "forbidden"), ("status", "403")]),
        3
    );
}

#[tokio::test]
async fn test_unmatched_route_uses_fallback_labels() {
    let state = test_state("instrumented");
    let app = app_for(&state, LOCAL_PEER);

    let response = get(&app, "/does/not/exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "Not found: /does/not/exist\n");

    let metrics = state.metrics();
    let snapshot = metrics.gather().unwrap();
    assert!(snapshot.contains("app_errors_total{endpoint=\"not_found\",error_type=\"not_found\"} 1"));
    assert!(snapshot.contains("app_route_visits_total{country=\"Local\",path=\"unknown\"} 1"));
    assert_eq!(
        metrics.requests_count(&[("endpoint", "unknown"), ("status", "404")]),
        1
    );
}

#[tokio::test]
async fn test_matched_route_not_found_keeps_endpoint() {
    let state = test_state("instrumented");
    let app = app_for(&state, LOCAL_PEER);

    get(&app, "/products?q=spaceship").await;

    let snapshot = state.metrics().gather().unwrap();
    assert!(snapshot.contains("app_errors_total{endpoint=\"products\",error_type=\"not_found\"} 1"));
}

#[tokio::test]
async fn test_buggy_always_recorded_as_exception() {
    let state = test_state("instrumented");
    let app = app_for(&state, LOCAL_PEER);

    for _ in 0..30 {
        let response = get(&app, "/buggy").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    let metrics = state.metrics();
    assert_eq!(metrics.errors_count(ErrorKind::Exception), 30);
    assert_eq!(metrics.errors_count(ErrorKind::ServerError), 0);
    assert_eq!(
        metrics.requests_count(&[("endpoint", "buggy"), ("status", "500")]),
        30
    );
}

#[tokio::test]
async fn test_active_gauge_returns_to_zero() {
    let state = test_state("instrumented");

    for peer in [LOCAL_PEER, REMOTE_PEER] {
        let app = app_for(&state, peer);
        for uri in ["/", "/forbidden", "/buggy", "/missing", "/slow", "/api/data"] {
            get(&app, uri).await;
        }
    }

    let metrics = state.metrics();
    assert_eq!(metrics.active_users_total(), 0);
    assert_eq!(metrics.active_users("Local"), 0);
    assert!(metrics.gather().unwrap().contains("app_active_users{country=\"Local\"} 0"));
}

#[tokio::test]
async fn test_active_gauge_counts_in_flight_request() {
    let state = test_state_with("instrumented", 300, 300);
    let app = app_for(&state, LOCAL_PEER);

    let in_flight = tokio::spawn({
        let app = app.clone();
        async move { get(&app, "/slow").await.status() }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(state.metrics().active_users("Local"), 1);

    assert_eq!(in_flight.await.unwrap(), StatusCode::OK);
    assert_eq!(state.metrics().active_users("Local"), 0);
}

#[tokio::test]
async fn test_cancelled_request_releases_gauge() {
    let state = test_state_with("instrumented", 5000, 5000);
    let app = app_for(&state, LOCAL_PEER);

    let result = tokio::time::timeout(Duration::from_millis(50), get(&app, "/slow")).await;
    assert!(result.is_err(), "request should have been cancelled");

    assert_eq!(state.metrics().active_users_total(), 0);
    assert_eq!(state.metrics().requests_count(&[]), 0);
}

async fn explode() -> &'static str {
    panic!("handler exploded")
}

fn panicking_app(state: &AppState) -> Router {
    use axum::extract::connect_info::MockConnectInfo;
    use std::net::SocketAddr;

    let routes = Router::new().route("/explode", get_route(explode));
    instrument(routes, state.clone())
        .with_state(state.clone())
        .layer(MockConnectInfo(SocketAddr::from(LOCAL_PEER)))
}

#[tokio::test]
async fn test_handler_panic_is_recorded_as_exception() {
    let state = test_state("instrumented");
    let app = panicking_app(&state);

    let response = get(&app, "/explode").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let metrics = state.metrics();
    assert_eq!(metrics.active_users_total(), 0);
    let snapshot = metrics.gather().unwrap();
    assert!(snapshot.contains("app_errors_total{endpoint=\"explode\",error_type=\"exception\"} 1"));
    assert_eq!(
        metrics.requests_count(&[("endpoint", "explode"), ("status", "500")]),
        1
    );
}

#[tokio::test]
async fn test_response_carries_request_id() {
    let app = app_for(&test_state("instrumented"), LOCAL_PEER);

    let first = get(&app, "/").await;
    let second = get(&app, "/").await;
    let a = first.headers().get("x-request-id").expect("should carry id");
    let b = second.headers().get("x-request-id").expect("should carry id");
    assert_eq!(a.len(), 36);
    assert_ne!(a, b);
}

#[tokio::test]
async fn test_metrics_endpoint_on_fresh_process() {
    let state = test_state("instrumented");
    let app = app_for(&state, LOCAL_PEER);

    let response = get(&app, "/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/plain; version=0.0.4"
    );
    assert_eq!(body_string(response).await, "");
}

#[tokio::test]
async fn test_metrics_endpoint_is_idempotent_and_not_self_counted() {
    let state = test_state("instrumented");
    let app = app_for(&state, REMOTE_PEER);

    get(&app, "/").await;
    get(&app, "/forbidden").await;

    let first = body_string(get(&app, "/metrics").await).await;
    let second = body_string(get(&app, "/metrics").await).await;
    assert_eq!(first, second);
    assert!(!first.contains("endpoint=\"metrics\""));
    assert!(first.contains("# TYPE app_active_users gauge"));
}

#[tokio::test]
async fn test_metrics_snapshot_has_entry_per_updated_series() {
    let state = test_state("instrumented");
    let app = app_for(&state, LOCAL_PEER);

    get(&app, "/").await;
    get(&app, "/forbidden").await;

    let snapshot = body_string(get(&app, "/metrics").await).await;
    for family in [
        "app_requests_total",
        "app_request_latency_seconds",
        "app_route_visits_total",
        "app_active_users",
        "app_errors_total",
    ] {
        assert!(
            snapshot.contains(&format!("# TYPE {} ", family)),
            "missing {}",
            family
        );
    }
    assert!(!snapshot.contains("app_metrics_recording_failures_total"));
}
