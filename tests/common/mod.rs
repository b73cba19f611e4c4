//! Shared helpers for integration tests

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{Method, Request, Response},
};
use geotally::{
    config::Config,
    handlers::{self, AppState},
};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

pub const LOCAL_PEER: ([u8; 4], u16) = ([127, 0, 0, 1], 40000);
pub const REMOTE_PEER: ([u8; 4], u16) = ([203, 0, 113, 7], 40000);

pub const DEFAULT_COUNTRIES: [&str; 9] = [
    "USA",
    "UK",
    "Germany",
    "France",
    "Japan",
    "India",
    "Brazil",
    "Canada",
    "Australia",
];

/// State for a variant, with `/slow` shortened to keep tests fast
pub fn test_state(variant: &str) -> AppState {
    test_state_with(variant, 0, 5)
}

pub fn test_state_with(variant: &str, slow_min_ms: u64, slow_max_ms: u64) -> AppState {
    let toml = format!(
        "[app]\nvariant = \"{}\"\n\n[demo]\nslow_min_ms = {}\nslow_max_ms = {}\n",
        variant, slow_min_ms, slow_max_ms
    );
    let config = Config::from_str(&toml).expect("should parse test config");
    AppState::new(Arc::new(config)).expect("should create AppState")
}

/// Full application router as seen from `peer`
pub fn app_for(state: &AppState, peer: ([u8; 4], u16)) -> Router {
    handlers::app(state.clone()).layer(MockConnectInfo(SocketAddr::from(peer)))
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri).await
}

pub async fn send(app: &Router, method: Method, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
