//! Request tagging middleware
//!
//! Generates a request ID, resolves the caller's country and attaches both,
//! with the arrival time, to the request via Axum extensions.

use axum::{
    extract::{
        ConnectInfo, FromRequestParts, Request, State, connect_info::MockConnectInfo,
    },
    http::{Extensions, HeaderValue, request::Parts},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Instant;
use uuid::Uuid;

use crate::geo::UNKNOWN_LABEL;
use crate::handlers::AppState;

/// Request ID header name
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Address string used when the peer address is not available
pub const UNKNOWN_ADDRESS: &str = "unknown";

/// Per-request record created at entry and dropped with the request
#[derive(Debug, Clone)]
pub struct RequestContext {
    id: Uuid,
    started_at: Instant,
    country: String,
}

impl RequestContext {
    pub fn new(country: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Instant::now(),
            country: country.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// When the request entered the middleware stack
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn country(&self) -> &str {
        &self.country
    }
}

/// Country label of the current request
///
/// Never rejects: requests without a [`RequestContext`] read as `"Unknown"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Country(pub String);

impl Country {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Country {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S> FromRequestParts<S> for Country
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(country_label(&parts.extensions).to_string()))
    }
}

/// Country label stored on a request, or `"Unknown"`
pub fn country_label(extensions: &Extensions) -> &str {
    extensions
        .get::<RequestContext>()
        .map(RequestContext::country)
        .unwrap_or(UNKNOWN_LABEL)
}

/// Caller address as a string
///
/// Reads the `ConnectInfo` inserted by the server, falling back to a
/// `MockConnectInfo` layer the way the `ConnectInfo` extractor does.
/// IPv4-mapped IPv6 addresses are reported in their IPv4 form so that
/// `127.0.0.1` matches regardless of the listener's address family.
pub fn client_address(extensions: &Extensions) -> String {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
        .or_else(|| {
            extensions
                .get::<MockConnectInfo<SocketAddr>>()
                .map(|MockConnectInfo(addr)| *addr)
        })
        .map(|addr| addr.ip().to_canonical().to_string())
        .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string())
}

/// Middleware that tags each request with a [`RequestContext`]
///
/// The request ID is added to the response headers for client correlation.
pub async fn tag_request(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let address = client_address(request.extensions());
    let context = RequestContext::new(state.resolver().resolve(&address));
    let request_id = context.id();

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
        country = context.country(),
        "Incoming request"
    );

    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id.to_string()) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER, header_value);
    }

    response
}
