//! HTTP request handlers and router assembly for geotally

use axum::{Router, middleware::from_fn_with_state, routing::get};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::{AppVariant, Config};
use crate::geo::{CountryResolver, MockGeoResolver};
use crate::metrics::Metrics;
use crate::middleware;

pub mod demo;
pub mod health;
pub mod metrics;
pub mod pages;

/// Application state shared across all handlers
///
/// Owns the metrics registry and the country resolver, so their lifecycle
/// is tied to the router built from this state. All fields are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    metrics: Metrics,
    resolver: Arc<dyn CountryResolver>,
}

impl AppState {
    /// Create a new AppState with a fresh registry and the mock resolver
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails.
    pub fn new(config: Arc<Config>) -> Result<Self, prometheus::Error> {
        let resolver = Arc::new(MockGeoResolver::new(&config.geo));
        Ok(Self {
            config,
            metrics: Metrics::new()?,
            resolver,
        })
    }

    /// Replace the country resolver
    pub fn with_resolver(mut self, resolver: Arc<dyn CountryResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn resolver(&self) -> &dyn CountryResolver {
        self.resolver.as_ref()
    }

    pub fn variant(&self) -> AppVariant {
        self.config.app.variant
    }
}

/// Build the router for the configured variant
///
/// `/metrics` sits outside the instrumented stack so scraping does not change
/// the snapshot it returns.
pub fn app(state: AppState) -> Router {
    let variant = state.variant();

    let mut routes = Router::new()
        .route("/", get(pages::index))
        .route("/health", get(health::handler))
        .route("/version", get(pages::version))
        .route("/about", get(pages::about));

    if variant != AppVariant::Basic {
        routes = routes
            .route("/status", get(pages::status))
            .route("/deploy", get(pages::deploy))
            .route("/dashboard", get(pages::dashboard))
            .route("/api/data", get(pages::api_data))
            .route("/products", get(pages::products));
    }

    let router = if variant.is_instrumented() {
        let routes = routes
            .route("/forbidden", get(demo::forbidden))
            .route("/buggy", get(demo::buggy))
            .route("/slow", get(demo::slow))
            .route("/admin", get(demo::admin))
            .route("/debug", get(demo::debug))
            .fallback(pages::not_found);

        Router::new()
            .route("/metrics", get(metrics::handler))
            .merge(instrument(routes, state.clone()))
    } else {
        routes.fallback(pages::not_found)
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Wrap routes with the tagging, recording and panic-catching middleware
///
/// Routes and the fallback must be registered before calling this; anything
/// added afterwards is not instrumented.
pub fn instrument(routes: Router<AppState>, state: AppState) -> Router<AppState> {
    routes
        .layer(CatchPanicLayer::custom(middleware::panic::handle_panic))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::metrics::record_metrics,
        ))
        .layer(from_fn_with_state(state, middleware::context::tag_request))
}
