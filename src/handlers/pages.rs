//! Informational pages
//!
//! Fixed text per app variant. The instrumented variant interpolates the
//! caller's country.

use axum::{
    Json,
    extract::{Query, State},
    http::Uri,
};
use serde::{Deserialize, Serialize};

use crate::config::AppVariant;
use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::middleware::context::Country;

pub const SERVICE_NAME: &str = "geotally";

pub async fn index(State(state): State<AppState>, country: Country) -> String {
    match state.variant() {
        AppVariant::Basic => "Hello world from geotally!\nCI/CD is working!\n".to_string(),
        AppVariant::Extended => "Hello world from geotally v2!\nCI/CD is working!\n\
            Pipeline pages: /status /deploy /dashboard\n"
            .to_string(),
        AppVariant::Instrumented => format!(
            "Hello from {}!\nCI/CD is working!\nMetrics available at /metrics\n",
            country
        ),
    }
}

pub async fn version(State(state): State<AppState>) -> String {
    format!(
        "Version: {}\nBuild: DevOps Pipeline\n",
        state.variant().version()
    )
}

pub async fn about(State(state): State<AppState>) -> &'static str {
    if state.variant().is_instrumented() {
        "DevOps Learning Project\nRust + Axum + Docker + GitHub Actions + AWS\n\
        Monitoring: Prometheus + Grafana\n"
    } else {
        "DevOps Learning Project\nRust + Axum + Docker + GitHub Actions + AWS\n"
    }
}

pub async fn status(State(state): State<AppState>, country: Country) -> String {
    let mut body = String::from("Pipeline Status: all stages passing\nBuild: OK\nTest: OK\nDeploy: OK\n");
    if state.variant().is_instrumented() {
        body.push_str(&format!("Serving region: {}\n", country));
    }
    body
}

pub async fn deploy(State(state): State<AppState>) -> String {
    format!(
        "Deployment: rolling update\nEnvironment: production\nRelease: {}\nTriggered by: CI/CD pipeline\n",
        state.variant().version()
    )
}

pub async fn dashboard(State(state): State<AppState>, country: Country) -> String {
    if state.variant().is_instrumented() {
        format!(
            "Dashboard\nRequests are tracked per country\nYour country: {}\nScrape: /metrics\n",
            country
        )
    } else {
        "Dashboard\nMonitoring is not enabled in this version\n".to_string()
    }
}

/// JSON body of `/api/data`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiData {
    pub service: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub items: Vec<String>,
}

pub async fn api_data(State(state): State<AppState>, country: Country) -> Json<ApiData> {
    let variant = state.variant();
    Json(ApiData {
        service: SERVICE_NAME.to_string(),
        version: variant.version().to_string(),
        country: variant.is_instrumented().then(|| country.0),
        items: CATALOG.iter().map(|p| p.keyword.to_string()).collect(),
    })
}

/// Entry in the fixed product table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Product {
    pub keyword: &'static str,
    pub name: &'static str,
    pub price_usd: u32,
}

pub const CATALOG: &[Product] = &[
    Product {
        keyword: "laptop",
        name: "Developer Laptop",
        price_usd: 1299,
    },
    Product {
        keyword: "monitor",
        name: "27\" 4K Monitor",
        price_usd: 399,
    },
    Product {
        keyword: "keyboard",
        name: "Mechanical Keyboard",
        price_usd: 129,
    },
    Product {
        keyword: "headset",
        name: "Noise-cancelling Headset",
        price_usd: 199,
    },
    Product {
        keyword: "dock",
        name: "USB-C Dock",
        price_usd: 89,
    },
];

/// Case-insensitive keyword lookup in [`CATALOG`]
pub fn find_product(keyword: &str) -> Option<&'static Product> {
    let keyword = keyword.trim();
    CATALOG
        .iter()
        .find(|product| product.keyword.eq_ignore_ascii_case(keyword))
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub q: Option<String>,
}

pub async fn products(Query(query): Query<ProductQuery>) -> AppResult<String> {
    match query.q.as_deref() {
        None | Some("") => {
            let mut body = String::from("Products\n");
            for product in CATALOG {
                body.push_str(&format!(
                    "- {} ({}): ${}\n",
                    product.name, product.keyword, product.price_usd
                ));
            }
            Ok(body)
        }
        Some(keyword) => find_product(keyword)
            .map(|product| format!("Product: {}\nPrice: ${}\n", product.name, product.price_usd))
            .ok_or_else(|| AppError::NotFound(format!("no product matches '{}'", keyword.trim()))),
    }
}

/// Fallback for unmatched routes
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
