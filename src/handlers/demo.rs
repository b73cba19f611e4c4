//! Demo-only endpoints of the instrumented variant
//!
//! These exist to produce error statuses, faults and slow responses for the
//! monitoring side of the pipeline. `/admin` and `/debug` stand in for
//! intentionally vulnerable pages: they keep the observable behavior (200,
//! plain text) without reflecting raw input into a query or dumping the
//! process environment.

use axum::extract::{Query, State};
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{AppError, AppResult, Fault};
use crate::handlers::AppState;
use crate::handlers::pages::SERVICE_NAME;
use crate::middleware::context::Country;

/// Number of distinct faults `/buggy` can raise
pub const FAULT_BRANCHES: u8 = 3;

/// Query text shown by `/admin`; input is only ever a bound parameter
pub const ADMIN_QUERY: &str = "SELECT id, name FROM users WHERE name = $1";

pub async fn forbidden() -> AppError {
    AppError::Forbidden("access to this resource is denied".to_string())
}

/// Raise one of the `/buggy` faults
///
/// Every branch fails; each failure is reported as an exception.
pub fn trigger_fault(branch: u8) -> AppResult<String> {
    match branch % FAULT_BRANCHES {
        0 => {
            let visitors: u32 = 100;
            let pages: u32 = 0;
            let ratio = visitors
                .checked_div(pages)
                .ok_or(AppError::Exception(Fault::DivisionByZero))?;
            Ok(format!("Visitors per page: {}\n", ratio))
        }
        1 => {
            let raw = "forty-two";
            let count: u32 = raw
                .parse()
                .map_err(|e| AppError::Exception(Fault::TypeMismatch(format!("{raw:?}: {e}"))))?;
            Ok(format!("Count: {}\n", count))
        }
        _ => Err(AppError::Exception(Fault::Raised(
            "intentional failure from /buggy".to_string(),
        ))),
    }
}

pub async fn buggy() -> AppResult<String> {
    let branch = rand::rng().random_range(0..FAULT_BRANCHES);
    trigger_fault(branch)
}

pub async fn slow(State(state): State<AppState>) -> String {
    let demo = &state.config().demo;
    let delay_ms = rand::rng().random_range(demo.slow_min_ms..=demo.slow_max_ms);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    format!("Slow response completed in {}ms\n", delay_ms)
}

#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    pub user: Option<String>,
}

pub async fn admin(Query(query): Query<AdminQuery>) -> String {
    match query.user {
        Some(user) => format!(
            "Admin lookup\nQuery: {}\nParameters: [{:?}]\n",
            ADMIN_QUERY, user
        ),
        None => "Admin lookup\nNo user supplied (use ?user=<name>)\n".to_string(),
    }
}

pub async fn debug(State(state): State<AppState>, country: Country) -> String {
    let variant = state.variant();
    format!(
        "Debug info\nservice: {}\nversion: {}\nvariant: {}\ncountry: {}\npid: {}\n",
        SERVICE_NAME,
        variant.version(),
        variant.as_str(),
        country,
        std::process::id()
    )
}
