//! Panic handler for `tower_http::catch_panic::CatchPanicLayer`

use axum::response::{IntoResponse, Response};
use std::any::Any;

use crate::error::{AppError, Fault};

/// Render a caught handler panic as an exception response
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    AppError::Exception(Fault::Panic(detail)).into_response()
}
