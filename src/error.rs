//! Error types for geotally
//!
//! All errors implement `IntoResponse` for Axum handlers. Error responses carry
//! an [`ErrorKind`] extension so the metrics middleware can classify them
//! without re-deriving the cause from the status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Error taxonomy used for the `error_type` metric label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    ServerError,
    /// A handler fault: deliberate exception or caught panic
    Exception,
}

impl ErrorKind {
    /// Value of the `error_type` label
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::ServerError => "server_error",
            ErrorKind::Exception => "exception",
        }
    }

    /// Endpoint label used when the request matched no route
    pub fn fallback_endpoint(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::ServerError => "error",
            ErrorKind::Exception => "exception",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::ServerError | ErrorKind::Exception => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Classify a response status that carries no explicit kind
    ///
    /// Returns `None` for statuses that are not counted as errors.
    pub fn from_status(status: StatusCode) -> Option<Self> {
        match status {
            StatusCode::NOT_FOUND => Some(ErrorKind::NotFound),
            StatusCode::FORBIDDEN => Some(ErrorKind::Forbidden),
            s if s.is_server_error() => Some(ErrorKind::ServerError),
            _ => None,
        }
    }
}

/// Faults raised on purpose by the `/buggy` endpoint, plus caught panics
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    #[error("division by zero")]
    DivisionByZero,

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("raised: {0}")]
    Raised(String),

    #[error("handler panicked: {0}")]
    Panic(String),
}

impl Fault {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Fault::DivisionByZero => "division_by_zero",
            Fault::TypeMismatch(_) => "type_mismatch",
            Fault::Raised(_) => "raised",
            Fault::Panic(_) => "panic",
        }
    }
}

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    ServerFault(String),

    #[error("Unhandled exception: {0}")]
    Exception(Fault),
}

impl AppError {
    /// Metric classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Exception(_) => ErrorKind::Exception,
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. }
            | Self::ServerFault(_) => ErrorKind::ServerError,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();

        // Exceptions keep their detail in the logs, not the body
        let body = match &self {
            Self::Exception(fault) => {
                tracing::error!(fault = fault.name(), error = %fault, "Handler raised an exception");
                "Internal Server Error: unhandled exception\n".to_string()
            }
            other => format!("{}\n", other),
        };

        let mut response = (kind.status(), body).into_response();
        response.extensions_mut().insert(kind);
        response
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
