use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Application error type mapping to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not implemented")]
    NotImplemented,

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::NotImplemented => (StatusCode::NOT_IMPLEMENTED, "not implemented".to_string()),
            AppError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "an internal error occurred".to_string())
            }
        };

        (status, axum::Json(ErrorBody { detail })).into_response()
    }
}

impl From<compliance_core::ScanError> for AppError {
    fn from(err: compliance_core::ScanError) -> Self {
        match err {
            compliance_core::ScanError::Validation(msg) => AppError::Validation(msg),
            compliance_core::ScanError::Config(msg) => AppError::Internal(msg),
            compliance_core::ScanError::Engine(msg) => AppError::Internal(msg),
            compliance_core::ScanError::Quota(msg) => AppError::Internal(msg),
            compliance_core::ScanError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON error: {err}"))
    }
}

impl From<serde_yml::Error> for AppError {
    fn from(err: serde_yml::Error) -> Self {
        AppError::Validation(format!("YAML error: {err}"))
    }
}
