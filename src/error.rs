//! Error taxonomy for the HTTP API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to API callers. Every variant renders as a JSON body of
/// the form `{"detail": "<message>"}` with the matching status code.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or wrong `X-Sandbox-Token` header.
    #[error("{0}")]
    Forbidden(String),

    /// The request was well-formed HTTP but semantically invalid.
    #[error("{0}")]
    BadRequest(String),

    /// The referenced file or directory does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A child process outlived its timeout and was killed.
    #[error("{0}")]
    Timeout(String),

    /// Anything the OS refused: spawn failures, I/O errors.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "detail": self.to_string() });
        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
