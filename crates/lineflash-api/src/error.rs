//! API error types and conversions

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lineflash_core::{StartError, ValidationError};
use serde::Serialize;

/// Returned when a unit field is missing or not a number
pub const NOT_INTEGERS: &str = "Batch, year, month, and serial must be integers.";

/// API error type that converts to HTTP responses
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request
    BadRequest(String),
    /// 409 Conflict
    Conflict(String),
}

/// Error body consumed by the operator console
#[derive(Serialize)]
struct ErrorResponse {
    ok: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        tracing::debug!(status = %status, %message, "API client error");

        let body = Json(ErrorResponse {
            ok: false,
            error: message,
        });

        (status, body).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<StartError> for ApiError {
    fn from(err: StartError) -> Self {
        match err {
            StartError::Invalid(e) => e.into(),
            StartError::Busy => ApiError::Conflict(StartError::Busy.to_string()),
        }
    }
}
