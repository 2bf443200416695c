// Shared HTTP response types for consistent API error payloads.

use axum::Json;
use axum::http::StatusCode;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    // Human-readable error string for consistent JSON error responses.
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}
