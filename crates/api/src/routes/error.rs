//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cadence_domain::CadenceError;
use serde_json::json;
use tracing::error;

/// Error body `{"error": "..."}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Collaborator-facing mapping: validation and lookup errors keep their
    /// message, everything else becomes a bare 500.
    pub fn from_write(err: CadenceError) -> Self {
        match err {
            CadenceError::NotFound(msg) => Self::not_found(msg),
            CadenceError::InvalidInput(msg) => Self::bad_request(msg),
            other => {
                error!(error = %other, category = other.label(), "appointment request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }

    /// Operator-facing mapping: a generic message per action, cause logged.
    pub fn action_failed(action: &'static str, err: &CadenceError) -> Self {
        error!(action, error = %err, category = err.label(), "operator action failed");
        match err {
            CadenceError::NotFound(_) => Self::not_found("tenant not found"),
            CadenceError::Config(_) => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, format!("{action} is not configured"))
            }
            _ => Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{action} failed")),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
