//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// Every service operation reports failures through this enum. Each variant
/// maps to an HTTP status via `IntoResponse`; the display string becomes the
/// `message` field of the response body.
#[derive(Error, Debug)]
pub enum AppError {
    /// Required field missing, blank or of the wrong type
    #[error("{0}")]
    InvalidInput(String),

    /// Referenced user or note does not exist (or a list is empty)
    #[error("{0}")]
    NotFound(String),

    /// A unique field (username, note title) is already taken
    #[error("{0}")]
    Conflict(String),

    /// User cannot be removed while notes still reference it
    #[error("{0}")]
    AssignedNotes(String),

    /// Internal server error (catch-all for unexpected store failures)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::AssignedNotes(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "Unexpected store failure");
                "An unexpected error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "message": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
