//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

/// Per-field validation messages, keyed by the request field name.
///
/// Serializes as `{"field": ["message", ...]}`. Fields are kept in sorted
/// order so responses are stable.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against `field`.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for `field`, empty if the field passed.
    #[cfg(test)]
    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Authentication**: missing or mismatched request signature
/// - **Validation**: one or more request fields failed type/range/presence checks
/// - **Storage**: any sqlx::Error from database operations
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// Returns HTTP 500; the underlying error is logged, never sent to the client.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// `X-Signature`/`X-Timestamp` missing, malformed, stale or not matching the body.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Request fields failed validation.
    ///
    /// Returns HTTP 422 Unprocessable Entity with the per-field messages.
    #[error("The given data was invalid")]
    Validation(ValidationErrors),

    /// Signed body exceeded the configured buffer limit.
    ///
    /// Returns HTTP 413 Payload Too Large.
    #[error("Request body too large")]
    PayloadTooLarge,

    /// Request could not be processed for a reason not tied to a single field.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// Validation errors:
/// ```json
/// { "message": { "amount": ["The amount field must be at least 1."] } }
/// ```
///
/// Everything else:
/// ```json
/// { "status": "error", "message": "Invalid signature" }
/// ```
///
/// # Status Code Mapping
///
/// - `InvalidSignature` → 400 Bad Request
/// - `InvalidRequest` → 400 Bad Request
/// - `PayloadTooLarge` → 413 Payload Too Large
/// - `Validation` → 422 Unprocessable Entity
/// - `Database` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(errors) => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "message": errors })),
                )
                    .into_response();
            }
            AppError::InvalidSignature => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::InvalidRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, self.to_string()),
            AppError::Database(ref e) => {
                tracing::error!(error = %e, "database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "status": "error",
            "message": message
        }));

        (status, body).into_response()
    }
}
