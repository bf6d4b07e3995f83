//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each kind
//! is rendered as an HTTP response.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quickcart_core::checkout::CheckoutError;
use quickcart_core::ports::PortError;
use serde_json::json;
use tracing::error;

use crate::config::ConfigError;
use crate::web::protocol::CartLineReport;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error while running the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or missing request fields.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Duplicate email, or stock exhausted by a concurrent checkout.
    #[error("{0}")]
    Conflict(String),

    /// Missing, malformed, invalid or expired credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// The payment gateway declined the charge.
    #[error("Payment failed: {0}")]
    Payment(String),

    /// The cart itself is the problem; carries line-level detail.
    #[error("{message}")]
    Cart {
        message: String,
        items: Vec<CartLineReport>,
    },

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<PortError> for ApiError {
    fn from(value: PortError) -> Self {
        match value {
            PortError::NotFound(msg) => ApiError::NotFound(msg),
            PortError::Conflict(msg) => ApiError::Conflict(msg),
            PortError::Unexpected(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        tracing::debug!(error = %value, "rejected request body");
        ApiError::Validation("Invalid request data".to_string())
    }
}

impl From<CheckoutError> for ApiError {
    fn from(value: CheckoutError) -> Self {
        let message = value.to_string();
        match value {
            CheckoutError::InvalidCart(_) | CheckoutError::TotalTooLarge { .. } => {
                ApiError::Validation(message)
            }
            CheckoutError::ProductNotFound { validation, .. }
            | CheckoutError::InsufficientStock { validation, .. } => ApiError::Cart {
                message,
                items: validation.lines.iter().map(CartLineReport::from).collect(),
            },
            CheckoutError::PaymentFailed(decline) => ApiError::Payment(decline.to_string()),
            CheckoutError::TimedOut(_) => ApiError::Internal(message),
            CheckoutError::Storage(port) => ApiError::from(port),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            ApiError::Payment(reason) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": format!("Payment failed: {}", reason) }),
            ),
            ApiError::Cart { message, items } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "valid": false, "items": items }),
            ),
            other => {
                // Never leak internals to the client.
                error!(error = %other, "request failed with an internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
