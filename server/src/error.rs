//! Error types for the Weekly Pomodoros server.
//!
//! [`ServerError`] is what route handlers return. It converts from store
//! errors and renders itself as a JSON error response with the matching
//! status code.
//!
//! # Example
//!
//! ```rust
//! use pomodoros_server::error::ServerError;
//! use pomodoros_server::store::StoreError;
//!
//! let err: ServerError = StoreError::NotFound("42".to_string()).into();
//! assert!(err.is_client_error());
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::store::StoreError;

/// Message returned with a 404 for unknown ids.
pub const NOT_FOUND_MESSAGE: &str = "Todo not found";

/// Top-level error type for the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The update or delete target id is not in the collection.
    #[error("todo not found: {0}")]
    NotFound(String),

    /// The request was rejected by a server-side guard.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unexpected failure, such as an encoding error.
    #[error("internal server error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::Encode(err) => Self::Internal(err.to_string()),
        }
    }
}

impl ServerError {
    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns `true` if the client caused this error.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Validation(_))
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Internal(_) => "internal",
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if self.is_client_error() {
            debug!(error = %self, "Request rejected");
        } else {
            error!(error = %self, "Request failed");
        }

        let message = match &self {
            Self::NotFound(_) => NOT_FOUND_MESSAGE.to_string(),
            Self::Validation(msg) => msg.clone(),
            Self::Internal(_) => "internal server error".to_string(),
        };

        let body = ErrorResponse {
            message,
            code: Some(self.code().to_string()),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// A specialized Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
