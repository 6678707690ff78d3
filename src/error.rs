// SPDX-License-Identifier: MIT

//! Application error types with consistent API responses.
//!
//! Every failure surfaces as the uniform envelope
//! `{ code, message, data: null, timestamp }` with a stable numeric code,
//! alongside a conventional HTTP status. Business-rule violations
//! (validation, not-found, forbidden, conflict) are structured results;
//! only genuinely unexpected failures reach the 5001 path.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Stable envelope codes shared with clients.
pub mod codes {
    pub const OK: u32 = 0;
    pub const VALIDATION: u32 = 4001;
    pub const CONFLICT: u32 = 4002;
    pub const FORBIDDEN: u32 = 4003;
    pub const UNKNOWN_USER: u32 = 4004;
    pub const NOT_FOUND: u32 = 4005;
    pub const INTERNAL: u32 = 5001;
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    Validation(String),

    /// State or guard violated: duplicate request, already a member,
    /// wrong pending state, capacity race lost.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Activity not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Envelope code for this error.
    pub fn code(&self) -> u32 {
        match self {
            AppError::Validation(_) => codes::VALIDATION,
            AppError::Conflict(_) => codes::CONFLICT,
            AppError::Forbidden(_) => codes::FORBIDDEN,
            AppError::UnknownUser(_) => codes::UNKNOWN_USER,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Store(_) | AppError::Internal(_) => codes::INTERNAL,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::UnknownUser(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error envelope body.
#[derive(Serialize)]
struct ErrorEnvelope {
    code: u32,
    message: String,
    data: Option<()>,
    timestamp: i64,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Store(msg) => {
                tracing::error!(error = %msg, "Store error");
                "internal server error".to_string()
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorEnvelope {
            code: self.code(),
            message,
            data: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for handlers and services.
pub type Result<T> = std::result::Result<T, AppError>;
