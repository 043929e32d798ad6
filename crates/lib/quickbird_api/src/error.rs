//! Application error types.

use std::time::Duration;

use axum::{
    Json,
    http::{StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rate limit exceeded")]
    RateLimited {
        max_requests: usize,
        window: Duration,
    },

    #[error("Daily usage limit reached")]
    QuotaExceeded { limit: i32 },

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => {
                (StatusCode::BAD_REQUEST, "validation_error", m.clone())
            }
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.clone()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.clone()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.clone()),
            AppError::RateLimited {
                max_requests,
                window,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                format!(
                    "Rate limit exceeded. Maximum {max_requests} requests per {} minutes.",
                    window.as_secs() / 60
                ),
            ),
            AppError::QuotaExceeded { limit } => (
                StatusCode::TOO_MANY_REQUESTS,
                "quota_exceeded",
                format!("Daily usage limit reached ({limit} requests per day)."),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error".to_string(),
            ),
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
        });
        match self {
            // A limited client can retry once the window has moved on.
            AppError::RateLimited { window, .. } => {
                (status, [(RETRY_AFTER, window.as_secs().to_string())], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".into()),
            _ => AppError::Internal(e.to_string()),
        }
    }
}

impl From<quickbird_core::auth::AuthError> for AppError {
    fn from(e: quickbird_core::auth::AuthError) -> Self {
        use quickbird_core::auth::AuthError;
        match e {
            AuthError::CredentialError => AppError::Unauthorized("Invalid credentials".into()),
            AuthError::TokenError(msg) => AppError::Unauthorized(msg),
            AuthError::ValidationError(msg) => AppError::Validation(msg),
            AuthError::DbError(e) => AppError::from(e),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}
