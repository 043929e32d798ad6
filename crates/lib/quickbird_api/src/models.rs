//! API request and response models.

use quickbird_core::models::auth::User;
use serde::{Deserialize, Serialize};

/// `POST /api/v1/auth/login` body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /api/v1/auth/register` body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub full_name: Option<String>,
}

/// `POST /api/v1/auth/refresh` body.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token pair returned by login, register, and refresh.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub user: UserResponse,
}

/// Public view of a user account (no password hash).
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub subscription_tier: String,
    pub usage_count: i32,
    pub usage_limit: i32,
    pub is_active: bool,
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            full_name: user.full_name,
            subscription_tier: user.subscription_tier,
            usage_count: user.usage_count,
            usage_limit: user.usage_limit,
            is_active: user.is_active,
            role: user.role,
        }
    }
}

/// `GET /api/v1/users/me/usage` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct UsageResponse {
    pub usage_count: i32,
    pub usage_limit: i32,
    pub subscription_tier: String,
}

/// Plain acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error body produced by [`crate::error::AppError`].
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// `GET /health` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub db_connected: bool,
}
