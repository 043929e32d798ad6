//! Authentication domain models.

use serde::{Deserialize, Serialize};

/// A user account as stored in the `users` table.
///
/// Accounts are never hard-deleted by the auth layer; deactivation
/// flips `is_active` instead.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub password_hash: String,
    pub subscription_tier: String,
    pub usage_count: i32,
    pub usage_limit: i32,
    pub is_active: bool,
    pub role: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Discriminates access tokens from refresh tokens.
///
/// A token of one kind must never be accepted where the other is
/// required; `verify_token` enforces this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims carried by both access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject — user ID rendered as a string (standard JWT `sub`).
    pub sub: String,
    /// Token kind tag.
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

impl TokenClaims {
    /// Parse the subject as a user ID. `None` for a non-numeric subject.
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}
