//! Authentication flows: login, register, refresh.

use chrono::Duration;
use quickbird_core::auth::jwt::{issue_token, verify_token};
use quickbird_core::auth::password::{hash_password, verify_password};
use quickbird_core::auth::queries;
use quickbird_core::models::auth::{TokenKind, User};
use sqlx::PgPool;
use tracing::info;

use crate::config::ApiConfig;
use crate::error::{AppError, AppResult};
use crate::models::TokenResponse;

/// Issue a fresh access + refresh pair for `user`.
fn issue_token_pair(user: User, config: &ApiConfig) -> AppResult<TokenResponse> {
    let access_token = issue_token(
        user.id,
        TokenKind::Access,
        Duration::minutes(config.access_token_ttl_minutes),
        config.jwt_secret.as_bytes(),
    )?;
    let refresh_token = issue_token(
        user.id,
        TokenKind::Refresh,
        Duration::days(config.refresh_token_ttl_days),
        config.jwt_secret.as_bytes(),
    )?;
    Ok(TokenResponse {
        access_token,
        refresh_token,
        token_type: "bearer".to_string(),
        user: user.into(),
    })
}

/// Authenticate with email + password.
///
/// Unknown email and wrong password produce the same response, so a
/// caller cannot probe which addresses have accounts.
pub async fn login(
    pool: &PgPool,
    email: &str,
    password: &str,
    config: &ApiConfig,
) -> AppResult<TokenResponse> {
    let user = match queries::find_user_by_email(pool, email).await? {
        None => return Err(AppError::Unauthorized("Incorrect email or password".into())),
        Some(u) => u,
    };

    if !verify_password(password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Incorrect email or password".into()));
    }

    if !user.is_active {
        return Err(AppError::Forbidden("Inactive user".into()));
    }

    issue_token_pair(user, config)
}

/// Register a new user account on the free tier.
pub async fn register(
    pool: &PgPool,
    email: &str,
    username: &str,
    password: &str,
    full_name: Option<&str>,
    config: &ApiConfig,
) -> AppResult<TokenResponse> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }
    if queries::email_exists(pool, email).await? {
        return Err(AppError::Validation("Email already registered".into()));
    }
    if queries::username_exists(pool, username).await? {
        return Err(AppError::Validation("Username already taken".into()));
    }

    let password_hash = hash_password(password)?;
    let user = queries::create_user(
        pool,
        email,
        username,
        full_name,
        &password_hash,
        config.tier_limits.free,
    )
    .await?;
    info!(user_id = user.id, "registered new user");

    issue_token_pair(user, config)
}

/// Exchange a refresh token for a new token pair (rotation).
///
/// The presented token is not invalidated; tokens stay stateless and
/// age out at their expiry.
pub async fn refresh(
    pool: &PgPool,
    refresh_token: &str,
    config: &ApiConfig,
) -> AppResult<TokenResponse> {
    let claims = verify_token(
        refresh_token,
        TokenKind::Refresh,
        config.jwt_secret.as_bytes(),
    )
    .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".into()))?;

    let user_id = claims
        .user_id()
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".into()))?;

    let user = queries::find_user_by_id(pool, user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("User not found or inactive".into()))?;

    issue_token_pair(user, config)
}
