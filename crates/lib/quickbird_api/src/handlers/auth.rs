//! Authentication request handlers.

use axum::extract::State;
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::{CurrentUser, ensure_active};
use crate::models::{
    LoginRequest, MessageResponse, RefreshRequest, RegisterRequest, TokenResponse, UserResponse,
};
use crate::services::auth;

/// `POST /api/v1/auth/login` — authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::login(&state.pool, &body.email, &body.password, &state.config).await?;
    Ok(Json(resp))
}

/// `POST /api/v1/auth/register` — create a new user account.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::register(
        &state.pool,
        &body.email,
        &body.username,
        &body.password,
        body.full_name.as_deref(),
        &state.config,
    )
    .await?;
    Ok(Json(resp))
}

/// `POST /api/v1/auth/refresh` — exchange a refresh token for a new pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::refresh(&state.pool, &body.refresh_token, &state.config).await?;
    Ok(Json(resp))
}

/// `GET /api/v1/auth/me` — the authenticated user's profile.
///
/// A still-valid token does not buy a deactivated account anything.
pub async fn me_handler(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> AppResult<Json<UserResponse>> {
    ensure_active(&user)?;
    Ok(Json(user.into()))
}

/// `POST /api/v1/auth/logout` — acknowledge logout.
///
/// Tokens are stateless; the client discards them and they age out at
/// expiry.
pub async fn logout_handler() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Successfully logged out".to_string(),
    })
}
