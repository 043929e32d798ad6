//! User-scoped handlers.

use axum::extract::State;
use axum::{Extension, Json};
use quickbird_core::auth::queries;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{CurrentUser, ensure_active};
use crate::models::UsageResponse;

/// `GET /api/v1/users/me/usage` — current daily usage against the
/// account's limit.
///
/// Re-reads the counter so a response issued mid-day reflects metered
/// calls made since the token was issued.
pub async fn usage_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> AppResult<Json<UsageResponse>> {
    ensure_active(&user)?;
    let (usage_count, usage_limit) = queries::fetch_usage(&state.pool, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(Json(UsageResponse {
        usage_count,
        usage_limit,
        subscription_tier: user.subscription_tier,
    }))
}
