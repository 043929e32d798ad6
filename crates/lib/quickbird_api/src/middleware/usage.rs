//! Daily usage quota guard for metered route groups.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use quickbird_core::auth::queries;

use crate::AppState;
use crate::error::AppError;
use crate::middleware::auth::{CurrentUser, ensure_active};

/// Axum middleware guarding metered operations (AI calls).
///
/// Must be layered inside [`require_auth`](crate::middleware::auth::require_auth):
/// it reads the gate's `CurrentUser` verdict, rejects inactive
/// accounts, compares the daily counter against the account's limit,
/// and counts the operation on admission.
///
/// Soft quota: the check and the increment are separate statements, so
/// concurrent metered requests from one account can transiently admit
/// slightly past the limit. The midnight scheduler zeroes the counter.
pub async fn enforce_quota(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let CurrentUser(user) = request
        .extensions()
        .get::<CurrentUser>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    ensure_active(&user)?;

    let (usage_count, usage_limit) = queries::fetch_usage(&state.pool, user.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    if usage_count >= usage_limit {
        return Err(AppError::QuotaExceeded { limit: usage_limit });
    }

    queries::increment_usage(&state.pool, user.id).await?;

    Ok(next.run(request).await)
}
