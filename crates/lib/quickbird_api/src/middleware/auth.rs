//! Authentication gate — Bearer token extraction, verification, and
//! identity lookup.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use quickbird_core::auth::jwt::verify_token;
use quickbird_core::auth::queries;
use quickbird_core::models::auth::{TokenKind, User};

use crate::AppState;
use crate::error::AppError;

/// The authenticated identity, stored in request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Axum middleware: extracts `Authorization: Bearer <token>`, verifies
/// the access JWT, resolves the subject to a user row, and injects
/// [`CurrentUser`] into request extensions.
///
/// Read-only; the verdict is not cached across requests.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()))?;

    let claims = verify_token(token, TokenKind::Access, state.config.jwt_secret.as_bytes())
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".into()))?;

    let user_id = claims
        .user_id()
        .ok_or_else(|| AppError::Unauthorized("Invalid user ID format".into()))?;

    let user = queries::find_user_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

/// Reject identities whose account has been deactivated.
///
/// The gate itself only resolves identity; operations that require a
/// live account call this on the gate's verdict.
pub fn ensure_active(user: &User) -> Result<(), AppError> {
    if user.is_active {
        Ok(())
    } else {
        Err(AppError::Forbidden("Inactive user".into()))
    }
}
