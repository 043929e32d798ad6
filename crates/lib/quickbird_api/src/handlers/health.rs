//! Health endpoint — never rate limited, never authenticated.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::models::HealthResponse;

/// `GET /health` — liveness, build version, and a DB connectivity check.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_connected = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: quickbird_core::version().to_string(),
        db_connected,
    })
}
