//! # quickbird_api
//!
//! HTTP API library for Quickbird.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use quickbird_core::ratelimit::RateLimiter;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::handlers::{auth, health, users};
use crate::middleware::rate_limit::RateGate;

/// Shared application state passed to all handlers.
///
/// Constructed once at process start; the limiter is owned here
/// rather than living in module-level statics, so tests get a fresh
/// one per router.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool.
    pub pool: PgPool,
    /// API configuration.
    pub config: ApiConfig,
    /// Sliding-window request limiter shared by all route classes.
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(pool: PgPool, config: ApiConfig) -> Self {
        Self {
            pool,
            config,
            limiter: Arc::new(RateLimiter::new()),
        }
    }

    /// Rate-gate state for one route class.
    fn rate_gate(&self, policy: quickbird_core::ratelimit::RatePolicy) -> RateGate {
        RateGate {
            limiter: self.limiter.clone(),
            policy,
        }
    }
}

/// Run embedded database migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    quickbird_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
///
/// Admission order on protected routes: rate limiter → auth gate →
/// handler. `/health` bypasses the limiter entirely.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public auth routes: rate limited under the auth policy, no gate.
    let auth_routes = Router::new()
        .route("/api/v1/auth/login", post(auth::login_handler))
        .route("/api/v1/auth/register", post(auth::register_handler))
        .route("/api/v1/auth/refresh", post(auth::refresh_handler))
        .route("/api/v1/auth/logout", post(auth::logout_handler))
        .layer(from_fn_with_state(
            state.rate_gate(state.config.rate_limits.auth),
            middleware::rate_limit::rate_limit,
        ));

    // Protected routes: general rate policy, then the auth gate.
    // Layers run outermost-last, so the limiter sees the request first.
    let protected = Router::new()
        .route("/api/v1/auth/me", get(auth::me_handler))
        .route("/api/v1/users/me/usage", get(users::usage_handler))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ))
        .layer(from_fn_with_state(
            state.rate_gate(state.config.rate_limits.general),
            middleware::rate_limit::rate_limit,
        ));

    Router::new()
        .route("/health", get(health::health_handler))
        .merge(auth_routes)
        .merge(protected)
        .layer(cors)
        .with_state(state)
}

/// Wrap a group of metered routes (AI calls) with the full admission
/// stack: AI rate policy → auth gate → daily quota guard.
///
/// The AI proxy and other metered consumers mount their routes through
/// this so every call is counted against the account's daily limit.
pub fn metered_routes(state: &AppState, routes: Router<AppState>) -> Router<AppState> {
    routes
        .layer(from_fn_with_state(
            state.clone(),
            middleware::usage::enforce_quota,
        ))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ))
        .layer(from_fn_with_state(
            state.rate_gate(state.config.rate_limits.ai),
            middleware::rate_limit::rate_limit,
        ))
}
