//! API server configuration.

use quickbird_core::auth::jwt::resolve_jwt_secret;
use quickbird_core::ratelimit::RatePolicy;

/// Per-route-class rate-limit policies.
///
/// The limiter itself is policy-agnostic; these pairs are what the
/// router hands it for each route group.
#[derive(Clone, Copy, Debug)]
pub struct RateLimits {
    /// Login/register/refresh — tight, these endpoints do bcrypt work.
    pub auth: RatePolicy,
    /// Metered AI routes.
    pub ai: RatePolicy,
    /// Everything else.
    pub general: RatePolicy,
}

/// Daily usage ceilings per subscription tier.
#[derive(Clone, Copy, Debug)]
pub struct TierLimits {
    pub free: i32,
    pub pro: i32,
    pub enterprise: i32,
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Access token lifetime, in minutes.
    pub access_token_ttl_minutes: i64,
    /// Refresh token lifetime, in days.
    pub refresh_token_ttl_days: i64,
    /// Rate-limit policies per route class.
    pub rate_limits: RateLimits,
    /// Daily usage limits per subscription tier.
    pub tier_limits: TierLimits,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable | Default |
    /// |----------------------------------------------|------------------------------------|
    /// | `BIND_ADDR`                                  | `127.0.0.1:8000`                   |
    /// | `DATABASE_URL`                               | `postgres://localhost:5432/quickbird` |
    /// | `JWT_SECRET` / `SECRET_KEY`                  | generated & persisted to file      |
    /// | `ACCESS_TOKEN_EXPIRE_MINUTES`                | `30`                               |
    /// | `REFRESH_TOKEN_EXPIRE_DAYS`                  | `7`                                |
    /// | `AUTH_RATE_LIMIT` / `AUTH_RATE_WINDOW_SECS`  | `100` / `3600`                     |
    /// | `AI_RATE_LIMIT` / `AI_RATE_WINDOW_SECS`      | `200` / `3600`                     |
    /// | `GENERAL_RATE_LIMIT` / `GENERAL_RATE_WINDOW_SECS` | `500` / `3600`                |
    /// | `FREE_TIER_DAILY_LIMIT`                      | `10`                               |
    /// | `PRO_TIER_DAILY_LIMIT`                       | `100`                              |
    /// | `ENTERPRISE_TIER_DAILY_LIMIT`                | `1000`                             |
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".into()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/quickbird".into()),
            jwt_secret: resolve_jwt_secret(),
            access_token_ttl_minutes: env_parse("ACCESS_TOKEN_EXPIRE_MINUTES", 30),
            refresh_token_ttl_days: env_parse("REFRESH_TOKEN_EXPIRE_DAYS", 7),
            rate_limits: RateLimits {
                auth: RatePolicy::new(
                    env_parse("AUTH_RATE_LIMIT", 100),
                    env_parse("AUTH_RATE_WINDOW_SECS", 3600),
                ),
                ai: RatePolicy::new(
                    env_parse("AI_RATE_LIMIT", 200),
                    env_parse("AI_RATE_WINDOW_SECS", 3600),
                ),
                general: RatePolicy::new(
                    env_parse("GENERAL_RATE_LIMIT", 500),
                    env_parse("GENERAL_RATE_WINDOW_SECS", 3600),
                ),
            },
            tier_limits: TierLimits {
                free: env_parse("FREE_TIER_DAILY_LIMIT", 10),
                pro: env_parse("PRO_TIER_DAILY_LIMIT", 100),
                enterprise: env_parse("ENTERPRISE_TIER_DAILY_LIMIT", 1000),
            },
        }
    }
}

/// Parse an env var, falling back to `default` when unset or malformed.
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
