//! Gate and limiter behavior that needs no live database: the pool is
//! lazy, so only handlers that would actually touch PostgreSQL fail.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use quickbird_api::config::{ApiConfig, RateLimits, TierLimits};
use quickbird_api::{AppState, router};
use quickbird_core::auth::jwt::issue_token;
use quickbird_core::models::auth::{TokenClaims, TokenKind};
use quickbird_core::ratelimit::RatePolicy;
use tower::ServiceExt;

const SECRET: &str = "gate-test-secret";

fn test_config() -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        database_url: "postgres://localhost:5432/quickbird".into(),
        jwt_secret: SECRET.into(),
        access_token_ttl_minutes: 30,
        refresh_token_ttl_days: 7,
        rate_limits: RateLimits {
            auth: RatePolicy::new(3, 3600),
            ai: RatePolicy::new(100, 3600),
            general: RatePolicy::new(100, 3600),
        },
        tier_limits: TierLimits {
            free: 10,
            pro: 100,
            enterprise: 1000,
        },
    }
}

fn test_state() -> AppState {
    // Nothing listens on port 1; DB-touching paths fail fast.
    let pool = sqlx::PgPool::connect_lazy("postgres://localhost:1/quickbird")
        .expect("lazy pool");
    AppState::new(pool, test_config())
}

fn get_me(token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/api/v1/auth/me");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token.to_string());
    }
    builder.body(Body::empty()).expect("request")
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse JSON")
}

#[tokio::test]
async fn missing_authorization_header_is_401() {
    let app = router(test_state());
    let resp = app.oneshot(get_me(None)).await.expect("request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(resp).await;
    assert_eq!(json["message"], "Missing authorization header");
}

#[tokio::test]
async fn non_bearer_scheme_is_401() {
    let app = router(test_state());
    let resp = app
        .oneshot(get_me(Some("Basic dXNlcjpwdw==")))
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_token_is_401() {
    let app = router(test_state());
    let resp = app
        .oneshot(get_me(Some("Bearer not-a-jwt")))
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(resp).await;
    assert_eq!(json["message"], "Invalid or expired token");
}

#[tokio::test]
async fn refresh_token_rejected_at_the_gate() {
    let app = router(test_state());
    let token = issue_token(
        1,
        TokenKind::Refresh,
        chrono::Duration::days(7),
        SECRET.as_bytes(),
    )
    .expect("issue refresh token");
    let resp = app
        .oneshot(get_me(Some(&format!("Bearer {token}"))))
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_numeric_subject_is_401() {
    let app = router(test_state());
    let now = chrono::Utc::now();
    let claims = TokenClaims {
        sub: "not-a-number".into(),
        kind: TokenKind::Access,
        exp: (now + chrono::Duration::minutes(30)).timestamp(),
        iat: now.timestamp(),
    };
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("encode");
    let resp = app
        .oneshot(get_me(Some(&format!("Bearer {token}"))))
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(resp).await;
    assert_eq!(json["message"], "Invalid user ID format");
}

#[tokio::test]
async fn auth_routes_hit_the_limit_then_429() {
    let app = router(test_state());

    // Logout does no DB work, so only the limiter decides the outcome.
    let request = |ip: &str| {
        Request::builder()
            .uri("/api/v1/auth/logout")
            .method("POST")
            .header("x-forwarded-for", ip.to_string())
            .body(Body::empty())
            .expect("request")
    };

    for _ in 0..3 {
        let resp = app.clone().oneshot(request("1.2.3.4")).await.expect("request");
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app.clone().oneshot(request("1.2.3.4")).await.expect("request");
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        resp.headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok()),
        Some("3600")
    );
    let json = body_json(resp).await;
    assert_eq!(
        json["message"],
        "Rate limit exceeded. Maximum 3 requests per 60 minutes."
    );

    // A different client address still has its full budget.
    let resp = app.clone().oneshot(request("5.6.7.8")).await.expect("request");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_is_never_rate_limited() {
    let app = router(test_state());
    for _ in 0..20 {
        let req = Request::builder()
            .uri("/health")
            .header("x-forwarded-for", "1.2.3.4")
            .body(Body::empty())
            .expect("request");
        let resp = app.clone().oneshot(req).await.expect("request");
        assert_eq!(resp.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn health_reports_version() {
    let app = router(test_state());
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("request");
    let resp = app.oneshot(req).await.expect("request");
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], quickbird_core::version());
}
