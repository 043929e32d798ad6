//! JWT token generation and verification.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::info;

use super::AuthError;
use crate::models::auth::{TokenClaims, TokenKind};

/// Sign a token for `subject` with the given kind and lifetime (HS256).
pub fn issue_token(
    subject: i64,
    kind: TokenKind,
    ttl: Duration,
    secret: &[u8],
) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = TokenClaims {
        sub: subject.to_string(),
        kind,
        exp: (now + ttl).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))
}

/// Verify a token, returning the claims on success.
///
/// Fails closed: a structural error, bad signature, expired token, or
/// a kind other than `expected` all yield `None`.
pub fn verify_token(token: &str, expected: TokenKind, secret: &[u8]) -> Option<TokenClaims> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::default();
    validation.validate_exp = true;
    // No clock-skew allowance; expiry is exact.
    validation.leeway = 0;
    let claims = decode::<TokenClaims>(token, &key, &validation)
        .ok()
        .map(|data| data.claims)?;
    if claims.kind != expected {
        return None;
    }
    Some(claims)
}

/// Resolve the JWT secret: env var `JWT_SECRET` → `SECRET_KEY` → persisted file.
pub fn resolve_jwt_secret() -> String {
    if let Ok(secret) = std::env::var("JWT_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    if let Ok(secret) = std::env::var("SECRET_KEY")
        && !secret.is_empty()
    {
        return secret;
    }
    // Generate and persist
    let secret_path = jwt_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new JWT secret");
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quickbird")
        .join("jwt-secret")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn access_token_round_trip() {
        let token = issue_token(42, TokenKind::Access, Duration::minutes(30), SECRET)
            .expect("issue access token");
        let claims = verify_token(&token, TokenKind::Access, SECRET).expect("valid token");
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.user_id(), Some(42));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token(42, TokenKind::Access, Duration::seconds(-5), SECRET)
            .expect("issue expired token");
        assert!(verify_token(&token, TokenKind::Access, SECRET).is_none());
    }

    #[test]
    fn access_token_rejected_where_refresh_required() {
        let token =
            issue_token(42, TokenKind::Access, Duration::minutes(30), SECRET).expect("issue");
        assert!(verify_token(&token, TokenKind::Refresh, SECRET).is_none());
    }

    #[test]
    fn refresh_token_rejected_where_access_required() {
        let token =
            issue_token(42, TokenKind::Refresh, Duration::days(7), SECRET).expect("issue");
        assert!(verify_token(&token, TokenKind::Access, SECRET).is_none());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let token =
            issue_token(42, TokenKind::Access, Duration::minutes(30), SECRET).expect("issue");
        let mut tampered = token.clone();
        // Flip a character in the signature segment.
        let last = tampered.pop().expect("non-empty token");
        tampered.push(if last == 'A' { 'B' } else { 'A' });
        assert!(verify_token(&tampered, TokenKind::Access, SECRET).is_none());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token =
            issue_token(42, TokenKind::Access, Duration::minutes(30), SECRET).expect("issue");
        assert!(verify_token(&token, TokenKind::Access, b"other-secret").is_none());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(verify_token("not-a-jwt", TokenKind::Access, SECRET).is_none());
    }
}
