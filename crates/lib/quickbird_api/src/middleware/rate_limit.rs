//! Per-client-address rate limiting, applied before the auth gate.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use quickbird_core::ratelimit::{RateLimiter, RatePolicy};

use crate::error::AppError;

/// State for one rate-limited route class: the shared limiter plus
/// that class's policy.
#[derive(Clone)]
pub struct RateGate {
    pub limiter: Arc<RateLimiter>,
    pub policy: RatePolicy,
}

/// Axum middleware: admit or 429 based on the client key's recent
/// request history.
///
/// Runs before authentication, so the admitted attempt counts toward
/// the budget even when the request is later rejected by the gate or
/// the quota guard.
pub async fn rate_limit(
    State(gate): State<RateGate>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = client_key(&request);
    if !gate.limiter.admit(&key, gate.policy) {
        return Err(AppError::RateLimited {
            max_requests: gate.policy.max_requests,
            window: gate.policy.window,
        });
    }
    Ok(next.run(request).await)
}

/// Derive the limiter key for a request.
///
/// Precedence: first `X-Forwarded-For` entry (trimmed), then
/// `X-Real-IP`, then the transport peer address, then a shared
/// `"unknown"` bucket. Forwarded headers are client-supplied; behind
/// no verifying proxy this trusts the client, which is the documented
/// trade-off for working behind reverse proxies.
pub fn client_key(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = request
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
    {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    use super::*;

    fn request_with_headers(headers: &[(&str, &str)]) -> Request {
        let mut builder = HttpRequest::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).expect("build request")
    }

    #[test]
    fn forwarded_for_takes_first_entry_trimmed() {
        let req = request_with_headers(&[
            ("x-forwarded-for", " 1.2.3.4 , 10.0.0.1"),
            ("x-real-ip", "9.9.9.9"),
        ]);
        assert_eq!(client_key(&req), "1.2.3.4");
    }

    #[test]
    fn real_ip_used_when_no_forwarded_for() {
        let req = request_with_headers(&[("x-real-ip", "9.9.9.9")]);
        assert_eq!(client_key(&req), "9.9.9.9");
    }

    #[test]
    fn peer_address_used_when_no_headers() {
        let mut req = request_with_headers(&[]);
        let addr: SocketAddr = "192.0.2.7:55555".parse().expect("addr");
        req.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(client_key(&req), "192.0.2.7");
    }

    #[test]
    fn falls_back_to_unknown_bucket() {
        let req = request_with_headers(&[]);
        assert_eq!(client_key(&req), "unknown");
    }
}
