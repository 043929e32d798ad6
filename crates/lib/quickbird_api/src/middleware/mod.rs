//! Request-admission middleware.
//!
//! Ordering on every protected route: rate limiter first, then the
//! auth gate, then (for metered routes) the quota guard.

pub mod auth;
pub mod rate_limit;
pub mod usage;
