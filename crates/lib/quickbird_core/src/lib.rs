//! # quickbird_core
//!
//! Core domain logic for Quickbird: token auth, rate limiting,
//! usage accounting, and the daily reset scheduler.

pub mod auth;
pub mod db;
pub mod migrate;
pub mod models;
pub mod ratelimit;
pub mod scheduler;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
