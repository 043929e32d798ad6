//! Sliding-window rate limiting keyed by client address.
//!
//! The limiter is policy-agnostic: each call supplies its own
//! [`RatePolicy`], so the HTTP layer can apply different ceilings per
//! route class. It is a denial-of-abuse heuristic, not a security
//! boundary; a lost update under contention can let a client slightly
//! exceed its budget.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Absolute retention ceiling for recorded request instants.
const RETENTION: Duration = Duration::from_secs(3600);

/// Minimum interval between bulk sweeps across all keys.
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// A per-route-class admission policy.
#[derive(Debug, Clone, Copy)]
pub struct RatePolicy {
    /// Maximum requests admitted within the window.
    pub max_requests: usize,
    /// Trailing window length.
    pub window: Duration,
}

impl RatePolicy {
    pub const fn new(max_requests: usize, window_seconds: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_seconds),
        }
    }
}

/// Sliding-window request counter.
///
/// One instance is constructed at process start and shared behind an
/// `Arc`; per-key state lives in a concurrent map so requests for
/// different keys never contend on one lock.
pub struct RateLimiter {
    windows: DashMap<String, VecDeque<Instant>>,
    last_sweep: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// Admit or reject a request for `key` under `policy`.
    ///
    /// Admission records the request instant; rejection records
    /// nothing, so a limited client's retries do not dig the hole
    /// deeper.
    pub fn admit(&self, key: &str, policy: RatePolicy) -> bool {
        self.admit_at(key, policy, Instant::now())
    }

    /// [`admit`](Self::admit) with an explicit clock, for tests.
    pub fn admit_at(&self, key: &str, policy: RatePolicy, now: Instant) -> bool {
        self.maybe_sweep(now);

        let mut times = self.windows.entry(key.to_string()).or_default();
        evict(&mut times, now, policy.window);

        if times.len() >= policy.max_requests {
            return false;
        }
        times.push_back(now);
        true
    }

    /// Drop all recorded state.
    pub fn clear(&self) {
        self.windows.clear();
    }

    /// Number of keys with recorded state.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Bulk-evict instants past the retention ceiling, at most once per
    /// sweep interval. Keys left empty are removed entirely.
    fn maybe_sweep(&self, now: Instant) {
        {
            let mut last = match self.last_sweep.lock() {
                Ok(guard) => guard,
                // A poisoned sweep clock only delays cleanup.
                Err(poisoned) => poisoned.into_inner(),
            };
            if now.saturating_duration_since(*last) < SWEEP_INTERVAL {
                return;
            }
            *last = now;
        }
        self.windows.retain(|_, times| {
            evict(times, now, RETENTION);
            !times.is_empty()
        });
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Pop instants older than `now - window` from the front.
///
/// Shared by the per-call lazy purge and the periodic bulk sweep so
/// the eviction rule exists in exactly one place.
fn evict(times: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(front) = times.front() {
        if now.saturating_duration_since(*front) >= window {
            times.pop_front();
        } else {
            break;
        }
    }
}
