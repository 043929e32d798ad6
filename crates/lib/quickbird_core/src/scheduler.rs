//! Daily usage-reset scheduler.
//!
//! One background task for the life of the process: sleep until local
//! midnight, zero every user's `usage_count`, repeat. The wait is
//! recomputed from the calendar each cycle, so the boundary never
//! drifts the way a fixed-interval poll would.

use std::future::Future;
use std::time::Duration;

use chrono::{Days, Local, NaiveDateTime};
use sqlx::PgPool;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::auth::{AuthError, queries};

/// Wait applied after a failed reset before retrying.
const ERROR_BACKOFF: Duration = Duration::from_secs(3600);

/// Run the reset loop until `token` is cancelled.
///
/// Per-cycle failures are logged and retried after a backoff; they
/// never escape this function, which must outlive every request.
pub async fn run(pool: PgPool, token: CancellationToken) {
    run_with(token, move || {
        let pool = pool.clone();
        async move { queries::reset_all_usage(&pool).await }
    })
    .await
}

async fn run_with<F, Fut>(token: CancellationToken, mut reset: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<u64, AuthError>>,
{
    info!("usage reset scheduler started");
    'midnights: loop {
        let wait = duration_until_next_midnight(Local::now().naive_local());
        tokio::select! {
            _ = token.cancelled() => break 'midnights,
            _ = sleep(wait) => {}
        }
        // Retry a failed reset on a fixed backoff; do not leave the
        // day's counters stale until the next boundary.
        loop {
            match reset().await {
                Ok(rows) => {
                    info!(rows, "daily usage counters reset");
                    break;
                }
                Err(e) => {
                    error!(error = %e, backoff_secs = ERROR_BACKOFF.as_secs(), "usage reset failed");
                    tokio::select! {
                        _ = token.cancelled() => break 'midnights,
                        _ = sleep(ERROR_BACKOFF) => {}
                    }
                }
            }
        }
    }
    info!("usage reset scheduler stopped");
}

/// Exact duration from `now` to the next local midnight.
///
/// Midnight itself maps to a full day: the reset for the boundary just
/// crossed has already run.
pub fn duration_until_next_midnight(now: NaiveDateTime) -> Duration {
    let next_midnight = now
        .date()
        .checked_add_days(Days::new(1))
        .expect("date within chrono range")
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time");
    (next_midnight - now)
        .to_std()
        .expect("next midnight is in the future")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use chrono::NaiveDate;

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .expect("valid date")
            .and_hms_opt(h, min, s)
            .expect("valid time")
    }

    #[test]
    fn noon_is_half_a_day_from_midnight() {
        let wait = duration_until_next_midnight(at(2026, 3, 14, 12, 0, 0));
        assert_eq!(wait, Duration::from_secs(12 * 3600));
    }

    #[test]
    fn just_before_midnight() {
        let wait = duration_until_next_midnight(at(2026, 3, 14, 23, 59, 30));
        assert_eq!(wait, Duration::from_secs(30));
    }

    #[test]
    fn exactly_midnight_waits_a_full_day() {
        let wait = duration_until_next_midnight(at(2026, 3, 14, 0, 0, 0));
        assert_eq!(wait, Duration::from_secs(24 * 3600));
    }

    #[test]
    fn crosses_year_boundary() {
        let wait = duration_until_next_midnight(at(2026, 12, 31, 23, 0, 0));
        assert_eq!(wait, Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn loop_resets_across_boundaries_and_stops_on_cancel() {
        let count = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();

        let handle = tokio::spawn(run_with(token.clone(), {
            let count = count.clone();
            move || {
                let count = count.clone();
                async move {
                    // Second cycle fails; the loop must back off and survive.
                    let n = count.fetch_add(1, Ordering::SeqCst) + 1;
                    if n == 2 {
                        Err(AuthError::Internal("simulated reset failure".into()))
                    } else {
                        Ok(1)
                    }
                }
            }
        }));

        // Paused-clock sleeps auto-advance, so simulated midnights fly by.
        while count.load(Ordering::SeqCst) < 3 {
            sleep(Duration::from_secs(3600)).await;
        }

        token.cancel();
        handle.await.expect("scheduler task");
        assert!(count.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_reset_retries_after_backoff_not_at_next_midnight() {
        let calls: Arc<Mutex<Vec<tokio::time::Instant>>> = Arc::new(Mutex::new(Vec::new()));
        let token = CancellationToken::new();

        let handle = tokio::spawn(run_with(token.clone(), {
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                async move {
                    let mut calls = calls.lock().expect("lock");
                    calls.push(tokio::time::Instant::now());
                    // First attempt fails; the retry must land one
                    // backoff later, not a day later.
                    if calls.len() == 1 {
                        Err(AuthError::Internal("simulated reset failure".into()))
                    } else {
                        Ok(1)
                    }
                }
            }
        }));

        while calls.lock().expect("lock").len() < 2 {
            sleep(Duration::from_secs(60)).await;
        }

        token.cancel();
        handle.await.expect("scheduler task");

        let calls = calls.lock().expect("lock");
        let gap = calls[1] - calls[0];
        assert!(
            gap >= ERROR_BACKOFF && gap < ERROR_BACKOFF + Duration::from_secs(120),
            "retry gap was {gap:?}, expected about {ERROR_BACKOFF:?}"
        );
    }
}
