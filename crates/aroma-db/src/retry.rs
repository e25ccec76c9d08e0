//! # Read Retry
//!
//! Bounded exponential backoff for idempotent reads.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  list / get ──► attempt 1 ──► PoolExhausted (transient)                 │
//! │                    │ sleep ~50ms                                        │
//! │                    ▼                                                    │
//! │                 attempt 2 ──► ConnectionFailed (transient)              │
//! │                    │ sleep ~100ms                                       │
//! │                    ▼                                                    │
//! │                 attempt 3 ──► Ok(rows)                                  │
//! │                                                                         │
//! │  NotFound, DuplicateName, ... ──► returned immediately                  │
//! │  max_elapsed reached           ──► last error returned                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes are never retried here; a failed write is reported as-is.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use tracing::{debug, warn};

use crate::error::DbResult;

/// How long and how often reads are retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Wait before the second attempt.
    pub initial_interval: Duration,

    /// Upper bound on a single wait.
    pub max_interval: Duration,

    /// Total time after which the last error is returned.
    pub max_elapsed: Duration,
}

impl RetryPolicy {
    /// Default intervals with a custom total budget.
    pub fn with_max_elapsed(max_elapsed: Duration) -> Self {
        RetryPolicy {
            max_elapsed,
            ..Default::default()
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        RetryPolicy::with_max_elapsed(Duration::ZERO)
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            multiplier: 2.0,
            max_elapsed_time: Some(self.max_elapsed),
            ..Default::default()
        };
        // Start from initial_interval, not the crate default
        backoff.reset();
        backoff
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            initial_interval: Duration::from_millis(50),
            max_interval: Duration::from_millis(500),
            max_elapsed: Duration::from_secs(2),
        }
    }
}

/// Runs `op` until it succeeds, fails permanently, or the policy runs out.
///
/// ## Arguments
/// * `policy` - Backoff intervals and total budget
/// * `operation` - Name used in log lines
/// * `op` - Produces a fresh future per attempt
pub async fn retry_read<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> DbResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DbResult<T>>,
{
    if policy.max_elapsed.is_zero() {
        return op().await;
    }

    let mut backoff = policy.create_backoff();
    let mut attempt: u32 = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => match backoff.next_backoff() {
                Some(wait) => {
                    warn!(operation, attempt, ?wait, error = %e, "Transient read failure, retrying");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                None => {
                    debug!(operation, attempt, "Retry budget exhausted");
                    return Err(e);
                }
            },
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(2),
            max_elapsed: Duration::from_millis(500),
        }
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let calls = AtomicU32::new(0);
        let result = retry_read(&fast_policy(), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(DbError::PoolExhausted)
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: DbResult<()> = retry_read(&fast_policy(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(DbError::not_found("Recipe", "x")) }
        })
        .await;

        assert!(matches!(result, Err(DbError::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let policy = RetryPolicy {
            initial_interval: Duration::from_millis(5),
            max_interval: Duration::from_millis(5),
            max_elapsed: Duration::from_millis(30),
        };
        let result: DbResult<()> =
            retry_read(&policy, "test", || async { Err(DbError::PoolExhausted) }).await;
        assert!(matches!(result, Err(DbError::PoolExhausted)));
    }
}
