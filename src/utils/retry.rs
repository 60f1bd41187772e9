// =============================================================================
// utils/retry.rs
// =============================================================================
// Bounded retry combinator for upstream calls: per-attempt timeout, linear
// backoff with jitter. Non-recoverable errors (bad input, range-too-large)
// abort immediately so the caller's own handling can run.
// =============================================================================

use crate::errors::{ScopeError, ScopeResult};
use crate::logger::{self, LogTag};
use rand::Rng;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Jitter added on top of each backoff step (ms)
const BACKOFF_JITTER_MS: u64 = 100;

/// Retry policy: attempts, backoff base, and per-attempt timeout
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Max attempts including the first
    pub max_attempts: u32,
    /// Linear backoff base; attempt n sleeps base * n
    pub backoff_base: Duration,
    /// Per-attempt timeout
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(400),
            attempt_timeout: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base_ms: u64, attempt_timeout_secs: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base: Duration::from_millis(backoff_base_ms),
            attempt_timeout: Duration::from_secs(attempt_timeout_secs),
        }
    }

    /// Linear backoff with a little jitter to avoid retry alignment
    fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.backoff_base.as_millis() as u64 * attempt as u64;
        let jitter = rand::thread_rng().gen_range(0..=BACKOFF_JITTER_MS);
        Duration::from_millis(base_ms + jitter)
    }
}

/// Call async closure `op` with bounded retries per the policy.
///
/// Retries only errors classified recoverable by [`ScopeError::is_recoverable`].
/// A per-attempt timeout counts as a recoverable failure.
pub async fn retry_with_backoff<F, Fut, T>(policy: &RetryPolicy, op_name: &str, op: F) -> ScopeResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = ScopeResult<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = match timeout(policy.attempt_timeout, op()).await {
            Ok(res) => res,
            Err(_) => Err(ScopeError::Timeout {
                seconds: policy.attempt_timeout.as_secs(),
            }),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_recoverable() => return Err(e),
            Err(e) => {
                if attempt >= policy.max_attempts {
                    logger::warning(
                        LogTag::Api,
                        &format!("{} failed after {} attempts: {}", op_name, attempt, e),
                    );
                    return Err(e);
                }

                let backoff = policy.backoff_for_attempt(attempt);
                logger::debug(
                    LogTag::Api,
                    &format!(
                        "{} failed (attempt {}/{}): {}. Retrying in {}ms",
                        op_name,
                        attempt,
                        policy.max_attempts,
                        e,
                        backoff.as_millis()
                    ),
                );
                sleep(backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let policy = RetryPolicy::default();
        let result = retry_with_backoff(&policy, "test", || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_recoverable_error_is_retried() {
        let policy = RetryPolicy::new(3, 1, 5);
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(&policy, "test", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 1 {
                Err(ScopeError::Network("flaky".to_string()))
            } else {
                Ok("ok")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_recoverable_aborts_immediately() {
        let policy = RetryPolicy::new(3, 1, 5);
        let calls = AtomicU32::new(0);
        let result: ScopeResult<()> = retry_with_backoff(&policy, "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ScopeError::RangeTooLarge { from_block: 0, to_block: 500_000 })
        })
        .await;
        assert!(result.unwrap_err().is_range_too_large());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let policy = RetryPolicy::new(2, 1, 5);
        let calls = AtomicU32::new(0);
        let result: ScopeResult<()> = retry_with_backoff(&policy, "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ScopeError::Network("down".to_string()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
