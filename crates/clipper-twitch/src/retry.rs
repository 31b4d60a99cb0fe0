//! Retry policy with exponential backoff and jitter.
//!
//! Transient failures (5xx in the 500/502/503/504 family and network-level
//! errors) are retried up to a fixed number of attempts, sleeping
//! `backoff * 2^attempt` plus a uniform random jitter before each retry.
//! Rate limiting is never retried here: it is surfaced to the caller.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::warn;

use crate::error::{TwitchError, TwitchResult};
use crate::metrics::record_retry;

/// Exponent cap so the computed delay cannot overflow.
const MAX_BACKOFF_EXPONENT: u32 = 16;

// =============================================================================
// Configuration
// =============================================================================

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay, doubled for every failed attempt.
    pub backoff: Duration,
    /// Upper bound of the random jitter added to each delay.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
            jitter: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: std::env::var("CLIPPER_RETRY_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_attempts),
            backoff: std::env::var("CLIPPER_RETRY_BACKOFF_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff),
            jitter: std::env::var("CLIPPER_RETRY_JITTER_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.jitter),
        }
    }

    /// Set the total number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the base backoff delay.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the jitter upper bound.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retrying after the zero-based `attempt` failed, without jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(attempt.min(MAX_BACKOFF_EXPONENT)))
    }

    /// Delay before retrying after `attempt` failed, jitter included.
    pub fn delay_for_attempt<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms > 0 {
            Duration::from_millis(rng.random_range(0..=jitter_ms))
        } else {
            Duration::ZERO
        };
        self.base_delay(attempt) + jitter
    }
}

// =============================================================================
// Sleeping
// =============================================================================

/// Strategy used to wait between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Sleeper that records requested delays and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .map(|delays| delays.clone())
            .unwrap_or_default()
    }

    /// Number of sleeps requested so far.
    pub fn count(&self) -> usize {
        self.delays.lock().map(|delays| delays.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        if let Ok(mut delays) = self.delays.lock() {
            delays.push(delay);
        }
    }
}

// =============================================================================
// Retry loop
// =============================================================================

/// Execute an async operation with retry.
///
/// `op` receives the zero-based attempt number. Retries on errors for which
/// [`TwitchError::is_retryable`] holds; every other error is returned
/// immediately. When all attempts fail with retryable errors the last one is
/// wrapped in [`TwitchError::RetriesExhausted`].
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    sleeper: &dyn Sleeper,
    mut op: F,
) -> TwitchResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = TwitchResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => {
                if attempt + 1 >= max_attempts {
                    warn!(
                        operation = %operation,
                        attempts = attempt + 1,
                        "Giving up after {} attempts: {}",
                        attempt + 1,
                        e
                    );
                    return Err(TwitchError::RetriesExhausted {
                        attempts: attempt + 1,
                        last: Box::new(e),
                    });
                }

                let delay = policy.delay_for_attempt(attempt, &mut rand::rng());
                warn!(
                    operation = %operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Request failed, retrying: {}",
                    e
                );
                record_retry(operation);

                sleeper.sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::default()
            .with_backoff(Duration::from_millis(10))
            .with_jitter(Duration::ZERO)
    }

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_millis(500));
        assert_eq!(policy.jitter, Duration::from_millis(500));
    }

    #[test]
    fn test_base_delay_doubles() {
        let policy = fast_policy();
        assert_eq!(policy.base_delay(0), Duration::from_millis(10));
        assert_eq!(policy.base_delay(1), Duration::from_millis(20));
        assert_eq!(policy.base_delay(2), Duration::from_millis(40));
    }

    #[test]
    fn test_base_delay_does_not_overflow() {
        let policy = RetryPolicy::default().with_backoff(Duration::from_secs(u64::MAX / 2));
        assert!(policy.base_delay(u32::MAX) >= Duration::from_secs(u64::MAX / 2));
    }

    #[test]
    fn test_jitter_is_bounded() {
        let policy = fast_policy().with_jitter(Duration::from_millis(5));
        let mut rng = rand::rng();
        for _ in 0..100 {
            let delay = policy.delay_for_attempt(1, &mut rng);
            assert!(delay >= Duration::from_millis(20));
            assert!(delay <= Duration::from_millis(25));
        }
    }

    #[test]
    fn test_recording_sleeper_records_without_waiting() {
        let sleeper = RecordingSleeper::new();
        tokio_test::block_on(async {
            sleeper.sleep(Duration::from_secs(3600)).await;
            sleeper.sleep(Duration::from_millis(5)).await;
        });
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_secs(3600), Duration::from_millis(5)]
        );
    }

    #[tokio::test]
    async fn test_retry_eventual_success() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);

        let result = with_retry(&fast_policy(), "test", &sleeper, |_| {
            let count = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if count < 2 {
                    Err(TwitchError::from_http_status(503, "unavailable"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_millis(10), Duration::from_millis(20)]
        );
    }

    #[tokio::test]
    async fn test_retry_exhausted() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);

        let result: TwitchResult<()> = with_retry(&fast_policy(), "test", &sleeper, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TwitchError::from_http_status(500, "boom")) }
        })
        .await;

        match result {
            Err(TwitchError::RetriesExhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last.http_status(), Some(500));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.count(), 2);
    }

    #[tokio::test]
    async fn test_no_retry_on_client_error() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);

        let result: TwitchResult<()> = with_retry(&fast_policy(), "test", &sleeper, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TwitchError::from_http_status(404, "missing")) }
        })
        .await;

        assert!(matches!(result, Err(TwitchError::RequestFailed { status: 404, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(sleeper.count(), 0);
    }

    #[tokio::test]
    async fn test_no_retry_on_rate_limit() {
        let sleeper = RecordingSleeper::new();

        let result: TwitchResult<()> = with_retry(&fast_policy(), "test", &sleeper, |_| async {
            Err(TwitchError::RateLimited {
                reset_at: None,
                wait: Duration::from_secs(1),
            })
        })
        .await;

        assert!(matches!(result, Err(TwitchError::RateLimited { .. })));
        assert_eq!(sleeper.count(), 0);
    }

    #[tokio::test]
    async fn test_single_attempt_policy() {
        let sleeper = RecordingSleeper::new();
        let policy = fast_policy().with_max_attempts(0);

        let result: TwitchResult<()> = with_retry(&policy, "test", &sleeper, |_| async {
            Err(TwitchError::from_http_status(502, "bad gateway"))
        })
        .await;

        assert!(matches!(
            result,
            Err(TwitchError::RetriesExhausted { attempts: 1, .. })
        ));
        assert_eq!(sleeper.count(), 0);
    }
}
