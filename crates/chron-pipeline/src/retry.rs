//! Bounded retry with exponential backoff and jitter.
//!
//! Used for audit appends, snapshot publishes, and archive uploads. Transport
//! reads are not retried here; the loops back off on those themselves.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use chron_config::PipelineConfig;

/// Retry behaviour for one kind of downstream write.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial one).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Maximum delay between retries (backoff is capped here).
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_attempts: config.retry_max_attempts.max(1),
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }

    /// A policy that tries once and never waits.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Backoff ceiling before retry number `retry` (1-based): `base * 2^(retry-1)`,
    /// capped at `max_delay`.
    #[must_use]
    pub fn backoff_ceiling(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1_u32 << exp)
            .min(self.max_delay)
    }

    /// Jittered delay before retry number `retry`: uniformly between half the
    /// ceiling and the full ceiling.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let ceiling = self.backoff_ceiling(retry);
        let half = ceiling / 2;
        // Entropy failure only removes the jitter.
        let roll = getrandom::u32().unwrap_or(u32::MAX);
        half + half.mul_f64(f64::from(roll) / f64::from(u32::MAX))
    }

    /// Run `op` until it succeeds, `retryable` rejects its error, or the
    /// attempts run out. Returns the last error.
    ///
    /// # Errors
    ///
    /// Returns the error of the final attempt.
    pub async fn run<T, E, F, Fut, R>(&self, operation: &str, mut op: F, retryable: R) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < self.max_attempts && retryable(&error) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        %error,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    tracing::error!(operation, attempt, %error, "giving up");
                    return Err(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[test]
    fn ceiling_doubles_then_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_ceiling(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_ceiling(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_ceiling(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_ceiling(10), Duration::from_secs(2));
        assert_eq!(policy.backoff_ceiling(u32::MAX), Duration::from_secs(2));
    }

    #[test]
    fn jittered_delay_stays_in_band() {
        let policy = RetryPolicy::default();
        for retry in 1..6 {
            let ceiling = policy.backoff_ceiling(retry);
            for _ in 0..50 {
                let delay = policy.delay_for(retry);
                assert!(delay >= ceiling / 2 && delay <= ceiling, "{delay:?} vs {ceiling:?}");
            }
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = fast()
            .run(
                "test",
                || async {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 { Err(format!("fail {n}")) } else { Ok(n) }
                },
                |_| true,
            )
            .await;
        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn stops_at_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = fast()
            .run(
                "test",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("down".to_string())
                },
                |_| true,
            )
            .await;
        assert_eq!(result, Err("down".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = fast()
            .run(
                "test",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("bad request".to_string())
                },
                |e: &String| !e.starts_with("bad"),
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn config_values_carry_over() {
        let config = PipelineConfig {
            retry_max_attempts: 7,
            retry_base_delay_ms: 10,
            retry_max_delay_ms: 50,
            ..PipelineConfig::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_attempts, 7);
        assert_eq!(policy.base_delay, Duration::from_millis(10));
        assert_eq!(policy.max_delay, Duration::from_millis(50));
    }
}
