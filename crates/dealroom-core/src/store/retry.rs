//! Retry policy for transient storage failures.
//!
//! Storage backends may rate-limit or briefly drop out; callers retry with
//! exponential backoff and bounded jitter. Only errors classified transient
//! by [`StoreError::is_transient`] are retried, and creates are never run
//! through this path without an idempotency pre-check upstream.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::StoreError;

/// Retry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry.
    #[serde(default = "default_initial_delay", with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Upper bound on the computed delay.
    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,

    /// Upper bound on the random jitter added to each delay.
    #[serde(default = "default_max_jitter", with = "humantime_serde")]
    pub max_jitter: Duration,
}

const fn default_max_attempts() -> u32 {
    4
}

const fn default_initial_delay() -> Duration {
    Duration::from_millis(100)
}

const fn default_max_delay() -> Duration {
    Duration::from_secs(5)
}

const fn default_max_jitter() -> Duration {
    Duration::from_millis(50)
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            max_jitter: default_max_jitter(),
        }
    }
}

/// Executes storage operations with exponential backoff on transient
/// errors.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Creates a policy from configuration.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// The deterministic backoff for a retry attempt (1-based), before
    /// jitter: `initial_delay * 2^(attempt-1)`, capped at `max_delay`.
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.config
            .initial_delay
            .saturating_mul(factor)
            .min(self.config.max_delay)
    }

    fn jittered_delay(&self, attempt: u32) -> Duration {
        let jitter_ms = self.config.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        self.base_delay(attempt) + jitter
    }

    /// Runs `op` until it succeeds, fails permanently, or exhausts
    /// `max_attempts`. Each retry waits the jittered backoff first.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.config.max_attempts => {
                    let delay = match &err {
                        StoreError::RateLimited {
                            retry_after: Some(hint),
                        } => (*hint).max(self.base_delay(attempt)),
                        _ => self.jittered_delay(attempt),
                    };
                    warn!(
                        operation = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient storage error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(8),
            max_jitter: Duration::ZERO,
        })
    }

    #[test]
    fn test_base_delay_doubles_and_caps() {
        let policy = quick_policy(5);
        assert_eq!(policy.base_delay(1), Duration::from_millis(1));
        assert_eq!(policy.base_delay(2), Duration::from_millis(2));
        assert_eq!(policy.base_delay(3), Duration::from_millis(4));
        assert_eq!(policy.base_delay(4), Duration::from_millis(8));
        // Capped at max_delay.
        assert_eq!(policy.base_delay(10), Duration::from_millis(8));
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let policy = quick_policy(5);
        let calls = AtomicU32::new(0);
        let result = policy
            .run("test", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StoreError::Unavailable {
                        detail: "blip".to_string(),
                    })
                } else {
                    Ok(42)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let policy = quick_policy(5);
        let calls = AtomicU32::new(0);
        let result: Result<(), StoreError> = policy
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Precondition {
                    detail: "no".to_string(),
                })
            })
            .await;
        assert!(matches!(result, Err(StoreError::Precondition { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempts_exhausted_returns_last_error() {
        let policy = quick_policy(3);
        let calls = AtomicU32::new(0);
        let result: Result<(), StoreError> = policy
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::RateLimited { retry_after: None })
            })
            .await;
        assert!(matches!(result, Err(StoreError::RateLimited { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
