//! Retry policy with exponential backoff.
//!
//! Wraps a single provider call in a bounded retry loop. The policy owns the
//! retryability classification: rate-limit (429) and unavailable (503)
//! statuses, connection-reset/timeout network codes, and empty completions
//! are retried; everything else propagates immediately.

use gateway_core::{GatewayError, GatewayResult};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Additional attempts after the first (0 = no retries)
    pub max_retries: u32,
    /// Base delay for the exponential backoff
    pub base_delay: Duration,
    /// Cap applied to the exponential term
    pub max_delay: Duration,
    /// Upper bound (exclusive) of the uniform jitter added to each delay
    pub jitter: Duration,
    /// HTTP status codes to retry on
    pub retry_on_status: Vec<u16>,
    /// Network error codes to retry on
    pub retry_on_codes: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(10),
            jitter: Duration::from_millis(1000),
            retry_on_status: vec![429, 503],
            retry_on_codes: vec!["connection_reset".to_string(), "timeout".to_string()],
        }
    }
}

/// Retry policy implementation
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Create a policy with the default configuration and a custom budget
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self::new(RetryConfig {
            max_retries,
            ..Default::default()
        })
    }

    /// Calculate the backoff delay after a failed attempt (1-indexed).
    ///
    /// The delay is `min(base * 2^(attempt-1), max_delay)` plus a uniformly
    /// random jitter in `[0, jitter)`, truncated to whole milliseconds.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.config.base_delay.as_millis() as u64;
        let exponent = attempt.saturating_sub(1).min(31);
        let exponential = base.saturating_mul(1_u64 << exponent);
        let capped = exponential.min(self.config.max_delay.as_millis() as u64);

        let jitter_bound = self.config.jitter.as_millis() as u64;
        let jitter = if jitter_bound == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..jitter_bound)
        };

        Duration::from_millis(capped + jitter)
    }

    /// Check whether an error is retryable under this policy
    #[must_use]
    pub fn is_retryable(&self, error: &GatewayError) -> bool {
        match error {
            GatewayError::EmptyResponse { .. } => true,
            GatewayError::Provider {
                status_code,
                error_code,
                ..
            } => {
                if let Some(status) = status_code {
                    if self.config.retry_on_status.contains(status) {
                        return true;
                    }
                }
                error_code
                    .as_deref()
                    .is_some_and(|code| self.config.retry_on_codes.iter().any(|c| c == code))
            }
            _ => false,
        }
    }

    /// Execute an operation under the retry budget.
    ///
    /// The first attempt plus up to `max_retries` additional attempts are
    /// made. Each attempt is tagged with a fresh trace id for observability;
    /// the id has no behavioral effect. Terminal errors propagate verbatim
    /// without consuming further attempts; exhausting the budget yields
    /// [`GatewayError::RetryExhausted`] wrapping the last failure.
    ///
    /// # Errors
    /// Returns the terminal error, or `RetryExhausted` after the budget is
    /// consumed.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> GatewayResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let total_attempts = self.config.max_retries.saturating_add(1);
        let mut last_error: Option<GatewayError> = None;

        for attempt in 1..=total_attempts {
            let trace_id = Uuid::new_v4();
            debug!(%trace_id, attempt, total_attempts, "issuing attempt");

            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(%trace_id, attempt, "retry succeeded");
                    }
                    return Ok(result);
                }
                Err(error) if !self.is_retryable(&error) => {
                    warn!(%trace_id, attempt, error = %error, "terminal error, not retrying");
                    return Err(error);
                }
                Err(error) => {
                    warn!(
                        %trace_id,
                        attempt,
                        remaining = total_attempts - attempt,
                        error = %error,
                        "retryable failure"
                    );
                    if attempt == total_attempts {
                        last_error = Some(error);
                        break;
                    }
                    let delay = self.delay_for_attempt(attempt);
                    debug!(%trace_id, delay_ms = delay.as_millis() as u64, "backing off");
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(match last_error {
            Some(error) => GatewayError::RetryExhausted {
                attempts: total_attempts,
                source: Box::new(error),
            },
            None => GatewayError::internal("retry loop ended without an error"),
        })
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(RetryConfig {
            max_retries,
            base_delay: Duration::from_millis(1),
            jitter: Duration::ZERO,
            ..Default::default()
        })
    }

    fn rate_limited() -> GatewayError {
        GatewayError::provider("openai", "rate limited", Some(429), None)
    }

    #[test]
    fn delay_doubles_then_caps() {
        let policy = RetryPolicy::new(RetryConfig {
            jitter: Duration::ZERO,
            ..Default::default()
        });

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(8000));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(10000));
        assert_eq!(policy.delay_for_attempt(9), Duration::from_millis(10000));
    }

    #[test]
    fn delay_with_jitter_stays_in_window() {
        let policy = RetryPolicy::new(RetryConfig::default());

        for attempt in 1..=6 {
            let cap = (1000_u64 * (1 << (attempt - 1))).min(10_000);
            for _ in 0..50 {
                let delay = policy.delay_for_attempt(attempt).as_millis() as u64;
                assert!(delay >= cap, "attempt {attempt}: {delay} < {cap}");
                assert!(
                    delay < cap + 1000,
                    "attempt {attempt}: {delay} >= {}",
                    cap + 1000
                );
            }
        }
    }

    #[test]
    fn classification_table() {
        let policy = RetryPolicy::new(RetryConfig::default());

        assert!(policy.is_retryable(&rate_limited()));
        assert!(policy.is_retryable(&GatewayError::provider(
            "openai",
            "unavailable",
            Some(503),
            None
        )));
        assert!(policy.is_retryable(&GatewayError::provider(
            "openai",
            "reset",
            None,
            Some("connection_reset".to_string())
        )));
        assert!(policy.is_retryable(&GatewayError::provider(
            "openai",
            "timed out",
            None,
            Some("timeout".to_string())
        )));
        assert!(policy.is_retryable(&GatewayError::empty_response("openai")));

        assert!(!policy.is_retryable(&GatewayError::provider(
            "openai",
            "bad request",
            Some(400),
            None
        )));
        assert!(!policy.is_retryable(&GatewayError::provider(
            "openai",
            "unauthorized",
            Some(401),
            None
        )));
        assert!(!policy.is_retryable(&GatewayError::validation("bad", None)));
        assert!(!policy.is_retryable(&GatewayError::configuration("bad")));
    }

    #[tokio::test]
    async fn success_on_first_attempt_makes_one_call() {
        let policy = fast_policy(3);
        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);

        let result: GatewayResult<u32> = policy
            .execute(|| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::Relaxed);
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn retryable_failures_then_success() {
        let policy = fast_policy(3);
        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);

        let result: GatewayResult<u32> = policy
            .execute(|| {
                let c = Arc::clone(&c);
                async move {
                    if c.fetch_add(1, Ordering::Relaxed) < 2 {
                        Err(rate_limited())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn exhaustion_wraps_last_error() {
        let policy = fast_policy(2);
        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);

        let result: GatewayResult<u32> = policy
            .execute(|| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::Relaxed);
                    Err(rate_limited())
                }
            })
            .await;

        assert_eq!(counter.load(Ordering::Relaxed), 3);
        match result.unwrap_err() {
            GatewayError::RetryExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert_eq!(source.status_code(), Some(429));
            }
            other => panic!("expected RetryExhausted, got {other}"),
        }
    }

    #[tokio::test]
    async fn terminal_error_propagates_after_one_attempt() {
        let policy = fast_policy(3);
        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);

        let result: GatewayResult<u32> = policy
            .execute(|| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::Relaxed);
                    Err(GatewayError::provider(
                        "openai",
                        "bad request",
                        Some(400),
                        None,
                    ))
                }
            })
            .await;

        assert_eq!(counter.load(Ordering::Relaxed), 1);
        assert_eq!(result.unwrap_err().status_code(), Some(400));
    }

    #[tokio::test]
    async fn empty_response_is_retried() {
        let policy = fast_policy(1);
        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);

        let result: GatewayResult<u32> = policy
            .execute(|| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::Relaxed);
                    Err(GatewayError::empty_response("openai"))
                }
            })
            .await;

        assert_eq!(counter.load(Ordering::Relaxed), 2);
        assert!(matches!(
            result.unwrap_err(),
            GatewayError::RetryExhausted { .. }
        ));
    }

    #[tokio::test]
    async fn zero_budget_means_single_attempt() {
        let policy = fast_policy(0);
        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);

        let result: GatewayResult<u32> = policy
            .execute(|| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::Relaxed);
                    Err(rate_limited())
                }
            })
            .await;

        assert_eq!(counter.load(Ordering::Relaxed), 1);
        assert!(result.is_err());
    }
}
