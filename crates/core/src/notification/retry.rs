//! Retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::RetryConfig;

/// Attempt ceiling and backoff bounds for one retried operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never below 1.
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            min_delay: Duration::from_millis(config.min_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms.max(config.min_delay_ms)),
            multiplier: config.multiplier.max(1.0),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Delay to wait after the `failed_attempt`-th failure (1-based).
    ///
    /// `min_delay * multiplier^(failed_attempt - 1)`, clamped to
    /// `[min_delay, max_delay]`. Non-decreasing in `failed_attempt`.
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(64) as i32;
        let secs = self.min_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let max_secs = self.max_delay.as_secs_f64();
        if !secs.is_finite() || secs >= max_secs {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs).clamp(self.min_delay, self.max_delay)
    }
}

/// Result of [`retry_with_backoff`] with the attempt history.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    /// Attempts made, including the first one.
    pub attempts: u32,
    /// Delays waited between attempts.
    pub delays: Vec<Duration>,
}

/// Runs `operation` until it succeeds, the policy runs out of attempts, or
/// `cancel` fires while waiting between attempts.
///
/// `operation` receives the 1-based attempt number. On exhaustion or
/// cancellation the last error is returned.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    cancel: &CancellationToken,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut delays = Vec::new();
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    info!(
                        operation = operation_name,
                        attempt, "Operation succeeded after retry"
                    );
                }
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                    delays,
                };
            }
            Err(e) if attempt >= max_attempts => {
                warn!(
                    operation = operation_name,
                    attempts = attempt,
                    error = %e,
                    "Operation failed, retries exhausted"
                );
                return RetryOutcome {
                    result: Err(e),
                    attempts: attempt,
                    delays,
                };
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, will retry"
                );

                tokio::select! {
                    _ = cancel.cancelled() => {
                        warn!(operation = operation_name, attempt, "Retry cancelled");
                        return RetryOutcome {
                            result: Err(e),
                            attempts: attempt,
                            delays,
                        };
                    }
                    _ = tokio::time::sleep(delay) => {}
                }

                delays.push(delay);
                attempt += 1;
            }
        }
    }
}
