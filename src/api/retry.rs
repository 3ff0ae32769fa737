use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::RecoverableError;

use super::Operation;

/// Retry ceiling and exponential backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, doubled for every further retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Policy that gives up after the first failure.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Sum of every backoff delay when all attempts fail.
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_retries)
            .map(|retry| self.delay_for(retry))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Run `attempt` until it succeeds, fails with a non-retryable error, or the
/// retry ceiling is reached.
///
/// Backoff sleeps race against `cancel`; a cancelled wait ends the call with
/// the last error instead of starting another attempt.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: Operation,
    mut attempt: F,
) -> Result<T, RecoverableError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, RecoverableError>>,
{
    let mut retry = 0;
    loop {
        let err = match attempt(retry).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retryable() || retry >= policy.max_retries {
            return Err(err);
        }

        let delay = policy.delay_for(retry);
        tracing::debug!(
            operation = %operation,
            attempt = retry + 1,
            delay_ms = delay.as_millis() as u64,
            kind = %err.kind,
            "Attempt failed, retrying"
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(operation = %operation, "Retry cancelled");
                return Err(err);
            }
            _ = tokio::time::sleep(delay) => {}
        }

        retry += 1;
    }
}
