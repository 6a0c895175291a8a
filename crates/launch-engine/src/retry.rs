//! Retry with exponential backoff for idempotent venue calls.
//!
//! Delay after the n-th failed attempt is `base * 2^(n-1)`, capped at
//! `max_delay`. Only errors classified as retryable are repeated; anything
//! else ends the attempts at once. Order submission never goes through here.

use std::future::Future;
use std::time::Duration;

use launch_exchange::{ExchangeError, ExchangeResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Result of a retried operation.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    Success(T),
    /// Attempts exhausted, or a non-retryable error ended them early.
    Unavailable {
        attempts: u32,
        last_error: ExchangeError,
    },
    /// The cancellation token fired during a request or a backoff sleep.
    Cancelled,
}

impl<T> RetryOutcome<T> {
    /// The value, if the operation succeeded.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Backoff policy shared by every idempotent call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Delay before the attempt following failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // attempt=1 -> base, attempt=2 -> 2*base, attempt=3 -> 4*base
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails permanently, runs out of
    /// attempts, or `cancel` fires.
    pub async fn run<T, F, Fut>(
        self,
        operation: &'static str,
        cancel: &CancellationToken,
        mut call: F,
    ) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ExchangeResult<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return RetryOutcome::Cancelled,
                result = call() => result,
            };

            let error = match result {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "Succeeded after retry");
                    }
                    return RetryOutcome::Success(value);
                }
                Err(e) => e,
            };

            if !error.is_retryable() || attempt >= self.max_attempts {
                warn!(
                    operation,
                    attempt,
                    retryable = error.is_retryable(),
                    error = %error,
                    "Operation unavailable"
                );
                return RetryOutcome::Unavailable {
                    attempts: attempt,
                    last_error: error,
                };
            }

            let delay = self.delay_for(attempt);
            warn!(
                operation,
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Transient failure, backing off"
            );

            if !sleep_or_cancel(delay, cancel).await {
                return RetryOutcome::Cancelled;
            }
        }
    }
}

/// Sleep for `duration` unless `cancel` fires first.
///
/// Returns `false` when cancelled.
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}
