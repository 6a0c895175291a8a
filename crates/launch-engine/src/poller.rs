//! Generic poll-until-ready loop.
//!
//! Used for "instrument is listed" and "price is live". A fetch that comes
//! back unavailable counts as one not-ready cycle; only cancellation ends
//! the loop without a value.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};
use crate::retry::{sleep_or_cancel, RetryOutcome};

/// Verdict of a readiness predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness<T> {
    Ready(T),
    /// Not yet; the string says why.
    Waiting(String),
}

/// Accepted value and how many fetches it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polled<T> {
    pub value: T,
    pub fetches: u32,
}

/// Fetch, test, sleep `interval`, repeat.
pub async fn poll_until<R, T, F, Fut, P>(
    what: &'static str,
    interval: Duration,
    cancel: &CancellationToken,
    mut fetch: F,
    mut predicate: P,
) -> EngineResult<Polled<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RetryOutcome<R>>,
    P: FnMut(R) -> Readiness<T>,
{
    let mut fetches = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        fetches += 1;
        match fetch().await {
            RetryOutcome::Success(raw) => match predicate(raw) {
                Readiness::Ready(value) => {
                    info!(what, fetches, "Ready");
                    return Ok(Polled { value, fetches });
                }
                Readiness::Waiting(reason) => {
                    info!(what, fetch = fetches, %reason, "Not yet available");
                }
            },
            RetryOutcome::Unavailable {
                attempts,
                last_error,
            } => {
                warn!(
                    what,
                    fetch = fetches,
                    attempts,
                    error = %last_error,
                    "Fetch unavailable, will poll again"
                );
            }
            RetryOutcome::Cancelled => return Err(EngineError::Cancelled),
        }

        if !sleep_or_cancel(interval, cancel).await {
            return Err(EngineError::Cancelled);
        }
    }
}
