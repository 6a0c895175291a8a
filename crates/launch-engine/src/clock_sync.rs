//! Venue clock synchronization.
//!
//! One round trip to the venue clock, bracketed by two local readings. The
//! local reference is the midpoint of the bracket, which assumes symmetric
//! network latency.

use std::sync::Arc;

use launch_core::{Clock, TimeOffset};
use launch_exchange::{DynExchangeClient, ExchangeError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};
use crate::retry::{RetryOutcome, RetryPolicy};

/// Offsets larger than this (either direction) are worth a warning.
pub const OFFSET_WARN_THRESHOLD_MS: i64 = 2_000;

/// `venue - midpoint(before, after)`.
pub fn offset_from_probe(before_ms: i64, venue_ms: i64, after_ms: i64) -> TimeOffset {
    let midpoint = before_ms + (after_ms - before_ms) / 2;
    TimeOffset::from_millis(venue_ms - midpoint)
}

pub struct ClockSynchronizer {
    exchange: DynExchangeClient,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl ClockSynchronizer {
    pub fn new(exchange: DynExchangeClient, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self {
            exchange,
            clock,
            retry,
        }
    }

    /// Measure the offset between the venue clock and the local clock.
    ///
    /// Fatal if the venue time cannot be read within the retry budget.
    pub async fn synchronize(&self, cancel: &CancellationToken) -> EngineResult<TimeOffset> {
        let exchange = self.exchange.as_ref();
        let clock = self.clock.as_ref();

        // Each attempt takes its own bracket so a retried probe never mixes
        // timestamps from different round trips.
        let outcome = self
            .retry
            .run("server_time", cancel, move || async move {
                let before = clock.now_ms();
                let venue = exchange.server_time().await?;
                let after = clock.now_ms();
                Ok::<_, ExchangeError>((before, venue, after))
            })
            .await;

        let (before, venue, after) = match outcome {
            RetryOutcome::Success(sample) => sample,
            RetryOutcome::Unavailable {
                attempts,
                last_error,
            } => {
                return Err(EngineError::ClockSync {
                    attempts,
                    reason: last_error.to_string(),
                })
            }
            RetryOutcome::Cancelled => return Err(EngineError::Cancelled),
        };

        let offset = offset_from_probe(before, venue, after);
        let round_trip_ms = after - before;

        if offset.as_millis().abs() > OFFSET_WARN_THRESHOLD_MS {
            warn!(
                offset = %offset,
                round_trip_ms,
                "Local clock is far from venue clock"
            );
        } else {
            info!(offset = %offset, round_trip_ms, "Clock synchronized");
        }

        Ok(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use launch_exchange::MockExchange;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::time::Duration;

    /// Local clock that advances 40ms on every read.
    struct SteppingClock(AtomicI64);

    impl Clock for SteppingClock {
        fn now_ms(&self) -> i64 {
            self.0.fetch_add(40, Ordering::SeqCst)
        }
    }

    fn retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(50))
    }

    #[test]
    fn test_offset_is_venue_minus_midpoint() {
        assert_eq!(offset_from_probe(1_000, 1_600, 1_200).as_millis(), 500);
        assert_eq!(offset_from_probe(1_000, 900, 1_200).as_millis(), -200);
        // Integer midpoint
        assert_eq!(offset_from_probe(1_000, 1_000, 1_001).as_millis(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_synchronize_uses_successful_attempt() {
        let mock = Arc::new(MockExchange::new(5_000_000));
        mock.push_server_time_error(ExchangeError::Timeout("slow".into()));

        let clock = Arc::new(SteppingClock(AtomicI64::new(1_000_000)));
        let sync = ClockSynchronizer::new(mock.clone(), clock, retry());

        let offset = sync.synchronize(&CancellationToken::new()).await.unwrap();

        // Failed attempt reads 1_000_000 only. Successful attempt brackets
        // 1_000_040 .. 1_000_080, midpoint 1_000_060. Venue time has advanced
        // by at least the 10ms backoff.
        let expected = 5_000_010 - 1_000_060;
        assert!((expected..expected + 5).contains(&offset.as_millis()));
        assert_eq!(MockExchange::count(&mock.calls().server_time), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_synchronize_fails_after_retries() {
        let mock = Arc::new(MockExchange::new(0));
        for _ in 0..3 {
            mock.push_server_time_error(ExchangeError::HttpClient("refused".into()));
        }
        let clock = Arc::new(SteppingClock(AtomicI64::new(0)));
        let sync = ClockSynchronizer::new(mock, clock, retry());

        let err = sync.synchronize(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::ClockSync { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_synchronize_cancelled() {
        let mock = Arc::new(MockExchange::default());
        let clock = Arc::new(SteppingClock(AtomicI64::new(0)));
        let sync = ClockSynchronizer::new(mock, clock, retry());

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(sync.synchronize(&cancel).await.unwrap_err().is_cancelled());
    }
}
