//! Countdown to the launch window on venue time.

use std::sync::Arc;
use std::time::Duration;

use launch_core::{Clock, LaunchSchedule, TimeOffset};
use launch_exchange::DynExchangeClient;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::retry::sleep_or_cancel;

pub struct LaunchScheduler {
    exchange: DynExchangeClient,
    clock: Arc<dyn Clock>,
}

impl LaunchScheduler {
    pub fn new(exchange: DynExchangeClient, clock: Arc<dyn Clock>) -> Self {
        Self { exchange, clock }
    }

    /// Venue time for this iteration; local time corrected by `offset` when
    /// the venue clock cannot be read.
    async fn venue_now(&self, offset: TimeOffset, cancel: &CancellationToken) -> EngineResult<i64> {
        let read = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(EngineError::Cancelled),
            read = self.exchange.server_time() => read,
        };

        match read {
            Ok(ms) => Ok(ms),
            Err(e) => {
                let estimated = offset.apply(self.clock.now_ms());
                debug!(error = %e, estimated, "Venue time unavailable, using local estimate");
                Ok(estimated)
            }
        }
    }

    /// Block until venue time reaches `launch_at - pre_window`.
    ///
    /// Returns the number of clock checks made. Returns after one check when
    /// the window has already opened.
    pub async fn await_launch_window(
        &self,
        schedule: &LaunchSchedule,
        offset: TimeOffset,
        cancel: &CancellationToken,
    ) -> EngineResult<u32> {
        let wait_until = schedule.wait_until_ms();
        let mut checks = 0;

        loop {
            checks += 1;
            let now = self.venue_now(offset, cancel).await?;
            let remaining_ms = wait_until.saturating_sub(now);

            if remaining_ms <= 0 {
                info!(
                    launch_at = %schedule.launch_at,
                    checks,
                    "Launch window open"
                );
                return Ok(checks);
            }

            info!(remaining_ms, "Waiting for launch window");

            let remaining = Duration::from_millis(remaining_ms.unsigned_abs());
            let pause = schedule.check_interval.min(remaining);
            if !sleep_or_cancel(pause, cancel).await {
                info!(remaining_ms, "Countdown cancelled");
                return Err(EngineError::Cancelled);
            }
        }
    }
}
