//! Timing and quote value types.

use crate::market::Symbol;
use crate::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Signed clock correction: `venue_time - local_time` in milliseconds.
///
/// Positive means the venue clock is ahead of ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeOffset(i64);

impl TimeOffset {
    pub const ZERO: Self = Self(0);

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// Translate a local timestamp (ms) to venue time.
    pub fn apply(&self, local_ms: i64) -> i64 {
        local_ms.saturating_add(self.0)
    }
}

impl fmt::Display for TimeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}ms", self.0)
    }
}

/// When to start hunting for the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSchedule {
    /// Announced trading start.
    pub launch_at: DateTime<Utc>,
    /// How long before `launch_at` the countdown ends.
    pub pre_window: Duration,
    /// Pause between venue clock checks.
    pub check_interval: Duration,
}

impl LaunchSchedule {
    /// Venue time (ms) at which the countdown completes.
    pub fn wait_until_ms(&self) -> i64 {
        let pre_ms = i64::try_from(self.pre_window.as_millis()).unwrap_or(i64::MAX);
        self.launch_at.timestamp_millis().saturating_sub(pre_ms)
    }
}

/// Last-trade quote as reported by the venue.
///
/// `last` is kept raw: before trading opens venues report an empty string,
/// zero, or garbage, all of which mean "no price yet".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub symbol: Symbol,
    pub last: String,
    pub fetched_at: DateTime<Utc>,
}

impl PriceQuote {
    /// The last-trade price if it is a strictly positive decimal.
    pub fn live_price(&self) -> Option<Price> {
        self.last
            .parse::<Price>()
            .ok()
            .filter(|price| price.is_positive())
    }
}
