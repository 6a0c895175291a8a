//! End-of-run summary.
//!
//! One flat record per run, logged as a single structured event so it can
//! be grepped out of JSON logs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::error::TelemetryResult;

/// Final state of a launch sell run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub symbol: String,
    /// `filled`, `canceled`, `rejected`, `unresolved (...)`.
    pub outcome: String,
    pub success: bool,
    pub order_id: String,
    pub client_order_id: String,
    pub market_price: String,
    pub target_price: String,
    pub order_price: String,
    pub quantity: String,
    pub filled_size: Option<String>,
    pub avg_fill_price: Option<String>,
    pub clock_offset_ms: i64,
    pub listing_polls: u32,
    pub price_polls: u32,
    pub status_polls: u32,
    pub submit_attempts: u32,
    pub timed_out: bool,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn to_json(&self) -> TelemetryResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Log the summary; unsuccessful runs log at error level.
    pub fn emit(&self) -> TelemetryResult<()> {
        let json = self.to_json()?;
        if self.success {
            info!(
                symbol = %self.symbol,
                outcome = %self.outcome,
                order_id = %self.order_id,
                summary = %json,
                "Launch sell finished"
            );
        } else {
            error!(
                symbol = %self.symbol,
                outcome = %self.outcome,
                order_id = %self.order_id,
                summary = %json,
                "Launch sell did not complete cleanly"
            );
        }
        Ok(())
    }
}
