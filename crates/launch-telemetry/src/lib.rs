//! Structured logging and run summaries for the launch sell bot.
//!
//! - `init_logging`: tracing subscriber with env filter, JSON in production
//! - `RunSummary`: one structured record describing how a run ended

pub mod error;
pub mod logging;
pub mod summary;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, DEFAULT_FILTER};
pub use summary::RunSummary;
