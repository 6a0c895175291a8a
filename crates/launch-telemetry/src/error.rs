//! Telemetry error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Logging initialization failed: {0}")]
    LoggingInit(String),

    #[error("Summary serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type TelemetryResult<T> = Result<T, TelemetryError>;
