//! Engine error types.

use launch_core::{CoreError, Size, Symbol};
use launch_exchange::ExchangeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Run cancelled")]
    Cancelled,

    #[error("Clock synchronization failed after {attempts} attempts: {reason}")]
    ClockSync { attempts: u32, reason: String },

    #[error("Invalid launch parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(#[from] CoreError),

    #[error("Instrument metadata missing for {0}")]
    MissingMetadata(Symbol),

    #[error("Quantity {quantity} is below the venue minimum {minimum}")]
    BelowMinimumSize { quantity: Size, minimum: Size },

    #[error("Order submission failed, order state unknown: {0}")]
    SubmissionFailed(ExchangeError),

    #[error("All {attempts} submission attempts rejected (last: {code} {message})")]
    AllSubmissionsRejected {
        attempts: u32,
        code: String,
        message: String,
    },
}

impl EngineError {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
