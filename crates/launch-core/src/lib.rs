//! Core domain types for the launch sell bot.
//!
//! This crate provides fundamental types used throughout the system:
//! - `Price`, `Size`: Precision-safe numeric types with truncating quantization
//! - `Symbol`, `InstrumentMetadata`: Instrument identity and venue precision
//! - `OrderIntent`, `OrderState`, `OrderSnapshot`: Order lifecycle types
//! - `TimeOffset`, `LaunchSchedule`, `PriceQuote`: Timing and quote values

pub mod clock;
pub mod decimal;
pub mod error;
pub mod market;
pub mod order;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use decimal::{step_decimals, truncate_to_step, Price, Size};
pub use error::{CoreError, Result};
pub use market::{InstrumentKind, InstrumentMetadata, Symbol};
pub use order::{
    ClientOrderId, OrderId, OrderIntent, OrderSide, OrderSnapshot, OrderState, OrderType,
    SubmitAck,
};
pub use types::{LaunchSchedule, PriceQuote, TimeOffset};
