//! Launch-timed limit sell bot.
//!
//! Waits for a new spot listing on OKX, sells a fixed quantity at a price
//! offset below the first live price, and supervises the order until it
//! fills or is cancelled.

pub mod app;
pub mod config;
pub mod error;

pub use app::{summarize, Application};
pub use config::{AppConfig, RetryConfig};
pub use error::{AppError, AppResult};
