//! Venue access for the launch sell bot.
//!
//! - `ExchangeClient`: async capability trait consumed by the engine
//! - `OkxClient`: OKX v5 REST implementation with HMAC request signing
//! - `MockExchange`: scripted implementation for tests

pub mod client;
pub mod error;
pub mod mock;
pub mod okx;
pub mod signer;

pub use client::{BoxFuture, DynExchangeClient, ExchangeClient, PlaceOrderRequest};
pub use error::{ExchangeError, ExchangeResult};
pub use mock::{CallCounts, MockExchange};
pub use okx::{OkxClient, OkxConfig, DEFAULT_BASE_URL};
pub use signer::{Credentials, RequestSigner};
