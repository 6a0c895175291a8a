//! Exchange capability consumed by the launch engine.
//!
//! Provides a trait-based abstraction over the venue REST API. This allows for:
//! - Dependency injection for testing (`MockExchange`)
//! - Separation of request signing from the coordination logic
//!
//! Authenticated calls take the synchronized `TimeOffset` explicitly; the
//! client never holds a mutable clock correction of its own.

use std::pin::Pin;
use std::sync::Arc;

use launch_core::{
    ClientOrderId, InstrumentKind, InstrumentMetadata, OrderId, OrderIntent, OrderSnapshot,
    PriceQuote, SubmitAck, Symbol, TimeOffset,
};

use crate::error::ExchangeResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// A single order submission: the intent plus a fresh client order id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrderRequest {
    pub intent: OrderIntent,
    pub client_order_id: ClientOrderId,
}

impl PlaceOrderRequest {
    pub fn new(intent: OrderIntent) -> Self {
        Self {
            intent,
            client_order_id: ClientOrderId::new(),
        }
    }
}

/// Venue operations needed to run one launch sell.
pub trait ExchangeClient: Send + Sync {
    /// Venue clock, milliseconds since Unix epoch.
    fn server_time(&self) -> BoxFuture<'_, ExchangeResult<i64>>;

    /// All instruments of `kind` currently known to the venue.
    fn list_instruments(
        &self,
        kind: InstrumentKind,
    ) -> BoxFuture<'_, ExchangeResult<Vec<InstrumentMetadata>>>;

    /// Latest ticker for `symbol`.
    fn ticker<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, ExchangeResult<PriceQuote>>;

    /// Submit a limit order. Never retried by callers' retry policies.
    fn place_limit_order<'a>(
        &'a self,
        offset: TimeOffset,
        request: &'a PlaceOrderRequest,
    ) -> BoxFuture<'a, ExchangeResult<SubmitAck>>;

    /// Current state of an order.
    fn order_status<'a>(
        &'a self,
        offset: TimeOffset,
        symbol: &'a Symbol,
        order_id: &'a OrderId,
    ) -> BoxFuture<'a, ExchangeResult<OrderSnapshot>>;

    /// Request cancellation. `Ok(false)` means the venue refused the cancel
    /// (typically because the order already filled or closed).
    fn cancel_order<'a>(
        &'a self,
        offset: TimeOffset,
        symbol: &'a Symbol,
        order_id: &'a OrderId,
    ) -> BoxFuture<'a, ExchangeResult<bool>>;
}

/// Arc wrapper for ExchangeClient trait objects.
pub type DynExchangeClient = Arc<dyn ExchangeClient>;
