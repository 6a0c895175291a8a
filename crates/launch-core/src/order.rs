//! Order-related types and identifiers.
//!
//! Provides order side, type, identifiers, the validated `OrderIntent`,
//! and the lifecycle `OrderState` reported by the order supervisor.

use crate::error::{CoreError, Result};
use crate::market::Symbol;
use crate::{Price, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    #[default]
    Limit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Limit => "limit",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client order ID attached to every submission.
///
/// A fresh id per submission attempt lets the operator match venue records
/// to log lines, and keeps a manual resubmission from colliding with an
/// earlier attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    /// Create a new unique client order ID.
    ///
    /// Format: `ls{timestamp_ms}{uuid_short}` (alphanumeric, at most 32 chars).
    pub fn new() -> Self {
        let ts = chrono::Utc::now().timestamp_millis();
        let uuid = Uuid::new_v4().simple().to_string();
        Self(format!("ls{ts}{}", &uuid[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Venue-assigned order id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A limit sell ready for submission.
///
/// Quantity and price are already quantized to the instrument's steps.
/// Construction fails if either is not strictly positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Size,
    pub price: Price,
}

impl OrderIntent {
    /// Build a limit sell intent.
    pub fn limit_sell(symbol: Symbol, quantity: Size, price: Price) -> Result<Self> {
        if !quantity.is_positive() {
            return Err(CoreError::InvalidSize(format!(
                "quantity must be positive after quantization, got {quantity}"
            )));
        }
        if !price.is_positive() {
            return Err(CoreError::InvalidPrice(format!(
                "price must be positive after quantization, got {price}"
            )));
        }
        Ok(Self {
            symbol,
            side: OrderSide::Sell,
            order_type: OrderType::Limit,
            quantity,
            price,
        })
    }
}

/// Result of a single submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitAck {
    /// Venue accepted the order and assigned an id.
    Accepted(OrderId),
    /// Venue explicitly rejected the order; no order exists.
    Rejected { code: String, message: String },
}

/// State of an order in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderState {
    /// Acknowledged by the venue and still open (possibly partially filled).
    Submitted,
    /// Completely filled.
    Filled,
    /// Cancelled (by us or by the venue).
    Canceled,
    /// Rejected by the venue.
    Rejected,
    /// Timeout elapsed; a cancel is in flight.
    TimedOut,
}

impl OrderState {
    /// Returns true if the order is in a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Canceled | Self::Rejected)
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Submitted => "submitted",
            Self::Filled => "filled",
            Self::Canceled => "canceled",
            Self::Rejected => "rejected",
            Self::TimedOut => "timed_out",
        };
        f.write_str(s)
    }
}

/// One order-status read from the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub state: OrderState,
    /// Accumulated filled quantity.
    pub filled_size: Size,
    /// Average fill price, if anything filled.
    pub avg_fill_price: Option<Price>,
}

impl OrderSnapshot {
    pub fn new(state: OrderState) -> Self {
        Self {
            state,
            filled_size: Size::ZERO,
            avg_fill_price: None,
        }
    }
}
