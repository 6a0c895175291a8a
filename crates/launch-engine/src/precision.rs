//! Price and quantity quantization against venue precision.

use launch_core::{step_decimals, InstrumentMetadata, OrderIntent, Price, Size};
use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};

/// Decimals carried by intermediate target-price arithmetic.
const TARGET_PRICE_DP: u32 = 8;

/// Decimal places allowed by an instrument's tick and lot steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precision {
    pub price_decimals: u32,
    pub qty_decimals: u32,
}

/// `0.0001` tick -> 4 price decimals, `1` lot -> 0 quantity decimals.
pub fn resolve_precision(metadata: &InstrumentMetadata) -> Precision {
    Precision {
        price_decimals: step_decimals(metadata.tick_size.inner()),
        qty_decimals: step_decimals(metadata.lot_size.inner()),
    }
}

/// Check that `offset_percent` is usable: `0 <= pct < 100`.
pub fn validate_offset_percent(offset_percent: Decimal) -> EngineResult<()> {
    if offset_percent.is_sign_negative() || offset_percent >= Decimal::ONE_HUNDRED {
        return Err(EngineError::InvalidParameter(format!(
            "offset_percent must be in [0, 100), got {offset_percent}"
        )));
    }
    Ok(())
}

/// Price `offset_percent` below `market`, truncated to 8 decimals.
///
/// Tick quantization happens later in [`build_sell_intent`].
pub fn compute_target_price(market: Price, offset_percent: Decimal) -> EngineResult<Price> {
    validate_offset_percent(offset_percent)?;
    if !market.is_positive() {
        return Err(EngineError::InvalidParameter(format!(
            "market price must be positive, got {market}"
        )));
    }

    let overflow = || {
        EngineError::InvalidParameter(format!(
            "target price for market {market} at {offset_percent}% overflows"
        ))
    };
    let offset = market
        .inner()
        .checked_mul(offset_percent)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .map(|v| Price::new(v).truncate_dp(TARGET_PRICE_DP))
        .ok_or_else(overflow)?;
    let target = market
        .inner()
        .checked_sub(offset.inner())
        .ok_or_else(overflow)?;
    Ok(Price::new(target).truncate_dp(TARGET_PRICE_DP))
}

/// Quantize a sell and check it against the instrument's limits.
///
/// Both values truncate toward zero. A result that is not strictly positive,
/// or a quantity below the venue minimum, aborts before submission.
pub fn build_sell_intent(
    metadata: &InstrumentMetadata,
    quantity: Size,
    target_price: Price,
) -> EngineResult<OrderIntent> {
    if !metadata.tick_size.is_positive() || !metadata.lot_size.is_positive() {
        return Err(EngineError::InvalidParameter(format!(
            "{}: tick size {} and lot size {} must be positive",
            metadata.symbol, metadata.tick_size, metadata.lot_size
        )));
    }

    let price = target_price.truncate_to_tick(metadata.tick_size);
    let qty = quantity.truncate_to_lot(metadata.lot_size);

    let intent = OrderIntent::limit_sell(metadata.symbol.clone(), qty, price)?;

    if let Some(minimum) = metadata.min_size {
        if qty < minimum {
            return Err(EngineError::BelowMinimumSize {
                quantity: qty,
                minimum,
            });
        }
    }

    Ok(intent)
}
