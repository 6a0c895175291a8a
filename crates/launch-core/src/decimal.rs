//! Precision-safe decimal types for trading.
//!
//! Uses `rust_decimal` for exact decimal arithmetic, avoiding
//! floating-point rounding errors critical in financial calculations.
//!
//! All quantization here truncates toward zero. Venue precision is expressed
//! as a step (tick size or lot size); a value is never moved past the nearest
//! valid step below it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of digits right of the decimal point in a step value.
///
/// `0.0001` -> 4, `0.10` -> 1, `1` -> 0.
#[inline]
pub fn step_decimals(step: Decimal) -> u32 {
    step.normalize().scale()
}

/// Truncate `value` toward zero onto a multiple of `step`.
///
/// The result carries exactly `step_decimals(step)` decimal places so it
/// renders the way the venue expects (`0.4950` for a `0.0001` tick).
/// A zero or negative step leaves the value untouched.
pub fn truncate_to_step(value: Decimal, step: Decimal) -> Decimal {
    if step.is_zero() || step.is_sign_negative() {
        return value;
    }
    let Some(steps) = value.checked_div(step) else {
        return value;
    };
    let mut out = steps.trunc() * step;
    out.rescale(step_decimals(step));
    out
}

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with sizes in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Truncate to tick size (never rounds up).
    #[inline]
    pub fn truncate_to_tick(&self, tick_size: Price) -> Self {
        Self(truncate_to_step(self.0, tick_size.0))
    }

    /// Truncate to a fixed number of decimal places.
    #[inline]
    pub fn truncate_dp(&self, dp: u32) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(dp, rust_decimal::RoundingStrategy::ToZero),
        )
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// Size/quantity with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// sizes with prices in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Truncate to lot size (never rounds up).
    #[inline]
    pub fn truncate_to_lot(&self, lot_size: Size) -> Self {
        Self(truncate_to_step(self.0, lot_size.0))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Size {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

impl From<Decimal> for Size {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_step_decimals() {
        assert_eq!(step_decimals(dec!(0.0001)), 4);
        assert_eq!(step_decimals(dec!(0.10)), 1);
        assert_eq!(step_decimals(dec!(1)), 0);
        assert_eq!(step_decimals(dec!(10)), 0);
    }

    #[test]
    fn test_price_truncate_to_tick() {
        let price = Price::new(dec!(12.3456));
        let tick = Price::new(dec!(0.01));

        let truncated = price.truncate_to_tick(tick);
        assert_eq!(truncated.0, dec!(12.34));
    }

    #[test]
    fn test_price_truncate_never_rounds_up() {
        let price = Price::new(dec!(12.3499999));
        let tick = Price::new(dec!(0.01));

        assert_eq!(price.truncate_to_tick(tick).0, dec!(12.34));
    }

    #[test]
    fn test_size_truncate_to_lot() {
        let size = Size::new(dec!(5.37));
        let lot = Size::new(dec!(0.1));

        assert_eq!(size.truncate_to_lot(lot).0, dec!(5.3));
    }

    #[test]
    fn test_truncate_keeps_step_scale() {
        let out = truncate_to_step(dec!(0.495), dec!(0.0001));
        assert_eq!(out.to_string(), "0.4950");
    }

    #[test]
    fn test_truncate_non_decimal_step() {
        // Steps that are not powers of ten still land on a multiple.
        assert_eq!(truncate_to_step(dec!(7.9), dec!(0.5)), dec!(7.5));
    }

    #[test]
    fn test_truncate_zero_step_is_identity() {
        assert_eq!(truncate_to_step(dec!(1.2345), Decimal::ZERO), dec!(1.2345));
    }

    #[test]
    fn test_price_truncate_dp() {
        let price = Price::new(dec!(0.123456789));
        assert_eq!(price.truncate_dp(8).0, dec!(0.12345678));
    }

    #[test]
    fn test_serde_string_form_keeps_scale() {
        let json = serde_json::to_string(&Price::new(dec!(0.4950))).unwrap();
        assert_eq!(json, "\"0.4950\"");

        let size: Size = serde_json::from_str("\"100\"").unwrap();
        assert_eq!(size, Size::new(dec!(100)));
        assert_eq!(
            serde_json::from_str::<Price>(&json).unwrap().to_string(),
            "0.4950"
        );
    }

    #[test]
    fn test_price_from_str_trims() {
        let price: Price = " 0.50 ".parse().unwrap();
        assert_eq!(price.0, dec!(0.50));
        assert!("abc".parse::<Price>().is_err());
    }
}
