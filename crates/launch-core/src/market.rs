//! Instrument identification and specification types.
//!
//! Spot instruments are identified by a `BASE-QUOTE` symbol (e.g. `XYZ-USDT`).
//! Operators often write pairs as `XYZ/USDT`; `Symbol::parse` accepts both.

use crate::error::{CoreError, Result};
use crate::{Price, Size};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Instrument symbol in venue format (`BASE-QUOTE`, upper case).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Parse an operator-supplied pair.
    ///
    /// Trims whitespace, upper-cases, and converts `/` or `_` separators to `-`.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                '/' | '_' => '-',
                other => other.to_ascii_uppercase(),
            })
            .collect();

        let mut parts = normalized.split('-');
        let valid = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(base), Some(quote), None)
                if !base.is_empty()
                    && !quote.is_empty()
                    && base.chars().chain(quote.chars()).all(|c| c.is_ascii_alphanumeric())
        );
        if !valid {
            return Err(CoreError::InvalidSymbol(raw.to_string()));
        }

        Ok(Self(normalized))
    }

    /// Wrap a symbol exactly as reported by the venue.
    pub fn from_venue(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a venue-reported identifier.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Instrument category requested from the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InstrumentKind {
    #[default]
    Spot,
}

impl InstrumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spot => "SPOT",
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instrument specification from the venue.
///
/// Tick size and lot size determine the precision orders are quantized to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentMetadata {
    /// Venue symbol (e.g. "XYZ-USDT").
    pub symbol: Symbol,

    /// Minimum price increment.
    pub tick_size: Price,

    /// Minimum quantity increment.
    pub lot_size: Size,

    /// Minimum order quantity, when the venue publishes one.
    pub min_size: Option<Size>,

    /// Venue listing state (e.g. "live", "preopen").
    pub state: Option<String>,
}

impl InstrumentMetadata {
    /// Find the metadata for `symbol` in a venue instrument list.
    pub fn find<'a>(instruments: &'a [InstrumentMetadata], symbol: &Symbol) -> Option<&'a Self> {
        instruments
            .iter()
            .find(|inst| symbol.matches(inst.symbol.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn meta(symbol: &str) -> InstrumentMetadata {
        InstrumentMetadata {
            symbol: Symbol::from_venue(symbol),
            tick_size: Price::new(dec!(0.0001)),
            lot_size: Size::new(dec!(1)),
            min_size: None,
            state: Some("live".to_string()),
        }
    }

    #[test]
    fn test_symbol_parse_normalizes() {
        assert_eq!(Symbol::parse("alt/usdt").unwrap().as_str(), "ALT-USDT");
        assert_eq!(Symbol::parse(" XYZ-USDT ").unwrap().as_str(), "XYZ-USDT");
        assert_eq!(Symbol::parse("abc_usdc").unwrap().as_str(), "ABC-USDC");
    }

    #[test]
    fn test_symbol_parse_rejects_garbage() {
        assert!(Symbol::parse("").is_err());
        assert!(Symbol::parse("XYZUSDT").is_err());
        assert!(Symbol::parse("XYZ-").is_err());
        assert!(Symbol::parse("A-B-C").is_err());
        assert!(Symbol::parse("X$Y-USDT").is_err());
    }

    #[test]
    fn test_symbol_matches_case_insensitive() {
        let symbol = Symbol::parse("XYZ-USDT").unwrap();
        assert!(symbol.matches("xyz-usdt"));
        assert!(!symbol.matches("XYZ-USDC"));
    }

    #[test]
    fn test_find_metadata() {
        let list = vec![meta("BTC-USDT"), meta("xyz-usdt")];
        let symbol = Symbol::parse("XYZ/USDT").unwrap();

        let found = InstrumentMetadata::find(&list, &symbol).unwrap();
        assert_eq!(found.symbol.as_str(), "xyz-usdt");

        let missing = Symbol::parse("ABC-USDT").unwrap();
        assert!(InstrumentMetadata::find(&list, &missing).is_none());
    }

    #[test]
    fn test_instrument_kind_str() {
        assert_eq!(InstrumentKind::Spot.as_str(), "SPOT");
        assert_eq!(InstrumentKind::default().to_string(), "SPOT");
    }
}
