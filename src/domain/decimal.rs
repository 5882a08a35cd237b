//! Lossless decimal numeric type backed by rust_decimal.
//!
//! Provides parsing of exchange-reported numeric strings and fixed-precision
//! rendering for the persistence contract.

use rust_decimal::Decimal as RustDecimal;
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lossless decimal numeric type for financial calculations.
///
/// Backed by rust_decimal to avoid floating-point drift.
/// Serializes to JSON number (not string) by default.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

/// A numeric field from the exchange that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid decimal field {raw:?}: {reason}")]
pub struct FieldParseError {
    pub raw: String,
    pub reason: String,
}

impl Decimal {
    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Decimal)
    }

    /// Format the Decimal as a canonical string (no exponent notation).
    pub fn to_canonical_string(&self) -> String {
        let normalized = self.0.normalize();
        format!("{}", normalized)
    }

    /// Render with exactly `dp` fractional digits, rounding midpoints away from zero.
    pub fn to_fixed(&self, dp: u32) -> String {
        let mut rounded = self
            .0
            .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(dp);
        rounded.to_string()
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    /// Returns true if the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Division that yields `None` for a zero divisor or on overflow.
    pub fn checked_div(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_div(rhs.0).map(Decimal)
    }

    /// Addition that yields `None` on overflow.
    pub fn checked_add(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_add(rhs.0).map(Decimal)
    }

    pub fn checked_sub(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_sub(rhs.0).map(Decimal)
    }

    pub fn checked_mul(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_mul(rhs.0).map(Decimal)
    }
}

/// Parse one numeric field as reported by the exchange.
///
/// Accepts plain decimals (`"2010.5"`) and scientific notation (`"1e-3"`).
pub fn parse_decimal_field(raw: &str) -> Result<Decimal, FieldParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldParseError {
            raw: raw.to_string(),
            reason: "empty".to_string(),
        });
    }

    match RustDecimal::from_str(trimmed) {
        Ok(value) => Ok(Decimal(value)),
        Err(plain_err) => {
            if trimmed.contains(|c| c == 'e' || c == 'E') {
                RustDecimal::from_scientific(trimmed)
                    .map(Decimal)
                    .map_err(|e| FieldParseError {
                        raw: raw.to_string(),
                        reason: e.to_string(),
                    })
            } else {
                Err(FieldParseError {
                    raw: raw.to_string(),
                    reason: plain_err.to_string(),
                })
            }
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_parse_plain_decimal() {
        assert_eq!(parse_decimal_field("2010.5").unwrap(), d("2010.5"));
        assert_eq!(parse_decimal_field("-25.0").unwrap(), d("-25"));
        assert_eq!(parse_decimal_field(" 0.10 ").unwrap(), d("0.1"));
    }

    #[test]
    fn test_parse_scientific_notation() {
        assert_eq!(parse_decimal_field("1e-3").unwrap(), d("0.001"));
        assert_eq!(parse_decimal_field("2.5E2").unwrap(), d("250"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_decimal_field("abc").unwrap_err();
        assert_eq!(err.raw, "abc");
        assert!(parse_decimal_field("").is_err());
        assert!(parse_decimal_field("   ").is_err());
        assert!(parse_decimal_field("1.2.3").is_err());
    }

    #[test]
    fn test_to_fixed_pads_and_rounds() {
        assert_eq!(d("24.8").to_fixed(2), "24.80");
        assert_eq!(d("1").to_fixed(3), "1.000");
        assert_eq!(d("0.125").to_fixed(2), "0.13");
        assert_eq!(d("-0.125").to_fixed(2), "-0.13");
        assert_eq!(d("12.34567").to_fixed(3), "12.346");
        assert_eq!(Decimal::zero().to_fixed(2), "0.00");
    }

    #[test]
    fn test_checked_div_by_zero() {
        assert_eq!(d("10").checked_div(Decimal::zero()), None);
        assert_eq!(d("10").checked_div(d("4")), Some(d("2.5")));
    }

    #[test]
    fn test_checked_arithmetic() {
        let a = d("10.5");
        let b = d("2.5");

        assert_eq!(a.checked_add(b), Some(d("13")));
        assert_eq!(a.checked_sub(b), Some(d("8")));
        assert_eq!(a.checked_mul(b), Some(d("26.25")));
    }

    #[test]
    fn test_checked_arithmetic_overflow() {
        let max = d("79228162514264337593543950335");
        assert_eq!(max.checked_mul(d("2")), None);
        assert_eq!(max.checked_add(d("1")), None);
        assert_eq!(d("-79228162514264337593543950335").checked_sub(d("1")), None);
        assert!(max.to_fixed(2).starts_with("79228162514264337593543950335"));
    }

    #[test]
    fn test_decimal_json_serialization() {
        let decimal = d("123.456");
        let json = serde_json::to_value(decimal).unwrap();
        assert!(json.is_number());
        assert_eq!(json.to_string(), "123.456");
    }
}
