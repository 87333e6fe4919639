//! Fixed-precision money
//!
//! Amounts are integer minor units (cents, pence) tagged with a
//! currency. No arithmetic path touches binary floating point; display
//! conversion goes through `rust_decimal` for exact scaling.

use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// ISO 4217 currency code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Currency {
    /// US Dollar
    USD,
    /// Euro
    EUR,
    /// British Pound
    GBP,
    /// Japanese Yen (no minor unit)
    JPY,
    /// Indian Rupee
    INR,
}

impl Currency {
    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
            Currency::INR => "INR",
        }
    }

    /// Parse from ISO 4217 code
    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "JPY" => Some(Currency::JPY),
            "INR" => Some(Currency::INR),
            _ => None,
        }
    }

    /// Number of minor-unit digits (2 for cents, 0 for yen)
    pub fn minor_unit_exponent(&self) -> u32 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Monetary amount in integer minor units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    minor_units: i64,
    currency: Currency,
}

impl Money {
    /// Create from minor units
    pub fn new(minor_units: i64, currency: Currency) -> Self {
        Self {
            minor_units,
            currency,
        }
    }

    /// Zero amount in the given currency
    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Amount in minor units
    pub fn minor_units(&self) -> i64 {
        self.minor_units
    }

    /// Currency tag
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Checked addition; fails on currency mismatch or i64 overflow
    pub fn checked_add(&self, other: Money) -> Result<Money> {
        self.require_same_currency(other)?;
        let minor_units = self
            .minor_units
            .checked_add(other.minor_units)
            .ok_or(Error::AmountOverflow)?;
        Ok(Money::new(minor_units, self.currency))
    }

    /// Checked subtraction; fails on currency mismatch or i64 overflow
    pub fn checked_sub(&self, other: Money) -> Result<Money> {
        self.require_same_currency(other)?;
        let minor_units = self
            .minor_units
            .checked_sub(other.minor_units)
            .ok_or(Error::AmountOverflow)?;
        Ok(Money::new(minor_units, self.currency))
    }

    /// Absolute value
    pub fn abs(&self) -> Money {
        Money::new(self.minor_units.abs(), self.currency)
    }

    /// Negated amount
    pub fn negate(&self) -> Money {
        Money::new(-self.minor_units, self.currency)
    }

    /// Smaller of two same-currency amounts
    pub fn min(&self, other: Money) -> Result<Money> {
        self.require_same_currency(other)?;
        Ok(Money::new(
            self.minor_units.min(other.minor_units),
            self.currency,
        ))
    }

    /// True when the amount is strictly negative
    pub fn is_negative(&self) -> bool {
        self.minor_units < 0
    }

    /// True when the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.minor_units > 0
    }

    /// True when the amount is zero
    pub fn is_zero(&self) -> bool {
        self.minor_units == 0
    }

    /// Sign of the amount (-1, 0, 1)
    pub fn signum(&self) -> i64 {
        self.minor_units.signum()
    }

    /// Exact decimal representation for display (e.g. 1050 USD minor
    /// units → 10.50)
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.minor_units, self.currency.minor_unit_exponent())
    }

    fn require_same_currency(&self, other: Money) -> Result<()> {
        if self.currency != other.currency {
            return Err(Error::CurrencyMismatch {
                expected: self.currency.code(),
                actual: other.currency.code(),
            });
        }
        Ok(())
    }
}

impl PartialOrd for Money {
    /// Ordering is only defined within a currency
    fn partial_cmp(&self, other: &Money) -> Option<Ordering> {
        if self.currency != other.currency {
            return None;
        }
        Some(self.minor_units.cmp(&other.minor_units))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.to_decimal(), self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_add() {
        let a = Money::new(1050, Currency::USD);
        let b = Money::new(950, Currency::USD);
        assert_eq!(a.checked_add(b).unwrap(), Money::new(2000, Currency::USD));
    }

    #[test]
    fn test_currency_mismatch_rejected() {
        let a = Money::new(100, Currency::USD);
        let b = Money::new(100, Currency::EUR);
        let err = a.checked_add(b).unwrap_err();
        assert_eq!(err.kind(), "currency_mismatch");
    }

    #[test]
    fn test_overflow_rejected() {
        let a = Money::new(i64::MAX, Currency::USD);
        let b = Money::new(1, Currency::USD);
        assert!(matches!(a.checked_add(b), Err(Error::AmountOverflow)));
    }

    #[test]
    fn test_display_scaling() {
        assert_eq!(Money::new(1050, Currency::USD).to_string(), "10.50 USD");
        assert_eq!(Money::new(1050, Currency::JPY).to_string(), "1050 JPY");
        assert_eq!(Money::new(-5, Currency::EUR).to_string(), "-0.05 EUR");
    }

    #[test]
    fn test_ordering_within_currency_only() {
        let a = Money::new(100, Currency::USD);
        let b = Money::new(200, Currency::USD);
        let c = Money::new(200, Currency::EUR);
        assert!(a < b);
        assert_eq!(a.partial_cmp(&c), None);
    }

    #[test]
    fn test_currency_from_code() {
        assert_eq!(Currency::from_code("USD"), Some(Currency::USD));
        assert_eq!(Currency::from_code("XXX"), None);
    }
}
