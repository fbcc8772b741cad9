//! Product price value object.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when building a [`Price`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PriceError {
    /// The amount was negative.
    #[error("Price must not be negative: {0}")]
    Negative(f64),

    /// The amount was NaN or infinite.
    #[error("Price must be a finite number: {0}")]
    NotFinite(f64),

    /// The amount in cents exceeds what storage can hold.
    #[error("Price out of range: {0}")]
    OutOfRange(f64),
}

/// Largest price in cents, matching the `BIGINT` column it is stored in.
pub const MAX_PRICE_CENTS: u64 = i64::MAX as u64;

/// A non-negative price kept in cents to avoid floating point drift.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    /// Creates a price from cents.
    pub fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a price from a decimal amount, rounding to the nearest cent.
    pub fn from_decimal(amount: f64) -> Result<Self, PriceError> {
        if !amount.is_finite() {
            return Err(PriceError::NotFinite(amount));
        }
        if amount < 0.0 {
            return Err(PriceError::Negative(amount));
        }
        let cents = (amount * 100.0).round();
        // i64::MAX is not representable as f64; its nearest value is 2^63.
        if cents >= MAX_PRICE_CENTS as f64 {
            return Err(PriceError::OutOfRange(amount));
        }
        Ok(Self(cents as u64))
    }

    /// Returns zero.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount as a decimal, for transport formats that expect one.
    pub fn as_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_decimal_rounds_to_cents() {
        assert_eq!(Price::from_decimal(12.346).unwrap().cents(), 1235);
        assert_eq!(Price::from_decimal(0.1 + 0.2).unwrap().cents(), 30);
        assert_eq!(Price::from_decimal(0.0).unwrap(), Price::zero());
    }

    #[test]
    fn from_decimal_rejects_negative_and_nan() {
        assert_eq!(
            Price::from_decimal(-1.0),
            Err(PriceError::Negative(-1.0))
        );
        assert!(matches!(
            Price::from_decimal(f64::NAN),
            Err(PriceError::NotFinite(_))
        ));
        assert!(matches!(
            Price::from_decimal(f64::INFINITY),
            Err(PriceError::NotFinite(_))
        ));
    }

    #[test]
    fn from_decimal_rejects_amounts_beyond_storage() {
        assert_eq!(Price::from_decimal(1e300), Err(PriceError::OutOfRange(1e300)));
        assert_eq!(Price::from_decimal(1e17), Err(PriceError::OutOfRange(1e17)));

        let large = Price::from_decimal(1e16).unwrap();
        assert_eq!(large.cents(), 1_000_000_000_000_000_000);
        assert!(large.cents() <= MAX_PRICE_CENTS);
    }

    #[test]
    fn display_formats_two_decimals() {
        assert_eq!(Price::from_cents(1234).to_string(), "12.34");
        assert_eq!(Price::from_cents(5).to_string(), "0.05");
        assert_eq!(Price::from_cents(100).as_decimal(), 1.0);
    }
}
