//! Type-safe price representation using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A price with currency information.
///
/// Amounts are stored in the currency's standard unit (e.g., dollars, not
/// cents), using [`Decimal`] to avoid floating-point rounding in money math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a price from an amount in the smallest currency unit (cents).
    #[must_use]
    pub fn from_cents(cents: i64, currency_code: CurrencyCode) -> Self {
        Self {
            amount: Decimal::new(cents, 2),
            currency_code,
        }
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// The ISO 4217 code as a string, e.g. for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }
}

/// Error returned when parsing an unsupported currency code.
#[derive(Debug, Clone, Error)]
#[error("unknown currency code: {0}")]
pub struct UnknownCurrency(pub String);

impl std::str::FromStr for CurrencyCode {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            other => Err(UnknownCurrency(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_cents_scales_to_standard_unit() {
        let price = Price::from_cents(1999, CurrencyCode::USD);
        assert_eq!(price.amount.to_string(), "19.99");
    }

    #[test]
    fn currency_code_round_trips_through_str() {
        let code: CurrencyCode = "EUR".parse().expect("valid code");
        assert_eq!(code, CurrencyCode::EUR);
        assert_eq!(code.as_str(), "EUR");
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
