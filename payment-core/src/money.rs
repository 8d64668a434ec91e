//! Money and currency types

use crate::{Error, Result, MONEY_SCALE};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// ISO 4217 currency code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// South African Rand
    ZAR,
    /// US Dollar
    USD,
    /// Euro
    EUR,
    /// Pound Sterling
    GBP,
    /// UAE Dirham
    AED,
    /// Indian Rupee
    INR,
}

impl Currency {
    /// Parse an ISO 4217 alpha-3 code
    pub fn parse(code: &str) -> Result<Self> {
        match code {
            "ZAR" => Ok(Currency::ZAR),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "AED" => Ok(Currency::AED),
            "INR" => Ok(Currency::INR),
            other => Err(Error::UnknownCurrency(other.to_string())),
        }
    }

    /// Get as ISO 4217 alpha-3 string
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::ZAR => "ZAR",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::AED => "AED",
            Currency::INR => "INR",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Monetary amount, fixed-point with 4 fractional digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount (rescaled to [`MONEY_SCALE`] at construction)
    pub amount: Decimal,
    /// Currency
    pub currency: Currency,
}

impl Money {
    /// Create a new amount. Negative amounts are rejected.
    pub fn new(amount: Decimal, currency: Currency) -> Result<Self> {
        if amount.is_sign_negative() {
            return Err(Error::InvalidAmount(format!(
                "negative amount {} {}",
                amount, currency
            )));
        }

        let mut amount = amount;
        amount.rescale(MONEY_SCALE);

        Ok(Self { amount, currency })
    }

    /// Zero in the given currency
    pub fn zero(currency: Currency) -> Self {
        let mut amount = Decimal::ZERO;
        amount.rescale(MONEY_SCALE);
        Self { amount, currency }
    }

    /// True when the amount is exactly zero
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Smallest representable increment in this scale (one minor unit)
    pub fn minor_unit() -> Decimal {
        Decimal::new(1, MONEY_SCALE)
    }

    /// Checked addition; currencies must match
    pub fn checked_add(&self, other: &Money) -> Result<Money> {
        if self.currency != other.currency {
            return Err(Error::InvalidAmount(format!(
                "currency mismatch: {} vs {}",
                self.currency, other.currency
            )));
        }
        Money::new(self.amount + other.amount, self.currency)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_rescales_to_four_digits() {
        let m = Money::new(dec!(1000.00), Currency::ZAR).unwrap();
        assert_eq!(m.amount.scale(), 4);
        assert_eq!(m.amount, dec!(1000.0000));
    }

    #[test]
    fn test_negative_amount_rejected() {
        assert!(Money::new(dec!(-0.01), Currency::ZAR).is_err());
    }

    #[test]
    fn test_currency_mismatch_on_add() {
        let a = Money::new(dec!(1), Currency::ZAR).unwrap();
        let b = Money::new(dec!(1), Currency::USD).unwrap();
        assert!(a.checked_add(&b).is_err());
    }

    #[test]
    fn test_currency_round_trip() {
        for code in ["ZAR", "USD", "EUR", "GBP", "AED", "INR"] {
            assert_eq!(Currency::parse(code).unwrap().as_str(), code);
        }
        assert!(Currency::parse("XXX").is_err());
    }

    proptest! {
        #[test]
        fn prop_money_never_negative(units in 0i64..1_000_000_000) {
            let m = Money::new(Decimal::new(units, 2), Currency::ZAR).unwrap();
            prop_assert!(!m.amount.is_sign_negative());
            prop_assert_eq!(m.amount.scale(), 4);
        }
    }
}
