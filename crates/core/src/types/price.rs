//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are never negative and always carry the store currency. The
//! payment gateway wants amounts in the currency's minor unit (paise for
//! INR), so [`Price::minor_units`] does that conversion in one place.

use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::quantity::Quantity;

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
    /// The amount is above [`Price::MAX_MAJOR_UNITS`] or a computation on
    /// it left the representable range.
    #[error("price {0} is out of range")]
    OutOfRange(Decimal),
}

/// A non-negative price with currency information.
///
/// Deserialization goes through [`Price::new`], so every value is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPrice")]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., rupees, not paise).
    amount: Decimal,
    /// ISO 4217 currency code.
    currency_code: CurrencyCode,
}

#[derive(Deserialize)]
struct RawPrice {
    amount: Decimal,
    currency_code: CurrencyCode,
}

impl TryFrom<RawPrice> for Price {
    type Error = PriceError;

    fn try_from(raw: RawPrice) -> Result<Self, Self::Error> {
        Self::new(raw.amount, raw.currency_code)
    }
}

impl Price {
    /// Largest unit price accepted, in major units.
    pub const MAX_MAJOR_UNITS: i64 = 1_000_000_000;

    /// Create a new price.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `amount` is below zero, or
    /// [`PriceError::OutOfRange`] if it exceeds [`Self::MAX_MAJOR_UNITS`].
    pub fn new(amount: Decimal, currency_code: CurrencyCode) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        if amount > Decimal::from(Self::MAX_MAJOR_UNITS) {
            return Err(PriceError::OutOfRange(amount));
        }
        Ok(Self {
            amount: amount.normalize(),
            currency_code,
        })
    }

    /// A zero price in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency_code,
        }
    }

    /// The amount in the currency's standard unit.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// The currency of this price.
    #[must_use]
    pub const fn currency_code(&self) -> CurrencyCode {
        self.currency_code
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Price of `quantity` units at this unit price.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::OutOfRange`] if the product overflows.
    pub fn times(&self, quantity: Quantity) -> Result<Self, PriceError> {
        let amount = self
            .amount
            .checked_mul(Decimal::from(quantity.get()))
            .ok_or(PriceError::OutOfRange(self.amount))?;
        Ok(Self {
            amount,
            currency_code: self.currency_code,
        })
    }

    /// Sum of two prices. The store sells in a single currency, so the
    /// left operand's currency is kept.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::OutOfRange`] if the sum overflows.
    pub fn checked_add(self, rhs: Self) -> Result<Self, PriceError> {
        let amount = self
            .amount
            .checked_add(rhs.amount)
            .ok_or(PriceError::OutOfRange(self.amount))?;
        Ok(Self {
            amount,
            currency_code: self.currency_code,
        })
    }

    /// Amount in the currency's minor unit, rounded half-up.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::OutOfRange`] if the value does not fit in `i64`.
    pub fn minor_units(&self) -> Result<i64, PriceError> {
        self.amount
            .checked_mul(Decimal::from(self.currency_code.minor_per_major()))
            .map(|scaled| {
                scaled.round_dp_with_strategy(
                    0,
                    rust_decimal::RoundingStrategy::MidpointAwayFromZero,
                )
            })
            .and_then(|scaled| scaled.to_i64())
            .ok_or(PriceError::OutOfRange(self.amount))
    }

    /// Format for display (e.g., "₹1000.00").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency_code.symbol(), self.amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Three-letter code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }

    /// Number of minor units in one major unit.
    #[must_use]
    pub const fn minor_per_major(&self) -> u32 {
        100
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INR" => Ok(Self::INR),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn inr(amount: i64) -> Price {
        Price::new(Decimal::from(amount), CurrencyCode::INR).unwrap()
    }

    #[test]
    fn test_rejects_negative() {
        assert!(matches!(
            Price::new(Decimal::from(-1), CurrencyCode::INR),
            Err(PriceError::Negative(_))
        ));
    }

    #[test]
    fn test_zero_is_allowed() {
        assert!(Price::new(Decimal::ZERO, CurrencyCode::INR).unwrap().is_zero());
    }

    #[test]
    fn test_rejects_absurd_amount() {
        let over = Decimal::from(Price::MAX_MAJOR_UNITS) + Decimal::ONE;
        assert!(matches!(
            Price::new(over, CurrencyCode::INR),
            Err(PriceError::OutOfRange(_))
        ));
        assert!(matches!(
            Price::new(Decimal::MAX, CurrencyCode::INR),
            Err(PriceError::OutOfRange(_))
        ));
        assert!(Price::new(Decimal::from(Price::MAX_MAJOR_UNITS), CurrencyCode::INR).is_ok());
    }

    #[test]
    fn test_deserialize_goes_through_new() {
        let parsed: Result<Price, _> =
            serde_json::from_str(r#"{"amount":"-5","currency_code":"INR"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_times_quantity() {
        let line = inr(500).times(Quantity::new(2).unwrap()).unwrap();
        assert_eq!(line.amount(), Decimal::from(1000));
    }

    #[test]
    fn test_checked_add() {
        let total = inr(500).checked_add(inr(250)).unwrap();
        assert_eq!(total.amount(), Decimal::from(750));
    }

    #[test]
    fn test_largest_line_does_not_fit_minor_units() {
        let line = inr(Price::MAX_MAJOR_UNITS)
            .times(Quantity::new(u32::MAX).unwrap())
            .unwrap();
        assert!(matches!(line.minor_units(), Err(PriceError::OutOfRange(_))));
    }

    #[test]
    fn test_minor_units_rounds() {
        let price = Price::new(Decimal::new(19_995, 3), CurrencyCode::INR).unwrap();
        assert_eq!(price.minor_units().unwrap(), 2000);
        assert_eq!(inr(1000).minor_units().unwrap(), 100_000);
    }

    #[test]
    fn test_display() {
        assert_eq!(inr(1000).display(), "₹1000.00");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("inr".parse::<CurrencyCode>().unwrap(), CurrencyCode::INR);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
