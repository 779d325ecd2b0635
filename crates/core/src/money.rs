//! Money value object: exact decimal currency amounts.
//!
//! Two amounts with the same value are the same money; there is no identity.
//! Arithmetic stays exact (`rust_decimal`, never floats); call
//! [`Money::rounded`] to snap a computed sum to currency precision.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// An exact decimal amount of money.
///
/// Serializes as a decimal string (`"25.50"`), which is what the HTTP
/// boundary expects for prices and totals.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Multiply by a line quantity. Exact: no rounding happens here.
    pub fn times(&self, quantity: i64) -> Money {
        Money(self.0 * Decimal::from(quantity))
    }

    /// Round to two decimal places, half-up (currency convention).
    ///
    /// The result always carries exactly two fractional digits, so `20`
    /// renders as `"20.00"`.
    pub fn rounded(&self) -> Money {
        let mut amount = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        amount.rescale(2);
        Money(amount)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_up_to_currency_precision() {
        assert_eq!(Money::new(dec!(19.995)).rounded().to_string(), "20.00");
        assert_eq!(Money::new(dec!(19.994)).rounded().to_string(), "19.99");
        assert_eq!(Money::new(dec!(2.675)).rounded().to_string(), "2.68");
    }

    #[test]
    fn rounded_always_shows_two_decimals() {
        assert_eq!(Money::new(dec!(20)).rounded().to_string(), "20.00");
        assert_eq!(Money::new(dec!(5.5)).rounded().to_string(), "5.50");
    }

    #[test]
    fn times_and_sum_stay_exact() {
        let total: Money = [Money::new(dec!(10.00)).times(2), Money::new(dec!(5.50)).times(1)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::new(dec!(25.50)));
    }

    #[test]
    fn serializes_as_decimal_string() {
        let json = serde_json::to_value(Money::new(dec!(25.50))).unwrap();
        assert_eq!(json, serde_json::json!("25.50"));
    }

    #[test]
    fn deserializes_from_number_or_string() {
        let from_number: Money = serde_json::from_str("10.5").unwrap();
        let from_string: Money = serde_json::from_str("\"10.5\"").unwrap();
        assert_eq!(from_number, from_string);
    }
}
