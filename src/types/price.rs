use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Price in integer minor currency units (cents).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    const MINOR_UNITS: i64 = 100;

    pub const fn from_cents(cents: i64) -> Self {
        Price(cents)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Whole currency units, e.g. `Price::from_major(120)` is 120.00.
    pub fn from_major(units: i64) -> Self {
        Price(units * Self::MINOR_UNITS)
    }

    /// Converts a decimal amount in major units, rounding half-up to the cent.
    /// Returns `None` when the amount does not fit in `i64` cents.
    pub fn from_decimal(amount: Decimal) -> Option<Self> {
        let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let cents = rounded.checked_mul(Decimal::from(Self::MINOR_UNITS))?;
        cents.to_i64().map(Price)
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Mean of `count` prices summing to `sum_cents`, rounded half-up to the cent.
    pub fn average(sum_cents: i64, count: u64) -> Option<Price> {
        if count == 0 {
            return None;
        }
        let sum = sum_cents as i128;
        let count = count as i128;
        let half_up = if sum >= 0 {
            (2 * sum + count) / (2 * count)
        } else {
            -((-2 * sum + count) / (2 * count))
        };
        i64::try_from(half_up).ok().map(Price)
    }

    /// Percentage change from `base` to `self`, rounded to two decimals.
    pub fn pct_change_from(&self, base: Price) -> Option<f64> {
        if base.0 == 0 {
            return None;
        }
        let pct = (self.0 - base.0) as f64 / base.0 as f64 * 100.0;
        Some((pct * 100.0).round() / 100.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn decimal_amounts_round_half_up_to_cents() {
        let price = Price::from_decimal(Decimal::from_str("99.995").unwrap()).unwrap();
        assert_eq!(price.cents(), 10000);

        let price = Price::from_decimal(Decimal::from_str("120.004").unwrap()).unwrap();
        assert_eq!(price.cents(), 12000);
    }

    #[test]
    fn average_rounds_half_up() {
        assert_eq!(Price::average(30000, 3), Some(Price::from_cents(10000)));
        // 1001 / 2 = 500.5 -> 501
        assert_eq!(Price::average(1001, 2), Some(Price::from_cents(501)));
        // 1000 / 3 = 333.33 -> 333
        assert_eq!(Price::average(1000, 3), Some(Price::from_cents(333)));
        assert_eq!(Price::average(0, 0), None);
    }

    #[test]
    fn pct_change_against_base() {
        let base = Price::from_major(100);
        assert_eq!(Price::from_major(120).pct_change_from(base), Some(20.0));
        assert_eq!(Price::from_major(80).pct_change_from(base), Some(-20.0));
        assert_eq!(Price::from_cents(10333).pct_change_from(base), Some(3.33));
        assert_eq!(Price::from_major(80).pct_change_from(Price::from_cents(0)), None);
    }

    #[test]
    fn display_uses_major_units() {
        assert_eq!(Price::from_cents(12345).to_string(), "123.45");
    }
}
