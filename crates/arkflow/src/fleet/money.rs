use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Fractional digits kept for every ledger amount (paise).
pub const MONEY_SCALE: u32 = 2;

/// Largest single amount the ledger accepts, in rupees. Sums of bounded amounts cannot
/// overflow `Decimal`.
pub const LEDGER_LIMIT_RUPEES: i64 = 1_000_000_000_000;

/// Fixed-point rupee amount normalised to two fractional digits.
///
/// All ledger arithmetic goes through this type so that sums and differences are exact;
/// values arriving from JSON as floats are rounded half away from zero on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Whole rupees, e.g. `Money::from_major(15_400)`.
    pub fn from_major(rupees: i64) -> Self {
        Self::new(Decimal::from(rupees))
    }

    /// Amount expressed in paise.
    pub fn from_minor(paise: i64) -> Self {
        Self::new(Decimal::new(paise, MONEY_SCALE))
    }

    pub fn amount(self) -> Decimal {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// True when the magnitude is above [`LEDGER_LIMIT_RUPEES`].
    pub fn exceeds_ledger_limit(&self) -> bool {
        self.0.abs() > Decimal::from(LEDGER_LIMIT_RUPEES)
    }

    /// Applies a fractional rate (0.2 = 20%) and rounds back to paise.
    pub fn apply_rate(self, rate: Decimal) -> Self {
        Self::new(self.0 * rate)
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_rounds_half_away_from_zero() {
        assert_eq!(Money::new(dec!(10.005)).amount(), dec!(10.01));
        assert_eq!(Money::new(dec!(-10.005)).amount(), dec!(-10.01));
        assert_eq!(Money::new(dec!(10.004)).amount(), dec!(10.00));
    }

    #[test]
    fn sums_are_exact_where_floats_drift() {
        let total: Money = std::iter::repeat(Money::new(dec!(0.1))).take(10).sum();
        assert_eq!(total, Money::from_major(1));
    }

    #[test]
    fn apply_rate_rounds_to_paise() {
        let commission = Money::from_major(15_400).apply_rate(dec!(0.2));
        assert_eq!(commission, Money::from_major(3_080));

        let odd = Money::from_minor(12_345).apply_rate(dec!(0.15));
        assert_eq!(odd.amount(), dec!(18.52));
    }

    #[test]
    fn zero_is_not_negative() {
        assert!(!Money::ZERO.is_negative());
        assert!((Money::ZERO - Money::from_minor(1)).is_negative());
    }

    #[test]
    fn deserializes_json_numbers() {
        let parsed: Money = serde_json::from_str("11670.5").expect("number parses");
        assert_eq!(parsed.amount(), dec!(11670.50));
        let parsed: Money = serde_json::from_str("450").expect("integer parses");
        assert_eq!(parsed, Money::from_major(450));
    }

    #[test]
    fn zero_check_works_as_serde_skip_predicate() {
        let skip: fn(&Money) -> bool = Money::is_zero;
        assert!(skip(&Money::ZERO));
        assert!(!skip(&Money::from_minor(1)));
    }

    #[test]
    fn ledger_limit_is_inclusive() {
        assert!(!Money::from_major(LEDGER_LIMIT_RUPEES).exceeds_ledger_limit());
        assert!(Money::from_major(LEDGER_LIMIT_RUPEES + 1).exceeds_ledger_limit());
        assert!(Money::new(Decimal::MIN).exceeds_ledger_limit());
    }

    #[test]
    fn display_uses_two_decimals() {
        assert_eq!(Money::from_major(11_670).to_string(), "11670.00");
    }
}
