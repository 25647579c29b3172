use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};
use std::str::FromStr;

/// scale kept on every monetary amount
pub const MONEY_SCALE: u32 = 8;

/// basis points in one whole unit
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Money type with 8 decimal places, enough for any settlement asset the
/// cooperatives use (stablecoins settle at 6 or 7)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const ONE: Money = Money(Decimal::ONE);

    /// create from decimal
    pub fn from_decimal(d: Decimal) -> Self {
        Money(d.round_dp(MONEY_SCALE))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Money(Decimal::from_str(s)?.round_dp(MONEY_SCALE)))
    }

    /// create from whole units
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// create from minor units (cents, stroops, ...)
    pub fn from_minor(amount: i64, scale: u32) -> Self {
        let d = Decimal::from(amount) / Decimal::from(10_u64.pow(scale));
        Money(d.round_dp(MONEY_SCALE))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn round_dp(&self, dp: u32) -> Self {
        Money(self.0.round_dp(dp))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// subtraction floored at zero
    pub fn saturating_sub(self, other: Self) -> Self {
        (self - other).max(Money::ZERO)
    }

    /// multiply by a whole quantity (unit price × units)
    pub fn times(&self, quantity: u64) -> Self {
        Money((self.0 * Decimal::from(quantity)).round_dp(MONEY_SCALE))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl From<u32> for Money {
    fn from(i: u32) -> Self {
        Money::from_major(i as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money((self.0 + other.0).round_dp(MONEY_SCALE))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 = (self.0 + other.0).round_dp(MONEY_SCALE);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money((self.0 - other.0).round_dp(MONEY_SCALE))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 = (self.0 - other.0).round_dp(MONEY_SCALE);
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, other: Decimal) -> Money {
        Money((self.0 * other).round_dp(MONEY_SCALE))
    }
}

impl Div<Decimal> for Money {
    type Output = Money;

    fn div(self, other: Decimal) -> Money {
        Money((self.0 / other).round_dp(MONEY_SCALE))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

/// annual interest rate held in basis points (800 = 8%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Rate(u32);

impl Rate {
    pub const ZERO: Rate = Rate(0);

    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// create from whole percent (e.g., 8 for 8%)
    pub const fn from_percentage(p: u32) -> Self {
        Rate(p * 100)
    }

    pub fn bps(&self) -> u32 {
        self.0
    }

    /// as a fraction (0.08 for 800 bps)
    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.0) / Decimal::from(BPS_DENOMINATOR)
    }

    pub fn as_percentage(&self) -> Decimal {
        Decimal::from(self.0) / Decimal::from(100)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_precision() {
        let m = Money::from_str_exact("100.123456789").unwrap();
        assert_eq!(m.to_string(), "100.12345679");
    }

    #[test]
    fn test_minor_units() {
        let usdc = Money::from_minor(25_000_000_000, 6);
        assert_eq!(usdc, Money::from_major(25_000));
    }

    #[test]
    fn test_saturating_sub() {
        let a = Money::from_major(10);
        let b = Money::from_major(25);
        assert_eq!(a.saturating_sub(b), Money::ZERO);
        assert_eq!(b.saturating_sub(a), Money::from_major(15));
    }

    #[test]
    fn test_zero_is_not_positive() {
        assert!(!Money::ZERO.is_positive());
        assert!(Money::ONE.is_positive());
    }

    #[test]
    fn test_rate_conversions() {
        let rate = Rate::from_bps(800);
        assert_eq!(rate.as_decimal(), dec!(0.08));
        assert_eq!(rate.as_percentage(), dec!(8));
        assert_eq!(Rate::from_percentage(12), Rate::from_bps(1200));
    }

    #[test]
    fn test_unit_price_times_quantity() {
        let price = Money::from_str_exact("2.35").unwrap();
        assert_eq!(price.times(1_000), Money::from_major(2_350));
    }
}
