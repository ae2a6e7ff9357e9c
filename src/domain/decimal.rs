//! Lossless decimal numeric type backed by rust_decimal.
//!
//! Provides canonical parsing from strings and formatting without exponent notation.

use rust_decimal::{Decimal as RustDecimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

/// Lossless decimal numeric type for cost calculations.
///
/// Backed by rust_decimal to avoid floating-point drift.
/// Serializes to JSON number (not string) by default.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Decimal {
    /// Create a Decimal from a RustDecimal.
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Build `num * 10^-scale`, e.g. `from_parts(21, 2)` is 0.21.
    pub const fn from_parts(num: i64, scale: u32) -> Self {
        Decimal(RustDecimal::from_parts(
            num.unsigned_abs() as u32,
            0,
            0,
            num < 0,
            scale,
        ))
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s.trim()).map(Decimal)
    }

    /// Format the Decimal as a canonical string (no exponent notation).
    pub fn to_canonical_string(&self) -> String {
        // Use normalize() to remove trailing zeros, then format without exponent
        let normalized = self.0.normalize();
        format!("{}", normalized)
    }

    /// Get the underlying RustDecimal.
    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    /// The multiplicative identity (1).
    pub fn one() -> Self {
        Decimal(RustDecimal::ONE)
    }

    /// Returns the value 100.
    pub fn hundred() -> Self {
        Decimal(RustDecimal::ONE_HUNDRED)
    }

    /// Returns true if the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Absolute value.
    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }

    /// `self + rhs`, or `None` on overflow.
    pub fn checked_add(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_add(rhs.0).map(Decimal)
    }

    /// `self * rhs`, or `None` on overflow.
    pub fn checked_mul(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_mul(rhs.0).map(Decimal)
    }

    /// `self / rhs`, or `None` on overflow or a zero divisor.
    pub fn checked_div(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_div(rhs.0).map(Decimal)
    }

    /// `self / denominator`, or `fallback` when the denominator is zero.
    pub fn ratio_or(self, denominator: Decimal, fallback: Decimal) -> Decimal {
        if denominator.is_zero() {
            fallback
        } else {
            self / denominator
        }
    }

    /// Round to `scale` decimal places with the given strategy.
    pub fn round_with(&self, scale: u32, strategy: RoundingStrategy) -> Self {
        Decimal(self.0.round_dp_with_strategy(scale, strategy))
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

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal(RustDecimal::from(value))
    }
}

// Arithmetic operations
impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Decimal) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl std::ops::Div for Decimal {
    type Output = Decimal;

    fn div(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 / rhs.0)
    }
}

impl Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Self {
        iter.fold(Decimal::zero(), |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Decimal> for Decimal {
    fn sum<I: Iterator<Item = &'a Decimal>>(iter: I) -> Self {
        iter.fold(Decimal::zero(), |acc, x| acc + *x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_canonical_no_exponent() {
        let decimal = Decimal::from_str_canonical("1066666.6700").expect("parse failed");
        let formatted = decimal.to_canonical_string();
        assert!(!formatted.contains('e'));
        assert_eq!(formatted, "1066666.67");
    }

    #[test]
    fn test_decimal_arithmetic() {
        let a = Decimal::from_str_canonical("10.5").unwrap();
        let b = Decimal::from_str_canonical("2.5").unwrap();

        assert_eq!((a + b).to_canonical_string(), "13");
        assert_eq!((a - b).to_canonical_string(), "8");
        assert_eq!((a * b).to_canonical_string(), "26.25");
        assert_eq!((a / b).to_canonical_string(), "4.2");
    }

    #[test]
    fn test_decimal_from_parts() {
        assert_eq!(Decimal::from_parts(21, 2).to_canonical_string(), "0.21");
        assert_eq!(Decimal::from_parts(5, 3).to_canonical_string(), "0.005");
        assert_eq!(Decimal::from_parts(-3, 2).to_canonical_string(), "-0.03");
    }

    #[test]
    fn test_decimal_ratio_or_handles_zero_denominator() {
        let two = Decimal::from(2);
        assert_eq!(two.ratio_or(Decimal::zero(), Decimal::one()), Decimal::one());
        assert_eq!(
            two.ratio_or(Decimal::from(4), Decimal::one()).to_canonical_string(),
            "0.5"
        );
    }

    #[test]
    fn test_decimal_sum_and_add_assign() {
        let values = vec![Decimal::from(1), Decimal::from(2), Decimal::from(3)];
        let total: Decimal = values.iter().sum();
        assert_eq!(total, Decimal::from(6));

        let mut acc = Decimal::zero();
        acc += Decimal::from(4);
        assert_eq!(acc, Decimal::from(4));
    }

    #[test]
    fn test_decimal_round_with_strategies() {
        let v = Decimal::from_str_canonical("33333.3333").unwrap();
        assert_eq!(
            v.round_with(2, RoundingStrategy::MidpointAwayFromZero)
                .to_canonical_string(),
            "33333.33"
        );
        assert_eq!(
            v.round_with(2, RoundingStrategy::AwayFromZero)
                .to_canonical_string(),
            "33333.34"
        );
    }

    #[test]
    fn test_decimal_json_serialization() {
        let decimal = Decimal::from_str_canonical("123.456").unwrap();
        let json = serde_json::to_value(decimal).unwrap();
        // Should serialize as a JSON number, not a string
        assert!(json.is_number());
        assert_eq!(json.to_string(), "123.456");
    }

    #[test]
    fn test_decimal_checked_ops() {
        let max = Decimal::new(RustDecimal::MAX);
        assert_eq!(max.checked_mul(Decimal::from(2)), None);
        assert_eq!(max.checked_add(Decimal::one()), None);
        assert_eq!(Decimal::one().checked_div(Decimal::zero()), None);
        assert_eq!(
            Decimal::from(6).checked_div(Decimal::from(4)),
            Some(Decimal::from_str_canonical("1.5").unwrap())
        );
    }

    #[test]
    fn test_decimal_sign_helpers() {
        assert!(Decimal::one().is_positive());
        assert!(!Decimal::zero().is_positive());
        assert!(Decimal::from(-1).is_negative());
        assert_eq!(Decimal::from(-7).abs(), Decimal::from(7));
    }
}
