//! Rounding policy for monetary figures.

use crate::domain::Decimal;
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Keep full decimal precision.
    #[default]
    None,
    /// Round half away from zero.
    HalfUp,
    /// Round away from zero.
    Up,
    /// Round toward zero.
    Truncate,
}

impl FromStr for RoundingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(RoundingMode::None),
            "half_up" => Ok(RoundingMode::HalfUp),
            "up" => Ok(RoundingMode::Up),
            "truncate" => Ok(RoundingMode::Truncate),
            other => Err(format!(
                "must be none, half_up, up, or truncate, got {}",
                other
            )),
        }
    }
}

/// Rounding applied to each monetary figure at the step that produces it.
///
/// Ratios, shares and the markup factor are never rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rounding {
    pub mode: RoundingMode,
    pub scale: u32,
}

impl Rounding {
    pub const fn new(mode: RoundingMode, scale: u32) -> Self {
        Self { mode, scale }
    }

    /// Full precision.
    pub const fn exact() -> Self {
        Self::new(RoundingMode::None, 0)
    }

    pub fn money(&self, value: Decimal) -> Decimal {
        let strategy = match self.mode {
            RoundingMode::None => return value,
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::Up => RoundingStrategy::AwayFromZero,
            RoundingMode::Truncate => RoundingStrategy::ToZero,
        };
        value.round_with(self.scale, strategy)
    }
}

impl Default for Rounding {
    fn default() -> Self {
        Self::exact()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_exact_keeps_precision() {
        let value = d("33333.333333");
        assert_eq!(Rounding::exact().money(value), value);
    }

    #[test]
    fn test_modes_at_scale_two() {
        let value = d("16666.665");
        assert_eq!(Rounding::new(RoundingMode::HalfUp, 2).money(value), d("16666.67"));
        assert_eq!(Rounding::new(RoundingMode::Up, 2).money(value), d("16666.67"));
        assert_eq!(Rounding::new(RoundingMode::Truncate, 2).money(value), d("16666.66"));

        let third = d("33333.3333");
        assert_eq!(Rounding::new(RoundingMode::HalfUp, 2).money(third), d("33333.33"));
        assert_eq!(Rounding::new(RoundingMode::Up, 2).money(third), d("33333.34"));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("half_up".parse::<RoundingMode>().unwrap(), RoundingMode::HalfUp);
        assert!("ceil".parse::<RoundingMode>().is_err());
    }
}
