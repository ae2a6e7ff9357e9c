//! Incidental expenses and their consolidated proration method.

use crate::domain::{CurrencyCode, Decimal, ExpenseId, GroupTag};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How an incidental expense is reduced to this shipment's share when the
/// shipment is consolidated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProrationMethod {
    /// Charged in full to this shipment.
    None,
    /// Reduced by the commercial-value participation ratio.
    #[default]
    ByValue,
    /// Reduced by the volume participation ratio.
    ByVolume,
    /// Reduced by the weight participation ratio.
    ByWeight,
}

impl ProrationMethod {
    pub const ALL: [ProrationMethod; 4] = [
        ProrationMethod::ByValue,
        ProrationMethod::ByVolume,
        ProrationMethod::ByWeight,
        ProrationMethod::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProrationMethod::None => "none",
            ProrationMethod::ByValue => "by_value",
            ProrationMethod::ByVolume => "by_volume",
            ProrationMethod::ByWeight => "by_weight",
        }
    }
}

impl FromStr for ProrationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(ProrationMethod::None),
            "by_value" => Ok(ProrationMethod::ByValue),
            "by_volume" => Ok(ProrationMethod::ByVolume),
            "by_weight" => Ok(ProrationMethod::ByWeight),
            other => Err(format!("unknown proration method: {}", other)),
        }
    }
}

impl std::fmt::Display for ProrationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One ad-hoc cost (broker fees, terminal handling, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentalExpense {
    pub id: ExpenseId,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub description: String,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    /// Surcharge fraction applied after conversion (0.1 = +10%).
    #[serde(default)]
    pub surcharge_rate: Decimal,
    #[serde(default)]
    pub group: GroupTag,
    #[serde(default)]
    pub proration: ProrationMethod,
    /// Local-currency amount after conversion and surcharge, before proration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_amount: Option<Decimal>,
    /// This shipment's share of `converted_amount`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prorated_amount: Option<Decimal>,
}

impl IncidentalExpense {
    pub fn new(
        id: ExpenseId,
        description: impl Into<String>,
        amount: Decimal,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            id,
            position: 0,
            description: description.into(),
            amount,
            currency,
            surcharge_rate: Decimal::zero(),
            group: GroupTag::general(),
            proration: ProrationMethod::default(),
            converted_amount: None,
            prorated_amount: None,
        }
    }

    pub fn with_surcharge(mut self, rate: Decimal) -> Self {
        self.surcharge_rate = rate;
        self
    }

    pub fn with_group(mut self, group: GroupTag) -> Self {
        self.group = group;
        self
    }

    pub fn with_proration(mut self, method: ProrationMethod) -> Self {
        self.proration = method;
        self
    }

    /// Cached converted amount, if a previous run stored a positive one.
    pub fn cached_conversion(&self) -> Option<Decimal> {
        self.converted_amount.filter(|amount| amount.is_positive())
    }
}
