//! Line item (one article within a shipment) and its derived cost breakdown.

use crate::domain::{Decimal, GroupTag, LineItemId};
use serde::{Deserialize, Serialize};

/// One article within a shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    /// Stable report order within the shipment.
    #[serde(default)]
    pub position: i64,
    pub code: String,
    pub name: String,
    /// Unit count; see [`units_or_default`].
    #[serde(default)]
    pub units: Option<i64>,
    /// Commercial unit value in the declared currency.
    #[serde(default)]
    pub unit_value: Decimal,
    /// Commercial total value in the declared currency.
    pub total_value: Decimal,
    /// Duty-rate fraction; zero means duty-exempt.
    #[serde(default)]
    pub duty_rate: Decimal,
    /// Selective-excise-rate fraction.
    #[serde(default)]
    pub excise_rate: Decimal,
    #[serde(default = "default_regulatory_fee_applies")]
    pub regulatory_fee_applies: bool,
    #[serde(default)]
    pub group: GroupTag,
    /// Derived costs written by the last committed computation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<LineItemCost>,
}

fn default_regulatory_fee_applies() -> bool {
    true
}

/// Unit count fallback: a missing or non-positive count is treated as 1.
pub fn units_or_default(units: Option<i64>) -> i64 {
    match units {
        Some(n) if n > 0 => n,
        _ => 1,
    }
}

impl LineItem {
    pub fn new(
        id: LineItemId,
        code: impl Into<String>,
        name: impl Into<String>,
        units: i64,
        total_value: Decimal,
    ) -> Self {
        let unit_value = if units > 0 {
            total_value / Decimal::from(units)
        } else {
            total_value
        };
        Self {
            id,
            position: 0,
            code: code.into(),
            name: name.into(),
            units: Some(units),
            unit_value,
            total_value,
            duty_rate: Decimal::zero(),
            excise_rate: Decimal::zero(),
            regulatory_fee_applies: true,
            group: GroupTag::general(),
            cost: None,
        }
    }

    pub fn with_duty_rate(mut self, rate: Decimal) -> Self {
        self.duty_rate = rate;
        self
    }

    pub fn with_excise_rate(mut self, rate: Decimal) -> Self {
        self.excise_rate = rate;
        self
    }

    pub fn with_group(mut self, group: GroupTag) -> Self {
        self.group = group;
        self
    }

    pub fn with_regulatory_fee(mut self, applies: bool) -> Self {
        self.regulatory_fee_applies = applies;
        self
    }

    /// Unit count used by every per-unit computation.
    pub fn effective_units(&self) -> i64 {
        units_or_default(self.units)
    }

    pub fn is_duty_exempt(&self) -> bool {
        !self.duty_rate.is_positive()
    }
}

/// Derived landed-cost figures of one line item, in local currency unless noted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemCost {
    /// Units actually used (after the missing/non-positive fallback).
    pub units: i64,
    /// Commercial value per unit in the declared currency.
    pub commercial_value_per_unit_declared: Decimal,
    pub commercial_value_per_unit: Decimal,
    pub commercial_value: Decimal,
    /// Share of the shipment's commercial value, in [0, 1].
    pub participation_share: Decimal,
    pub regulatory_fee: Decimal,
    /// Share of the transport + insurance pool.
    pub customs_base_expense: Decimal,
    pub customs_base: Decimal,
    pub duty: Decimal,
    pub statistics_levy: Decimal,
    pub incidental_expense: Decimal,
    pub net_cost: Decimal,
    pub net_cost_per_unit: Decimal,
    pub excise_per_unit: Decimal,
    pub excise: Decimal,
    pub vat_per_unit: Decimal,
    pub vat: Decimal,
    pub final_cost_per_unit: Decimal,
    pub final_cost: Decimal,
    /// Diagnostic percentage increase from commercial to net cost per unit.
    pub markup_factor_pct: Decimal,
}
