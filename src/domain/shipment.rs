//! Shipment (import consignment) and its fixed customs-base expense.

use crate::domain::{ComputationStatus, CurrencyCode, Decimal, ShipmentId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One import consignment being costed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub name: String,
    pub supplier: String,
    /// Currency the commercial invoice is declared in.
    pub primary_currency: CurrencyCode,
    /// Local-currency units per one unit of each supported currency.
    #[serde(default)]
    pub exchange_rates: BTreeMap<CurrencyCode, Decimal>,
    #[serde(default)]
    pub is_consolidated: bool,
    /// Declared volume (m3), only meaningful when consolidated.
    #[serde(default)]
    pub volume_m3: Decimal,
    /// Declared weight (kg), only meaningful when consolidated.
    #[serde(default)]
    pub weight_kg: Decimal,
    #[serde(default)]
    pub status: ComputationStatus,
    /// Shipment totals written by the last committed computation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totals: Option<ShipmentTotals>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_at_ms: Option<i64>,
}

impl Shipment {
    /// Create a draft, non-consolidated shipment with no recorded rates.
    pub fn new(
        id: ShipmentId,
        name: impl Into<String>,
        supplier: impl Into<String>,
        primary_currency: CurrencyCode,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            supplier: supplier.into(),
            primary_currency,
            exchange_rates: BTreeMap::new(),
            is_consolidated: false,
            volume_m3: Decimal::zero(),
            weight_kg: Decimal::zero(),
            status: ComputationStatus::Draft,
            totals: None,
            computed_at_ms: None,
        }
    }

    /// Record the local-currency rate for one currency.
    pub fn with_rate(mut self, currency: CurrencyCode, rate: Decimal) -> Self {
        self.exchange_rates.insert(currency, rate);
        self
    }

    /// Flag the shipment as consolidated with its declared volume and weight.
    pub fn consolidated(mut self, volume_m3: Decimal, weight_kg: Decimal) -> Self {
        self.is_consolidated = true;
        self.volume_m3 = volume_m3;
        self.weight_kg = weight_kg;
        self
    }
}

/// Fixed transport + insurance figures, prorated by commercial-value share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomsBaseExpense {
    pub transport_amount: Decimal,
    pub transport_currency: CurrencyCode,
    pub insurance_amount: Decimal,
    pub insurance_currency: CurrencyCode,
}

impl CustomsBaseExpense {
    /// Transport and insurance both declared in `currency`.
    pub fn in_currency(currency: CurrencyCode, transport: Decimal, insurance: Decimal) -> Self {
        Self {
            transport_amount: transport,
            transport_currency: currency.clone(),
            insurance_amount: insurance,
            insurance_currency: currency,
        }
    }
}

/// Shipment-level sums of every line item's derived costs, in local currency
/// unless noted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentTotals {
    /// Commercial value in the declared (primary) currency.
    pub commercial_value_declared: Decimal,
    pub commercial_value: Decimal,
    pub regulatory_fee: Decimal,
    pub customs_base_expense: Decimal,
    pub duty: Decimal,
    pub statistics_levy: Decimal,
    pub incidental_expense: Decimal,
    pub net_cost: Decimal,
    pub vat: Decimal,
    pub excise: Decimal,
    /// duty + statistics levy + VAT + excise.
    pub total_taxes: Decimal,
    pub final_cost: Decimal,
    pub units: i64,
}
