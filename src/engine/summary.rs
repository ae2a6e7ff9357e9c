//! Structured results handed back to callers.
//!
//! Every monetary and ratio field is a typed decimal serialized as a JSON
//! number; formatting is left to the presentation layer.

use crate::domain::{
    CurrencyCode, Decimal, GroupTag, LineItemCost, LineItemId, ShipmentId, ShipmentTotals,
};
use serde::Serialize;

use super::{
    ComputationWarning, ConsolidationMetrics, ConvertedParticipant, MethodTotals,
    ParticipationRatios,
};

/// Per-item row of a computation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemSummary {
    pub id: LineItemId,
    pub code: String,
    pub name: String,
    pub group: GroupTag,
    pub regulatory_fee_applies: bool,
    #[serde(flatten)]
    pub cost: LineItemCost,
}

/// Outcome of one committed computation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComputationResult {
    pub shipment_id: ShipmentId,
    pub primary_currency: CurrencyCode,
    /// Local-currency rate applied to the declared commercial values.
    pub exchange_rate: Decimal,
    pub is_consolidated: bool,
    /// Participation ratios, present only for consolidated shipments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participation: Option<ParticipationRatios>,
    pub totals: ShipmentTotals,
    pub items: Vec<ItemSummary>,
    pub warnings: Vec<ComputationWarning>,
    /// Digest of the raw inputs this result was computed from.
    pub input_digest: String,
}

/// Read-only view of how a consolidated shipment splits shared costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidationPreview {
    pub shipment_id: ShipmentId,
    pub is_consolidated: bool,
    pub supplier: String,
    pub primary_currency: CurrencyCode,
    pub own: ConsolidationMetrics,
    pub participants: Vec<ConvertedParticipant>,
    pub combined: ConsolidationMetrics,
    pub ratios: ParticipationRatios,
    pub expenses_by_method: Vec<MethodTotals>,
    /// Incidental expenses this shipment would carry after proration.
    pub estimated_incidental_total: Decimal,
    pub warnings: Vec<ComputationWarning>,
}
