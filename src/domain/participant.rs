//! Co-shipped supplier in a consolidated shipment.

use crate::domain::{CurrencyCode, Decimal, ParticipantId};
use serde::{Deserialize, Serialize};

/// A co-shipped supplier's declared figures, used only for participation ratios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedParticipant {
    pub id: ParticipantId,
    #[serde(default)]
    pub position: i64,
    pub supplier: String,
    /// Declared commercial value in `currency`.
    pub commercial_value: Decimal,
    pub currency: CurrencyCode,
    #[serde(default)]
    pub volume_m3: Decimal,
    #[serde(default)]
    pub weight_kg: Decimal,
}

impl ConsolidatedParticipant {
    pub fn new(
        id: ParticipantId,
        supplier: impl Into<String>,
        commercial_value: Decimal,
        currency: CurrencyCode,
        volume_m3: Decimal,
        weight_kg: Decimal,
    ) -> Self {
        Self {
            id,
            position: 0,
            supplier: supplier.into(),
            commercial_value,
            currency,
            volume_m3,
            weight_kg,
        }
    }
}
