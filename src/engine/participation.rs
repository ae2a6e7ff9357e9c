use crate::domain::{
    ConsolidatedParticipant, CurrencyCode, Decimal, ParticipantId, ProrationMethod, ShipmentRecord,
};
use serde::Serialize;

use super::{add, total, CurrencyResolver, Diagnostics, OverflowError};

/// This shipment's share of a consolidated shipment under each basis.
///
/// Pure numbers in [0, 1]; 1 means no reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParticipationRatios {
    pub by_value: Decimal,
    pub by_volume: Decimal,
    pub by_weight: Decimal,
}

impl ParticipationRatios {
    /// Ratios of a shipment that shares nothing.
    pub fn neutral() -> Self {
        Self {
            by_value: Decimal::one(),
            by_volume: Decimal::one(),
            by_weight: Decimal::one(),
        }
    }

    /// Ratio applied to an expense prorated with `method`.
    pub fn for_method(&self, method: ProrationMethod) -> Decimal {
        match method {
            ProrationMethod::None => Decimal::one(),
            ProrationMethod::ByValue => self.by_value,
            ProrationMethod::ByVolume => self.by_volume,
            ProrationMethod::ByWeight => self.by_weight,
        }
    }
}

impl Default for ParticipationRatios {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Commercial value (primary currency), volume and weight of one side of a
/// consolidated shipment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidationMetrics {
    pub commercial_value: Decimal,
    pub volume_m3: Decimal,
    pub weight_kg: Decimal,
}

impl ConsolidationMetrics {
    fn absorb(&mut self, other: &ConsolidationMetrics) -> Result<(), OverflowError> {
        self.commercial_value = add(
            self.commercial_value,
            other.commercial_value,
            "consolidated_commercial_value",
        )?;
        self.volume_m3 = add(self.volume_m3, other.volume_m3, "consolidated_volume")?;
        self.weight_kg = add(self.weight_kg, other.weight_kg, "consolidated_weight")?;
        Ok(())
    }
}

/// A co-shipped supplier with its value converted into the primary currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertedParticipant {
    pub id: ParticipantId,
    pub supplier: String,
    pub original_value: Decimal,
    pub currency: CurrencyCode,
    #[serde(flatten)]
    pub metrics: ConsolidationMetrics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participation {
    pub own: ConsolidationMetrics,
    pub participants: Vec<ConvertedParticipant>,
    pub combined: ConsolidationMetrics,
    pub ratios: ParticipationRatios,
}

impl Participation {
    /// A shipment carried alone: combined equals own, all ratios neutral.
    pub fn standalone(own: ConsolidationMetrics) -> Self {
        Self {
            own,
            participants: Vec::new(),
            combined: own,
            ratios: ParticipationRatios::neutral(),
        }
    }
}

/// This shipment's own metrics: its line items' declared commercial value
/// plus its declared volume and weight.
pub fn own_metrics(record: &ShipmentRecord) -> Result<ConsolidationMetrics, OverflowError> {
    Ok(ConsolidationMetrics {
        commercial_value: total(
            record.line_items.iter().map(|item| item.total_value),
            "own_commercial_value",
        )?,
        volume_m3: record.shipment.volume_m3,
        weight_kg: record.shipment.weight_kg,
    })
}

fn convert_participant(
    participant: &ConsolidatedParticipant,
    resolver: &CurrencyResolver<'_>,
    diagnostics: &mut Diagnostics,
) -> Result<ConvertedParticipant, OverflowError> {
    Ok(ConvertedParticipant {
        id: participant.id,
        supplier: participant.supplier.clone(),
        original_value: participant.commercial_value,
        currency: participant.currency.clone(),
        metrics: ConsolidationMetrics {
            commercial_value: resolver.to_primary(
                participant.commercial_value,
                &participant.currency,
                diagnostics,
            )?,
            volume_m3: participant.volume_m3,
            weight_kg: participant.weight_kg,
        },
    })
}

fn share(
    own: Decimal,
    combined: Decimal,
    basis: &'static str,
    diagnostics: &mut Diagnostics,
) -> Decimal {
    if combined.is_zero() {
        diagnostics.note_degenerate(basis);
    }
    own.ratio_or(combined, Decimal::one())
}

/// Compute this shipment's participation in its consolidated shipment.
pub fn compute_participation(
    record: &ShipmentRecord,
    resolver: &CurrencyResolver<'_>,
    diagnostics: &mut Diagnostics,
) -> Result<Participation, OverflowError> {
    let own = own_metrics(record)?;
    let participants: Vec<ConvertedParticipant> = record
        .participants
        .iter()
        .map(|p| convert_participant(p, resolver, diagnostics))
        .collect::<Result<_, _>>()?;

    let mut combined = own;
    for participant in &participants {
        combined.absorb(&participant.metrics)?;
    }

    let ratios = ParticipationRatios {
        by_value: share(
            own.commercial_value,
            combined.commercial_value,
            "consolidated_commercial_value",
            diagnostics,
        ),
        by_volume: share(own.volume_m3, combined.volume_m3, "consolidated_volume", diagnostics),
        by_weight: share(own.weight_kg, combined.weight_kg, "consolidated_weight", diagnostics),
    };

    Ok(Participation {
        own,
        participants,
        combined,
        ratios,
    })
}
