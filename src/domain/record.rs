//! Fully loaded shipment aggregate consumed by the costing engine.

use crate::domain::{
    ConsolidatedParticipant, CustomsBaseExpense, Decimal, IncidentalExpense, LineItem, Shipment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shipment together with every relation the engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub shipment: Shipment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customs_base: Option<CustomsBaseExpense>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub expenses: Vec<IncidentalExpense>,
    #[serde(default)]
    pub participants: Vec<ConsolidatedParticipant>,
}

/// A raw input that cannot be costed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} must be non-negative, got {value}")]
pub struct ValidationError {
    pub field: String,
    pub value: Decimal,
}

impl ShipmentRecord {
    pub fn new(shipment: Shipment) -> Self {
        Self {
            shipment,
            customs_base: None,
            line_items: Vec::new(),
            expenses: Vec::new(),
            participants: Vec::new(),
        }
    }

    /// Check that every raw monetary figure, rate and fraction is non-negative.
    pub fn validate(&self) -> Result<(), ValidationError> {
        fn non_negative(field: String, value: Decimal) -> Result<(), ValidationError> {
            if value.is_negative() {
                Err(ValidationError { field, value })
            } else {
                Ok(())
            }
        }

        let shipment = &self.shipment;
        for (currency, rate) in &shipment.exchange_rates {
            non_negative(format!("exchange_rates.{}", currency), *rate)?;
        }
        non_negative("volume_m3".to_string(), shipment.volume_m3)?;
        non_negative("weight_kg".to_string(), shipment.weight_kg)?;

        if let Some(base) = &self.customs_base {
            non_negative("customs_base.transport_amount".to_string(), base.transport_amount)?;
            non_negative("customs_base.insurance_amount".to_string(), base.insurance_amount)?;
        }

        for item in &self.line_items {
            non_negative(format!("line_items[{}].unit_value", item.code), item.unit_value)?;
            non_negative(format!("line_items[{}].total_value", item.code), item.total_value)?;
            non_negative(format!("line_items[{}].duty_rate", item.code), item.duty_rate)?;
            non_negative(format!("line_items[{}].excise_rate", item.code), item.excise_rate)?;
        }

        for expense in &self.expenses {
            non_negative(format!("expenses[{}].amount", expense.id), expense.amount)?;
            non_negative(
                format!("expenses[{}].surcharge_rate", expense.id),
                expense.surcharge_rate,
            )?;
        }

        for participant in &self.participants {
            let label = &participant.supplier;
            non_negative(
                format!("participants[{}].commercial_value", label),
                participant.commercial_value,
            )?;
            non_negative(format!("participants[{}].volume_m3", label), participant.volume_m3)?;
            non_negative(format!("participants[{}].weight_kg", label), participant.weight_kg)?;
        }

        Ok(())
    }

    /// Hex SHA-256 digest over everything a computation reads: the raw inputs
    /// plus any cached expense conversion.
    ///
    /// Derived fields, prorated amounts, status and timestamps are excluded, so
    /// two records with equal digests produce identical computation results.
    pub fn input_digest(&self) -> String {
        use sha2::{Digest, Sha256};

        fn hash_var(hasher: &mut Sha256, data: &str) {
            hasher.update((data.len() as u32).to_le_bytes());
            hasher.update(data.as_bytes());
        }

        fn hash_decimal(hasher: &mut Sha256, value: &Decimal) {
            hash_var(hasher, &value.to_canonical_string());
        }

        let mut hasher = Sha256::new();
        let shipment = &self.shipment;
        hash_var(&mut hasher, &shipment.id.to_string());
        hash_var(&mut hasher, shipment.primary_currency.as_str());
        hasher.update((shipment.exchange_rates.len() as u32).to_le_bytes());
        for (currency, rate) in &shipment.exchange_rates {
            hash_var(&mut hasher, currency.as_str());
            hash_decimal(&mut hasher, rate);
        }
        hasher.update([shipment.is_consolidated as u8]);
        hash_decimal(&mut hasher, &shipment.volume_m3);
        hash_decimal(&mut hasher, &shipment.weight_kg);

        match &self.customs_base {
            Some(base) => {
                hasher.update([1u8]);
                hash_decimal(&mut hasher, &base.transport_amount);
                hash_var(&mut hasher, base.transport_currency.as_str());
                hash_decimal(&mut hasher, &base.insurance_amount);
                hash_var(&mut hasher, base.insurance_currency.as_str());
            }
            None => hasher.update([0u8]),
        }

        hasher.update((self.line_items.len() as u32).to_le_bytes());
        for item in &self.line_items {
            hash_var(&mut hasher, &item.id.to_string());
            hasher.update(item.effective_units().to_le_bytes());
            hash_decimal(&mut hasher, &item.total_value);
            hash_decimal(&mut hasher, &item.duty_rate);
            hash_decimal(&mut hasher, &item.excise_rate);
            hasher.update([item.regulatory_fee_applies as u8]);
            hash_var(&mut hasher, item.group.as_str());
        }

        hasher.update((self.expenses.len() as u32).to_le_bytes());
        for expense in &self.expenses {
            hash_var(&mut hasher, &expense.id.to_string());
            hash_decimal(&mut hasher, &expense.amount);
            hash_var(&mut hasher, expense.currency.as_str());
            hash_decimal(&mut hasher, &expense.surcharge_rate);
            hash_var(&mut hasher, expense.group.as_str());
            hash_var(&mut hasher, expense.proration.as_str());
            match expense.cached_conversion() {
                Some(converted) => {
                    hasher.update([1u8]);
                    hash_decimal(&mut hasher, &converted);
                }
                None => hasher.update([0u8]),
            }
        }

        hasher.update((self.participants.len() as u32).to_le_bytes());
        for participant in &self.participants {
            hash_var(&mut hasher, &participant.id.to_string());
            hash_decimal(&mut hasher, &participant.commercial_value);
            hash_var(&mut hasher, participant.currency.as_str());
            hash_decimal(&mut hasher, &participant.volume_m3);
            hash_decimal(&mut hasher, &participant.weight_kg);
        }

        hex::encode(hasher.finalize())
    }
}
