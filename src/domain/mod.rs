//! Domain types for landed-cost computation.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: identifiers, CurrencyCode, GroupTag, ComputationStatus
//! - Shipment, LineItem, CustomsBaseExpense, IncidentalExpense and
//!   ConsolidatedParticipant records with their derived cost fields
//! - The ShipmentRecord aggregate with input validation and digest

pub mod decimal;
pub mod expense;
pub mod line_item;
pub mod participant;
pub mod primitives;
pub mod record;
pub mod shipment;

pub use decimal::Decimal;
pub use expense::{IncidentalExpense, ProrationMethod};
pub use line_item::{units_or_default, LineItem, LineItemCost};
pub use participant::ConsolidatedParticipant;
pub use primitives::{
    ComputationStatus, CurrencyCode, ExpenseId, GroupTag, LineItemId, ParticipantId, ShipmentId,
};
pub use record::{ShipmentRecord, ValidationError};
pub use shipment::{CustomsBaseExpense, Shipment, ShipmentTotals};
