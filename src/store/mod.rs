//! Persistence boundary for shipments and their computed results.

use crate::domain::{ShipmentId, ShipmentRecord};
use crate::engine::ShipmentComputation;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod memory;

pub use memory::MemoryStore;

/// Storage backing the costing service.
///
/// Implementations must commit a computation atomically: either every
/// derived field of the shipment, its line items and its expenses is
/// written, or none is.
#[async_trait]
pub trait ShipmentStore: Send + Sync + fmt::Debug {
    /// Load a shipment with all of its relations, ordered by position.
    async fn load_shipment(&self, id: &ShipmentId) -> Result<Option<ShipmentRecord>, StoreError>;

    /// Write back every derived field of one computation run.
    async fn save_computation(&self, computation: &ShipmentComputation) -> Result<(), StoreError>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("shipment {0} does not exist")]
    Missing(ShipmentId),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
