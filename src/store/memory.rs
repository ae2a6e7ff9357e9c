//! In-memory store for tests and dry runs.

use super::{ShipmentStore, StoreError};
use crate::domain::{ShipmentId, ShipmentRecord};
use crate::engine::ShipmentComputation;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Store holding records in a map, with optional write-failure injection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<ShipmentId, ShipmentRecord>>,
    fail_saves: bool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record to the store.
    pub fn with_record(mut self, record: ShipmentRecord) -> Self {
        self.records
            .get_mut()
            .insert(record.shipment.id, record);
        self
    }

    /// Make every `save_computation` fail without writing anything.
    pub fn with_failing_saves(mut self) -> Self {
        self.fail_saves = true;
        self
    }
}

#[async_trait]
impl ShipmentStore for MemoryStore {
    async fn load_shipment(&self, id: &ShipmentId) -> Result<Option<ShipmentRecord>, StoreError> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn save_computation(&self, computation: &ShipmentComputation) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Unavailable("injected save failure".to_string()));
        }

        let id = computation.shipment.id;
        let mut records = self.records.lock().await;
        let record = records.get_mut(&id).ok_or(StoreError::Missing(id))?;
        record.shipment = computation.shipment.clone();
        record.line_items = computation.line_items.clone();
        record.expenses = computation.expenses.clone();
        Ok(())
    }
}
