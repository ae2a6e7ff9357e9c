use crate::domain::{ShipmentId, ShipmentRecord, ValidationError};
use crate::engine::{
    compute_shipment, preview_consolidation, ComputationResult, ConsolidationPreview,
    CostingPolicy, OverflowError,
};
use crate::store::{ShipmentStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Runs computations against a store: load, validate, compute, commit.
#[derive(Clone)]
pub struct CostingService {
    store: Arc<dyn ShipmentStore>,
    policy: CostingPolicy,
}

impl CostingService {
    pub fn new(store: Arc<dyn ShipmentStore>, policy: CostingPolicy) -> Self {
        Self { store, policy }
    }

    /// Compute every derived field of a shipment and commit them atomically.
    ///
    /// Recomputing an unchanged shipment yields an identical result.
    pub async fn compute(&self, id: &ShipmentId) -> Result<ComputationResult, CostingError> {
        let record = self.load_valid(id).await?;

        let mut computation = compute_shipment(&record, &self.policy)?;
        computation.shipment.computed_at_ms = Some(chrono::Utc::now().timestamp_millis());

        for warning in &computation.result.warnings {
            warn!(shipment_id = %id, %warning, "Computation warning");
        }

        self.store
            .save_computation(&computation)
            .await
            .map_err(|e| match e {
                StoreError::Missing(id) => CostingError::NotFound(id),
                other => CostingError::Persistence(other),
            })?;

        info!(
            shipment_id = %id,
            line_items = computation.result.items.len(),
            final_cost = %computation.result.totals.final_cost,
            warnings = computation.result.warnings.len(),
            "Shipment computed"
        );
        Ok(computation.result)
    }

    /// Show how shared costs would be split. Never writes.
    pub async fn preview_consolidation(
        &self,
        id: &ShipmentId,
    ) -> Result<ConsolidationPreview, CostingError> {
        let record = self.load_valid(id).await?;
        let preview = preview_consolidation(&record, &self.policy)?;

        for warning in &preview.warnings {
            warn!(shipment_id = %id, %warning, "Preview warning");
        }
        Ok(preview)
    }

    async fn load_valid(&self, id: &ShipmentId) -> Result<ShipmentRecord, CostingError> {
        let record = self
            .store
            .load_shipment(id)
            .await?
            .ok_or(CostingError::NotFound(*id))?;
        record.validate()?;
        Ok(record)
    }
}

#[derive(Debug, Error)]
pub enum CostingError {
    #[error("shipment {0} not found")]
    NotFound(ShipmentId),
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),
    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),
    #[error("computation failed: {0}")]
    Overflow(#[from] OverflowError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CurrencyCode, Decimal, LineItem, LineItemId, Shipment};
    use crate::store::MemoryStore;

    fn record() -> ShipmentRecord {
        let usd = CurrencyCode::new("USD");
        let shipment = Shipment::new(ShipmentId::new_v4(), "Order", "Acme", usd.clone())
            .with_rate(usd, Decimal::from(1000));
        let mut record = ShipmentRecord::new(shipment);
        record.line_items.push(LineItem::new(
            LineItemId::new_v4(),
            "A",
            "Article",
            2,
            Decimal::from(10),
        ));
        record
    }

    #[tokio::test]
    async fn test_compute_unknown_shipment() {
        let service = CostingService::new(Arc::new(MemoryStore::new()), CostingPolicy::default());
        let id = ShipmentId::new_v4();
        let result = service.compute(&id).await;
        assert!(matches!(result, Err(CostingError::NotFound(missing)) if missing == id));
    }

    #[tokio::test]
    async fn test_compute_rejects_negative_input() {
        let mut record = record();
        record.line_items[0].duty_rate = Decimal::from(-1);
        let id = record.shipment.id;
        let store = Arc::new(MemoryStore::new().with_record(record.clone()));
        let service = CostingService::new(store.clone(), CostingPolicy::default());

        let result = service.compute(&id).await;

        assert!(matches!(result, Err(CostingError::InvalidInput(_))));
        assert_eq!(store.load_shipment(&id).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_compute_reports_overflow_without_writing() {
        let mut record = record();
        record.line_items[0].total_value =
            Decimal::from_str_canonical("100000000000000000000000000").unwrap();
        let id = record.shipment.id;
        let store = Arc::new(MemoryStore::new().with_record(record.clone()));
        let service = CostingService::new(store.clone(), CostingPolicy::default());

        let result = service.compute(&id).await;

        assert!(matches!(result, Err(CostingError::Overflow(_))));
        assert_eq!(store.load_shipment(&id).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_compute_stamps_and_commits() {
        let record = record();
        let id = record.shipment.id;
        let store = Arc::new(MemoryStore::new().with_record(record));
        let service = CostingService::new(store.clone(), CostingPolicy::default());

        let result = service.compute(&id).await.unwrap();

        let stored = store.load_shipment(&id).await.unwrap().unwrap();
        assert!(stored.shipment.computed_at_ms.is_some());
        assert_eq!(stored.shipment.totals, Some(result.totals));
        assert_eq!(stored.line_items[0].cost.as_ref(), Some(&result.items[0].cost));
    }
}
