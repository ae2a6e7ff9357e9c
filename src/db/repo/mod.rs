//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by aggregate:
//! - `shipments.rs` - Shipment header, rates, customs base and participants
//! - `line_items.rs` - Line item and incidental expense operations

mod line_items;
mod shipments;

use crate::domain::{Decimal, ShipmentId, ShipmentRecord};
use crate::engine::ShipmentComputation;
use crate::store::{ShipmentStore, StoreError};
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, warn};

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Write every derived field of a computation in a single transaction.
    ///
    /// Returns `false` (and writes nothing) when the shipment does not exist.
    ///
    /// # Errors
    /// Returns an error if any statement fails; the transaction is then
    /// rolled back and previously stored results are left intact.
    pub async fn save_computation_atomic(
        &self,
        computation: &ShipmentComputation,
    ) -> Result<bool, sqlx::Error> {
        let shipment = &computation.shipment;
        let mut tx = self.pool.begin().await?;

        let updated = shipments::update_shipment_results(&mut tx, shipment).await?;
        if updated == 0 {
            return Ok(false);
        }

        for item in &computation.line_items {
            if let Some(cost) = &item.cost {
                line_items::update_line_item_cost(&mut tx, &item.id, cost).await?;
            }
        }
        for expense in &computation.expenses {
            line_items::update_expense_caches(&mut tx, expense).await?;
        }

        tx.commit().await?;
        debug!(
            shipment_id = %shipment.id,
            line_items = computation.line_items.len(),
            expenses = computation.expenses.len(),
            "Computation committed"
        );
        Ok(true)
    }
}

#[async_trait]
impl ShipmentStore for Repository {
    async fn load_shipment(&self, id: &ShipmentId) -> Result<Option<ShipmentRecord>, StoreError> {
        Ok(self.query_shipment_record(id).await?)
    }

    async fn save_computation(&self, computation: &ShipmentComputation) -> Result<(), StoreError> {
        if self.save_computation_atomic(computation).await? {
            Ok(())
        } else {
            Err(StoreError::Missing(computation.shipment.id))
        }
    }
}

fn parse_decimal(raw: &str, column: &str) -> Decimal {
    Decimal::from_str(raw).unwrap_or_else(|e| {
        warn!(
            column = column,
            value = %raw,
            error = %e,
            "Failed to parse decimal column, using default"
        );
        Decimal::default()
    })
}

pub(super) fn decimal_column(row: &SqliteRow, column: &str) -> Decimal {
    let raw: String = row.get(column);
    parse_decimal(&raw, column)
}

pub(super) fn optional_decimal_column(row: &SqliteRow, column: &str) -> Option<Decimal> {
    row.get::<Option<String>, _>(column)
        .map(|raw| parse_decimal(&raw, column))
}

pub(super) fn id_column<T>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = uuid::Error>,
{
    let raw: String = row.get(column);
    T::from_str(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use crate::domain::{
        ComputationStatus, ConsolidatedParticipant, CurrencyCode, CustomsBaseExpense, ExpenseId,
        GroupTag, IncidentalExpense, LineItem, LineItemId, ParticipantId, ProrationMethod,
        Shipment,
    };
    use crate::engine::{compute_shipment, CostingPolicy};
    use tempfile::TempDir;

    async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn sample_record() -> ShipmentRecord {
        let usd = CurrencyCode::new("USD");
        let eur = CurrencyCode::new("EUR");
        let shipment = Shipment::new(ShipmentId::new_v4(), "Spring order", "Acme", usd.clone())
            .with_rate(usd.clone(), d("1000"))
            .with_rate(eur.clone(), d("1100"))
            .consolidated(d("12.5"), d("800"));
        let mut record = ShipmentRecord::new(shipment);
        record.customs_base = Some(CustomsBaseExpense {
            transport_amount: d("100"),
            transport_currency: usd.clone(),
            insurance_amount: d("15"),
            insurance_currency: eur.clone(),
        });
        record.line_items.push(
            LineItem::new(LineItemId::new_v4(), "A-1", "Lipstick", 3, d("100"))
                .with_duty_rate(d("0.16"))
                .with_group(GroupTag::new("cosmetics")),
        );
        record.line_items.push(
            LineItem::new(LineItemId::new_v4(), "B-2", "Stand", 1, d("40"))
                .with_regulatory_fee(false),
        );
        record.expenses.push(
            IncidentalExpense::new(ExpenseId::new_v4(), "broker", d("80"), eur)
                .with_surcharge(d("0.05"))
                .with_proration(ProrationMethod::ByVolume),
        );
        record.participants.push(ConsolidatedParticipant::new(
            ParticipantId::new_v4(),
            "Other supplier",
            d("500"),
            usd,
            d("37.5"),
            d("1200"),
        ));
        record
    }

    #[tokio::test]
    async fn test_insert_and_load_shipment_record() {
        let (repo, _temp) = setup_test_db().await;
        let record = sample_record();

        repo.insert_shipment_record(&record).await.unwrap();
        let loaded = repo
            .query_shipment_record(&record.shipment.id)
            .await
            .unwrap();

        assert_eq!(loaded, Some(record));
    }

    #[tokio::test]
    async fn test_load_unknown_shipment_returns_none() {
        let (repo, _temp) = setup_test_db().await;
        let loaded = repo.load_shipment(&ShipmentId::new_v4()).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_reinsert_replaces_relations() {
        let (repo, _temp) = setup_test_db().await;
        let mut record = sample_record();
        repo.insert_shipment_record(&record).await.unwrap();

        record.line_items.truncate(1);
        record.expenses.clear();
        repo.insert_shipment_record(&record).await.unwrap();

        let loaded = repo
            .query_shipment_record(&record.shipment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.line_items.len(), 1);
        assert!(loaded.expenses.is_empty());
    }

    #[tokio::test]
    async fn test_save_computation_persists_derived_fields() {
        let (repo, _temp) = setup_test_db().await;
        let record = sample_record();
        repo.insert_shipment_record(&record).await.unwrap();

        let mut computation = compute_shipment(&record, &CostingPolicy::default()).unwrap();
        computation.shipment.computed_at_ms = Some(1_700_000_000_000);
        repo.save_computation(&computation).await.unwrap();

        let loaded = repo
            .load_shipment(&record.shipment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.shipment.status, ComputationStatus::Computed);
        assert_eq!(loaded.shipment.computed_at_ms, Some(1_700_000_000_000));
        assert_eq!(loaded.shipment.totals, computation.shipment.totals);
        assert_eq!(loaded.line_items, computation.line_items);
        assert_eq!(loaded.expenses, computation.expenses);
    }

    #[tokio::test]
    async fn test_save_computation_for_missing_shipment() {
        let (repo, _temp) = setup_test_db().await;
        let record = sample_record();

        let computation = compute_shipment(&record, &CostingPolicy::default()).unwrap();
        let result = repo.save_computation(&computation).await;

        assert!(matches!(result, Err(StoreError::Missing(id)) if id == record.shipment.id));
    }
}
