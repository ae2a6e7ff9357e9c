//! Shipment header, exchange rate, customs-base and participant operations.

use crate::domain::{
    ComputationStatus, ConsolidatedParticipant, CurrencyCode, CustomsBaseExpense, Decimal,
    Shipment, ShipmentId, ShipmentRecord, ShipmentTotals,
};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, warn};

use super::{decimal_column, id_column, line_items, optional_decimal_column, Repository};

const CHILD_TABLES: [&str; 5] = [
    "exchange_rates",
    "customs_base_expenses",
    "line_items",
    "incidental_expenses",
    "consolidated_participants",
];

impl Repository {
    /// Insert a shipment with all of its inputs in a single transaction.
    ///
    /// An existing shipment with the same id has its header updated and its
    /// relations replaced.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn insert_shipment_record(&self, record: &ShipmentRecord) -> Result<(), sqlx::Error> {
        let shipment = &record.shipment;
        let id = shipment.id.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO shipments (
                id, name, supplier, primary_currency, is_consolidated,
                volume_m3, weight_kg, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                supplier = excluded.supplier,
                primary_currency = excluded.primary_currency,
                is_consolidated = excluded.is_consolidated,
                volume_m3 = excluded.volume_m3,
                weight_kg = excluded.weight_kg
            "#,
        )
        .bind(&id)
        .bind(&shipment.name)
        .bind(&shipment.supplier)
        .bind(shipment.primary_currency.as_str())
        .bind(shipment.is_consolidated)
        .bind(shipment.volume_m3.to_canonical_string())
        .bind(shipment.weight_kg.to_canonical_string())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&mut *tx)
        .await?;

        update_shipment_results(&mut tx, shipment).await?;

        for table in CHILD_TABLES {
            let sql = format!("DELETE FROM {} WHERE shipment_id = ?", table);
            sqlx::query(&sql).bind(&id).execute(&mut *tx).await?;
        }

        for (currency, rate) in &shipment.exchange_rates {
            sqlx::query("INSERT INTO exchange_rates (shipment_id, currency, rate) VALUES (?, ?, ?)")
                .bind(&id)
                .bind(currency.as_str())
                .bind(rate.to_canonical_string())
                .execute(&mut *tx)
                .await?;
        }

        if let Some(base) = &record.customs_base {
            sqlx::query(
                r#"
                INSERT INTO customs_base_expenses (
                    shipment_id, transport_amount, transport_currency,
                    insurance_amount, insurance_currency
                ) VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(base.transport_amount.to_canonical_string())
            .bind(base.transport_currency.as_str())
            .bind(base.insurance_amount.to_canonical_string())
            .bind(base.insurance_currency.as_str())
            .execute(&mut *tx)
            .await?;
        }

        for (seq, participant) in record.participants.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO consolidated_participants (
                    id, shipment_id, position, seq, supplier,
                    commercial_value, currency, volume_m3, weight_kg
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(participant.id.to_string())
            .bind(&id)
            .bind(participant.position)
            .bind(seq as i64)
            .bind(&participant.supplier)
            .bind(participant.commercial_value.to_canonical_string())
            .bind(participant.currency.as_str())
            .bind(participant.volume_m3.to_canonical_string())
            .bind(participant.weight_kg.to_canonical_string())
            .execute(&mut *tx)
            .await?;
        }

        line_items::insert_line_items(&mut tx, &id, &record.line_items).await?;
        line_items::insert_expenses(&mut tx, &id, &record.expenses).await?;

        tx.commit().await?;
        debug!(
            shipment_id = %shipment.id,
            line_items = record.line_items.len(),
            expenses = record.expenses.len(),
            participants = record.participants.len(),
            "Shipment record stored"
        );
        Ok(())
    }

    /// Load a shipment with every relation, each ordered by position.
    ///
    /// # Errors
    /// Returns an error if a query fails or a stored id is malformed.
    pub async fn query_shipment_record(
        &self,
        id: &ShipmentId,
    ) -> Result<Option<ShipmentRecord>, sqlx::Error> {
        let key = id.to_string();
        let Some(row) = sqlx::query("SELECT * FROM shipments WHERE id = ?")
            .bind(&key)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let rate_rows = sqlx::query(
            "SELECT currency, rate FROM exchange_rates WHERE shipment_id = ? ORDER BY currency",
        )
        .bind(&key)
        .fetch_all(&self.pool)
        .await?;
        let exchange_rates: BTreeMap<CurrencyCode, Decimal> = rate_rows
            .iter()
            .map(|r| {
                (
                    CurrencyCode::new(r.get::<String, _>("currency")),
                    decimal_column(r, "rate"),
                )
            })
            .collect();

        let shipment = shipment_from_row(&row, exchange_rates)?;

        let customs_base = sqlx::query("SELECT * FROM customs_base_expenses WHERE shipment_id = ?")
            .bind(&key)
            .fetch_optional(&self.pool)
            .await?
            .map(|r| CustomsBaseExpense {
                transport_amount: decimal_column(&r, "transport_amount"),
                transport_currency: CurrencyCode::new(r.get::<String, _>("transport_currency")),
                insurance_amount: decimal_column(&r, "insurance_amount"),
                insurance_currency: CurrencyCode::new(r.get::<String, _>("insurance_currency")),
            });

        let participant_rows = sqlx::query(
            r#"
            SELECT * FROM consolidated_participants
            WHERE shipment_id = ?
            ORDER BY position ASC, seq ASC
            "#,
        )
        .bind(&key)
        .fetch_all(&self.pool)
        .await?;
        let participants = participant_rows
            .iter()
            .map(participant_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let line_items = self.query_line_items(id).await?;
        let expenses = self.query_expenses(id).await?;

        Ok(Some(ShipmentRecord {
            shipment,
            customs_base,
            line_items,
            expenses,
            participants,
        }))
    }
}

/// Write status, timestamp and totals of a shipment. Returns rows affected.
pub(super) async fn update_shipment_results(
    conn: &mut SqliteConnection,
    shipment: &Shipment,
) -> Result<u64, sqlx::Error> {
    let totals = shipment.totals.as_ref();
    let total = |field: fn(&ShipmentTotals) -> Decimal| totals.map(|t| field(t).to_canonical_string());

    let result = sqlx::query(
        r#"
        UPDATE shipments SET
            status = ?,
            computed_at_ms = ?,
            total_commercial_value_declared = ?,
            total_commercial_value = ?,
            total_regulatory_fee = ?,
            total_customs_base_expense = ?,
            total_duty = ?,
            total_statistics_levy = ?,
            total_incidental_expense = ?,
            total_net_cost = ?,
            total_vat = ?,
            total_excise = ?,
            total_taxes = ?,
            total_final_cost = ?,
            total_units = ?
        WHERE id = ?
        "#,
    )
    .bind(shipment.status.as_str())
    .bind(shipment.computed_at_ms)
    .bind(total(|t| t.commercial_value_declared))
    .bind(total(|t| t.commercial_value))
    .bind(total(|t| t.regulatory_fee))
    .bind(total(|t| t.customs_base_expense))
    .bind(total(|t| t.duty))
    .bind(total(|t| t.statistics_levy))
    .bind(total(|t| t.incidental_expense))
    .bind(total(|t| t.net_cost))
    .bind(total(|t| t.vat))
    .bind(total(|t| t.excise))
    .bind(total(|t| t.total_taxes))
    .bind(total(|t| t.final_cost))
    .bind(totals.map(|t| t.units))
    .bind(shipment.id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

fn shipment_from_row(
    row: &SqliteRow,
    exchange_rates: BTreeMap<CurrencyCode, Decimal>,
) -> Result<Shipment, sqlx::Error> {
    let id: ShipmentId = id_column(row, "id")?;
    let status_str: String = row.get("status");
    let status = ComputationStatus::from_str(&status_str).unwrap_or_else(|e| {
        warn!(shipment_id = %id, status = %status_str, error = %e, "Unknown shipment status, using draft");
        ComputationStatus::Draft
    });

    let totals = optional_decimal_column(row, "total_net_cost").map(|net_cost| ShipmentTotals {
        commercial_value_declared: decimal_column(row, "total_commercial_value_declared"),
        commercial_value: decimal_column(row, "total_commercial_value"),
        regulatory_fee: decimal_column(row, "total_regulatory_fee"),
        customs_base_expense: decimal_column(row, "total_customs_base_expense"),
        duty: decimal_column(row, "total_duty"),
        statistics_levy: decimal_column(row, "total_statistics_levy"),
        incidental_expense: decimal_column(row, "total_incidental_expense"),
        net_cost,
        vat: decimal_column(row, "total_vat"),
        excise: decimal_column(row, "total_excise"),
        total_taxes: decimal_column(row, "total_taxes"),
        final_cost: decimal_column(row, "total_final_cost"),
        units: row.get::<Option<i64>, _>("total_units").unwrap_or_default(),
    });

    Ok(Shipment {
        id,
        name: row.get("name"),
        supplier: row.get("supplier"),
        primary_currency: CurrencyCode::new(row.get::<String, _>("primary_currency")),
        exchange_rates,
        is_consolidated: row.get("is_consolidated"),
        volume_m3: decimal_column(row, "volume_m3"),
        weight_kg: decimal_column(row, "weight_kg"),
        status,
        totals,
        computed_at_ms: row.get("computed_at_ms"),
    })
}

fn participant_from_row(row: &SqliteRow) -> Result<ConsolidatedParticipant, sqlx::Error> {
    Ok(ConsolidatedParticipant {
        id: id_column(row, "id")?,
        position: row.get("position"),
        supplier: row.get("supplier"),
        commercial_value: decimal_column(row, "commercial_value"),
        currency: CurrencyCode::new(row.get::<String, _>("currency")),
        volume_m3: decimal_column(row, "volume_m3"),
        weight_kg: decimal_column(row, "weight_kg"),
    })
}
