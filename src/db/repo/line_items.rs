//! Line item and incidental expense operations for the repository.

use crate::domain::{
    CurrencyCode, ExpenseId, GroupTag, IncidentalExpense, LineItem, LineItemCost, LineItemId,
    ProrationMethod, ShipmentId,
};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

use super::{decimal_column, id_column, optional_decimal_column, Repository};

impl Repository {
    /// Query a shipment's line items ordered by position.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_line_items(&self, shipment_id: &ShipmentId) -> Result<Vec<LineItem>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM line_items
            WHERE shipment_id = ?
            ORDER BY position ASC, seq ASC
            "#,
        )
        .bind(shipment_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(line_item_from_row).collect()
    }

    /// Query a shipment's incidental expenses ordered by position.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_expenses(
        &self,
        shipment_id: &ShipmentId,
    ) -> Result<Vec<IncidentalExpense>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM incidental_expenses
            WHERE shipment_id = ?
            ORDER BY position ASC, seq ASC
            "#,
        )
        .bind(shipment_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(expense_from_row).collect()
    }
}

pub(super) async fn insert_line_items(
    conn: &mut SqliteConnection,
    shipment_id: &str,
    items: &[LineItem],
) -> Result<(), sqlx::Error> {
    for (seq, item) in items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO line_items (
                id, shipment_id, position, seq, code, name, units, unit_value,
                total_value, duty_rate, excise_rate, regulatory_fee_applies, group_tag
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id.to_string())
        .bind(shipment_id)
        .bind(item.position)
        .bind(seq as i64)
        .bind(&item.code)
        .bind(&item.name)
        .bind(item.units)
        .bind(item.unit_value.to_canonical_string())
        .bind(item.total_value.to_canonical_string())
        .bind(item.duty_rate.to_canonical_string())
        .bind(item.excise_rate.to_canonical_string())
        .bind(item.regulatory_fee_applies)
        .bind(item.group.as_str())
        .execute(&mut *conn)
        .await?;

        if let Some(cost) = &item.cost {
            update_line_item_cost(conn, &item.id, cost).await?;
        }
    }
    Ok(())
}

pub(super) async fn insert_expenses(
    conn: &mut SqliteConnection,
    shipment_id: &str,
    expenses: &[IncidentalExpense],
) -> Result<(), sqlx::Error> {
    for (seq, expense) in expenses.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO incidental_expenses (
                id, shipment_id, position, seq, description, amount, currency,
                surcharge_rate, group_tag, proration, converted_amount, prorated_amount
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(expense.id.to_string())
        .bind(shipment_id)
        .bind(expense.position)
        .bind(seq as i64)
        .bind(&expense.description)
        .bind(expense.amount.to_canonical_string())
        .bind(expense.currency.as_str())
        .bind(expense.surcharge_rate.to_canonical_string())
        .bind(expense.group.as_str())
        .bind(expense.proration.as_str())
        .bind(expense.converted_amount.map(|d| d.to_canonical_string()))
        .bind(expense.prorated_amount.map(|d| d.to_canonical_string()))
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub(super) async fn update_line_item_cost(
    conn: &mut SqliteConnection,
    id: &LineItemId,
    cost: &LineItemCost,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE line_items SET
            cost_units = ?,
            commercial_value_per_unit_declared = ?,
            commercial_value_per_unit = ?,
            commercial_value = ?,
            participation_share = ?,
            regulatory_fee = ?,
            customs_base_expense = ?,
            customs_base = ?,
            duty = ?,
            statistics_levy = ?,
            incidental_expense = ?,
            net_cost = ?,
            net_cost_per_unit = ?,
            excise_per_unit = ?,
            excise = ?,
            vat_per_unit = ?,
            vat = ?,
            final_cost_per_unit = ?,
            final_cost = ?,
            markup_factor_pct = ?
        WHERE id = ?
        "#,
    )
    .bind(cost.units)
    .bind(cost.commercial_value_per_unit_declared.to_canonical_string())
    .bind(cost.commercial_value_per_unit.to_canonical_string())
    .bind(cost.commercial_value.to_canonical_string())
    .bind(cost.participation_share.to_canonical_string())
    .bind(cost.regulatory_fee.to_canonical_string())
    .bind(cost.customs_base_expense.to_canonical_string())
    .bind(cost.customs_base.to_canonical_string())
    .bind(cost.duty.to_canonical_string())
    .bind(cost.statistics_levy.to_canonical_string())
    .bind(cost.incidental_expense.to_canonical_string())
    .bind(cost.net_cost.to_canonical_string())
    .bind(cost.net_cost_per_unit.to_canonical_string())
    .bind(cost.excise_per_unit.to_canonical_string())
    .bind(cost.excise.to_canonical_string())
    .bind(cost.vat_per_unit.to_canonical_string())
    .bind(cost.vat.to_canonical_string())
    .bind(cost.final_cost_per_unit.to_canonical_string())
    .bind(cost.final_cost.to_canonical_string())
    .bind(cost.markup_factor_pct.to_canonical_string())
    .bind(id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(super) async fn update_expense_caches(
    conn: &mut SqliteConnection,
    expense: &IncidentalExpense,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE incidental_expenses SET converted_amount = ?, prorated_amount = ? WHERE id = ?",
    )
    .bind(expense.converted_amount.map(|d| d.to_canonical_string()))
    .bind(expense.prorated_amount.map(|d| d.to_canonical_string()))
    .bind(expense.id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn line_item_from_row(row: &SqliteRow) -> Result<LineItem, sqlx::Error> {
    // cost_units is written with every other derived column
    let cost = row
        .get::<Option<i64>, _>("cost_units")
        .map(|units| LineItemCost {
            units,
            commercial_value_per_unit_declared: decimal_column(
                row,
                "commercial_value_per_unit_declared",
            ),
            commercial_value_per_unit: decimal_column(row, "commercial_value_per_unit"),
            commercial_value: decimal_column(row, "commercial_value"),
            participation_share: decimal_column(row, "participation_share"),
            regulatory_fee: decimal_column(row, "regulatory_fee"),
            customs_base_expense: decimal_column(row, "customs_base_expense"),
            customs_base: decimal_column(row, "customs_base"),
            duty: decimal_column(row, "duty"),
            statistics_levy: decimal_column(row, "statistics_levy"),
            incidental_expense: decimal_column(row, "incidental_expense"),
            net_cost: decimal_column(row, "net_cost"),
            net_cost_per_unit: decimal_column(row, "net_cost_per_unit"),
            excise_per_unit: decimal_column(row, "excise_per_unit"),
            excise: decimal_column(row, "excise"),
            vat_per_unit: decimal_column(row, "vat_per_unit"),
            vat: decimal_column(row, "vat"),
            final_cost_per_unit: decimal_column(row, "final_cost_per_unit"),
            final_cost: decimal_column(row, "final_cost"),
            markup_factor_pct: decimal_column(row, "markup_factor_pct"),
        });

    Ok(LineItem {
        id: id_column(row, "id")?,
        position: row.get("position"),
        code: row.get("code"),
        name: row.get("name"),
        units: row.get("units"),
        unit_value: decimal_column(row, "unit_value"),
        total_value: decimal_column(row, "total_value"),
        duty_rate: decimal_column(row, "duty_rate"),
        excise_rate: decimal_column(row, "excise_rate"),
        regulatory_fee_applies: row.get("regulatory_fee_applies"),
        group: GroupTag::new(row.get::<String, _>("group_tag")),
        cost,
    })
}

fn expense_from_row(row: &SqliteRow) -> Result<IncidentalExpense, sqlx::Error> {
    let id: ExpenseId = id_column(row, "id")?;
    let proration_str: String = row.get("proration");
    let proration = ProrationMethod::from_str(&proration_str).unwrap_or_else(|e| {
        warn!(expense_id = %id, proration = %proration_str, error = %e, "Unknown proration method, using default");
        ProrationMethod::default()
    });

    Ok(IncidentalExpense {
        id,
        position: row.get("position"),
        description: row.get("description"),
        amount: decimal_column(row, "amount"),
        currency: CurrencyCode::new(row.get::<String, _>("currency")),
        surcharge_rate: decimal_column(row, "surcharge_rate"),
        group: GroupTag::new(row.get::<String, _>("group_tag")),
        proration,
        converted_amount: optional_decimal_column(row, "converted_amount"),
        prorated_amount: optional_decimal_column(row, "prorated_amount"),
    })
}
