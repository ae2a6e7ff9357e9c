use crate::domain::{Decimal, GroupTag, IncidentalExpense, ProrationMethod, ShipmentRecord};
use serde::Serialize;
use std::collections::BTreeMap;

use super::{
    add, mul, CurrencyResolver, Diagnostics, OverflowError, ParticipationRatios, Rounding,
};

/// Pre- and post-proration totals of the expenses sharing one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MethodTotals {
    pub method: ProrationMethod,
    pub total: Decimal,
    pub prorated: Decimal,
}

/// Shared pools handed to the line-item calculator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpensePools {
    /// Transport + insurance in local currency, after consolidated reduction.
    pub customs_base_total: Decimal,
    /// Sum of every incidental expense's post-proration amount.
    pub incidental_total: Decimal,
    /// Post-proration amounts by group tag; the general tag is the shared pool.
    pub by_group: BTreeMap<GroupTag, Decimal>,
    pub by_method: BTreeMap<ProrationMethod, MethodTotals>,
    /// Expenses with their converted and prorated caches filled in.
    pub expenses: Vec<IncidentalExpense>,
}

impl ExpensePools {
    pub fn general_pool(&self) -> Decimal {
        self.by_group
            .get(&GroupTag::general())
            .copied()
            .unwrap_or_default()
    }

    /// Group-scoped pools, excluding the general pool.
    pub fn group_pools(&self) -> impl Iterator<Item = (&GroupTag, &Decimal)> {
        self.by_group.iter().filter(|(tag, _)| !tag.is_general())
    }

    pub fn method_totals(&self) -> Vec<MethodTotals> {
        ProrationMethod::ALL
            .iter()
            .map(|method| {
                self.by_method.get(method).copied().unwrap_or(MethodTotals {
                    method: *method,
                    total: Decimal::zero(),
                    prorated: Decimal::zero(),
                })
            })
            .collect()
    }
}

/// Transport + insurance converted into local currency; reduced by the
/// by-volume ratio when consolidated.
pub fn customs_base_pool(
    record: &ShipmentRecord,
    resolver: &CurrencyResolver<'_>,
    ratios: Option<&ParticipationRatios>,
    rounding: &Rounding,
    diagnostics: &mut Diagnostics,
) -> Result<Decimal, OverflowError> {
    let Some(base) = &record.customs_base else {
        return Ok(Decimal::zero());
    };
    let transport = rounding.money(mul(
        base.transport_amount,
        resolver.resolve_noted(&base.transport_currency, diagnostics),
        "customs_base_expense",
    )?);
    let insurance = rounding.money(mul(
        base.insurance_amount,
        resolver.resolve_noted(&base.insurance_currency, diagnostics),
        "customs_base_expense",
    )?);
    let total = add(transport, insurance, "customs_base_expense")?;
    match ratios {
        Some(ratios) => Ok(rounding.money(mul(total, ratios.by_volume, "customs_base_expense")?)),
        None => Ok(total),
    }
}

/// Local-currency amount of one expense, after surcharge, before proration.
///
/// Reuses the cached conversion when a previous run stored one.
fn converted_amount(
    expense: &IncidentalExpense,
    resolver: &CurrencyResolver<'_>,
    rounding: &Rounding,
    diagnostics: &mut Diagnostics,
) -> Result<Decimal, OverflowError> {
    if let Some(cached) = expense.cached_conversion() {
        return Ok(cached);
    }
    let rate = resolver.resolve_noted(&expense.currency, diagnostics);
    let local = mul(expense.amount, rate, "incidental_expense")?;
    let surcharged = mul(
        local,
        add(Decimal::one(), expense.surcharge_rate, "incidental_expense")?,
        "incidental_expense",
    )?;
    Ok(rounding.money(surcharged))
}

/// Convert, prorate and bucket every incidental expense and the customs-base
/// expense.
///
/// `ratios` is `Some` only for consolidated shipments.
pub fn aggregate_expenses(
    record: &ShipmentRecord,
    resolver: &CurrencyResolver<'_>,
    ratios: Option<&ParticipationRatios>,
    rounding: &Rounding,
    diagnostics: &mut Diagnostics,
) -> Result<ExpensePools, OverflowError> {
    let customs_base_total = customs_base_pool(record, resolver, ratios, rounding, diagnostics)?;

    let mut incidental_total = Decimal::zero();
    let mut by_group: BTreeMap<GroupTag, Decimal> = BTreeMap::new();
    let mut by_method: BTreeMap<ProrationMethod, MethodTotals> = BTreeMap::new();
    let mut expenses = Vec::with_capacity(record.expenses.len());

    for expense in &record.expenses {
        let converted = converted_amount(expense, resolver, rounding, diagnostics)?;
        let prorated = match ratios {
            Some(ratios) => rounding.money(mul(
                converted,
                ratios.for_method(expense.proration),
                "incidental_expense",
            )?),
            None => converted,
        };

        incidental_total = add(incidental_total, prorated, "incidental_expense")?;
        let pool = by_group.entry(expense.group.clone()).or_default();
        *pool = add(*pool, prorated, "incidental_expense")?;

        let totals = by_method
            .entry(expense.proration)
            .or_insert_with(|| MethodTotals {
                method: expense.proration,
                total: Decimal::zero(),
                prorated: Decimal::zero(),
            });
        totals.total = add(totals.total, converted, "incidental_expense")?;
        totals.prorated = add(totals.prorated, prorated, "incidental_expense")?;

        let mut updated = expense.clone();
        updated.converted_amount = Some(converted);
        updated.prorated_amount = Some(prorated);
        expenses.push(updated);
    }

    Ok(ExpensePools {
        customs_base_total,
        incidental_total,
        by_group,
        by_method,
        expenses,
    })
}
