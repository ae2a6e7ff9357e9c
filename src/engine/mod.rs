//! Pure landed-cost computation engine.
//!
//! Data flows one way: currency resolution and participation feed the
//! expense aggregator, which feeds the line-item calculator, whose results
//! are summed into shipment totals. Nothing here performs I/O.

use crate::domain::{
    ComputationStatus, CurrencyCode, Decimal, GroupTag, IncidentalExpense, LineItem,
    LineItemCost, Shipment, ShipmentRecord,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub mod aggregate;
pub mod currency;
pub mod expenses;
pub mod item_cost;
pub mod participation;
pub mod rounding;
pub mod summary;

pub use aggregate::aggregate_totals;
pub use currency::{CurrencyResolver, RateSource, ResolvedRate};
pub use expenses::{aggregate_expenses, customs_base_pool, ExpensePools, MethodTotals};
pub use item_cost::AllocationContext;
pub use participation::{
    compute_participation, own_metrics, ConsolidationMetrics, ConvertedParticipant,
    Participation, ParticipationRatios,
};
pub use rounding::{Rounding, RoundingMode};
pub use summary::{ComputationResult, ConsolidationPreview, ItemSummary};

/// Regulatory fee on commercial value of fee-subject items (0.5%).
pub const REGULATORY_FEE_RATE: Decimal = Decimal::from_parts(5, 3);
/// Statistics levy on the customs base of dutiable items (3%).
pub const STATISTICS_LEVY_RATE: Decimal = Decimal::from_parts(3, 2);
/// Value-added tax on net unit cost (21%).
pub const VAT_RATE: Decimal = Decimal::from_parts(21, 2);

/// A derived figure exceeded the range of the decimal type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("arithmetic overflow while computing {step}")]
pub struct OverflowError {
    pub step: &'static str,
}

pub(crate) fn add(a: Decimal, b: Decimal, step: &'static str) -> Result<Decimal, OverflowError> {
    a.checked_add(b).ok_or(OverflowError { step })
}

pub(crate) fn mul(a: Decimal, b: Decimal, step: &'static str) -> Result<Decimal, OverflowError> {
    a.checked_mul(b).ok_or(OverflowError { step })
}

/// Callers guarantee a non-zero divisor, so `None` can only mean overflow.
pub(crate) fn div(a: Decimal, b: Decimal, step: &'static str) -> Result<Decimal, OverflowError> {
    a.checked_div(b).ok_or(OverflowError { step })
}

pub(crate) fn total<I>(values: I, step: &'static str) -> Result<Decimal, OverflowError>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::zero(), |acc, value| add(acc, value, step))
}

/// Knobs a computation run is evaluated under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostingPolicy {
    pub rounding: Rounding,
    /// Currency cross-currency values are normalized through.
    pub reference_currency: CurrencyCode,
}

impl Default for CostingPolicy {
    fn default() -> Self {
        Self {
            rounding: Rounding::exact(),
            reference_currency: CurrencyCode::new("USD"),
        }
    }
}

/// Non-fatal data-quality signal attached to a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComputationWarning {
    /// A currency had no usable rate and a fallback was applied.
    MissingRate {
        currency: CurrencyCode,
        fallback_rate: Decimal,
        source: RateSource,
    },
    /// A share had a zero denominator and took its neutral value.
    DegenerateDenominator { basis: String },
    /// An expense pool matched no line item with commercial value.
    UnallocatedGroupExpense { group: GroupTag, amount: Decimal },
}

impl fmt::Display for ComputationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputationWarning::MissingRate {
                currency,
                fallback_rate,
                ..
            } => write!(f, "no rate for {}, used {}", currency, fallback_rate),
            ComputationWarning::DegenerateDenominator { basis } => {
                write!(f, "zero {} denominator", basis)
            }
            ComputationWarning::UnallocatedGroupExpense { group, amount } => {
                let group = if group.is_general() { "general" } else { group.as_str() };
                write!(f, "{} of {} pool left unallocated", amount, group)
            }
        }
    }
}

/// Collects warnings during one run, without duplicates.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<ComputationWarning>,
}

impl Diagnostics {
    fn push(&mut self, warning: ComputationWarning) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    pub(crate) fn note_rate(&mut self, resolved: &ResolvedRate) {
        if resolved.is_fallback() {
            self.push(ComputationWarning::MissingRate {
                currency: resolved.currency.clone(),
                fallback_rate: resolved.rate,
                source: resolved.source,
            });
        }
    }

    pub(crate) fn note_degenerate(&mut self, basis: &str) {
        self.push(ComputationWarning::DegenerateDenominator {
            basis: basis.to_string(),
        });
    }

    pub(crate) fn note_unallocated(&mut self, group: &GroupTag, amount: Decimal) {
        self.push(ComputationWarning::UnallocatedGroupExpense {
            group: group.clone(),
            amount,
        });
    }

    pub fn into_warnings(self) -> Vec<ComputationWarning> {
        self.warnings
    }
}

/// Everything one run writes back, staged for a single atomic commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentComputation {
    /// Shipment with totals filled in and status `computed`.
    pub shipment: Shipment,
    /// Line items with every derived cost field filled in.
    pub line_items: Vec<LineItem>,
    /// Expenses with converted and prorated caches filled in.
    pub expenses: Vec<IncidentalExpense>,
    pub result: ComputationResult,
}

/// Run the full pipeline over a loaded shipment.
///
/// Reads only raw inputs (and cached expense conversions); never the
/// derived fields of a previous run. Fails only when a figure overflows.
pub fn compute_shipment(
    record: &ShipmentRecord,
    policy: &CostingPolicy,
) -> Result<ShipmentComputation, OverflowError> {
    let mut diagnostics = Diagnostics::default();
    let shipment = &record.shipment;
    let resolver = CurrencyResolver::for_shipment(shipment, &policy.reference_currency);

    let primary = resolver.primary_rate();
    diagnostics.note_rate(&primary);

    let participation = if shipment.is_consolidated {
        Some(compute_participation(record, &resolver, &mut diagnostics)?)
    } else {
        None
    };
    let ratios = participation.as_ref().map(|p| p.ratios);

    let pools = aggregate_expenses(
        record,
        &resolver,
        ratios.as_ref(),
        &policy.rounding,
        &mut diagnostics,
    )?;

    let context = AllocationContext::new(&record.line_items, primary.rate, &pools, policy.rounding)?;
    context.note_unallocated(!record.line_items.is_empty(), &mut diagnostics);

    let costs: Vec<LineItemCost> = record
        .line_items
        .iter()
        .map(|item| context.cost_item(item))
        .collect::<Result<_, _>>()?;

    let costed: Vec<(&LineItem, &LineItemCost)> = record.line_items.iter().zip(costs.iter()).collect();
    let totals = aggregate_totals(&costed, &pools)?;
    let items: Vec<ItemSummary> = costed
        .iter()
        .map(|(item, cost)| ItemSummary {
            id: item.id,
            code: item.code.clone(),
            name: item.name.clone(),
            group: item.group.clone(),
            regulatory_fee_applies: item.regulatory_fee_applies,
            cost: (*cost).clone(),
        })
        .collect();

    let line_items: Vec<LineItem> = record
        .line_items
        .iter()
        .zip(costs)
        .map(|(item, cost)| LineItem {
            cost: Some(cost),
            ..item.clone()
        })
        .collect();

    // Digest with this run's conversions cached, as a recompute will read them.
    let input_digest = ShipmentRecord {
        expenses: pools.expenses.clone(),
        ..record.clone()
    }
    .input_digest();

    let result = ComputationResult {
        shipment_id: shipment.id,
        primary_currency: shipment.primary_currency.clone(),
        exchange_rate: primary.rate,
        is_consolidated: shipment.is_consolidated,
        participation: ratios,
        totals: totals.clone(),
        items,
        warnings: diagnostics.into_warnings(),
        input_digest,
    };

    let mut computed = shipment.clone();
    computed.totals = Some(totals);
    computed.status = ComputationStatus::Computed;

    Ok(ShipmentComputation {
        shipment: computed,
        line_items,
        expenses: pools.expenses,
        result,
    })
}

/// Inspect how shared costs would be split, without computing line items.
pub fn preview_consolidation(
    record: &ShipmentRecord,
    policy: &CostingPolicy,
) -> Result<ConsolidationPreview, OverflowError> {
    let mut diagnostics = Diagnostics::default();
    let shipment = &record.shipment;
    let resolver = CurrencyResolver::for_shipment(shipment, &policy.reference_currency);

    let participation = if shipment.is_consolidated {
        compute_participation(record, &resolver, &mut diagnostics)?
    } else {
        Participation::standalone(own_metrics(record)?)
    };
    let ratios = shipment.is_consolidated.then_some(participation.ratios);

    let pools = aggregate_expenses(
        record,
        &resolver,
        ratios.as_ref(),
        &policy.rounding,
        &mut diagnostics,
    )?;

    Ok(ConsolidationPreview {
        shipment_id: shipment.id,
        is_consolidated: shipment.is_consolidated,
        supplier: shipment.supplier.clone(),
        primary_currency: shipment.primary_currency.clone(),
        own: participation.own,
        participants: participation.participants,
        combined: participation.combined,
        ratios: participation.ratios,
        expenses_by_method: pools.method_totals(),
        estimated_incidental_total: pools.incidental_total,
        warnings: diagnostics.into_warnings(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ConsolidatedParticipant, CustomsBaseExpense, ExpenseId, LineItemId, ParticipantId,
        ProrationMethod, ShipmentId,
    };
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn consolidated_record() -> ShipmentRecord {
        let usd = CurrencyCode::new("USD");
        let shipment = Shipment::new(ShipmentId::new_v4(), "Container", "Acme", usd.clone())
            .with_rate(usd.clone(), d("1000"))
            .consolidated(d("10"), d("100"));
        let mut record = ShipmentRecord::new(shipment);
        record.customs_base = Some(CustomsBaseExpense::in_currency(usd.clone(), d("400"), d("0")));
        record.line_items.push(
            LineItem::new(LineItemId::new_v4(), "A", "Article A", 10, d("1000"))
                .with_duty_rate(d("0.1")),
        );
        record.expenses.push(
            IncidentalExpense::new(ExpenseId::new_v4(), "freight forwarder", d("200"), usd.clone())
                .with_proration(ProrationMethod::ByWeight),
        );
        record.participants.push(ConsolidatedParticipant::new(
            ParticipantId::new_v4(),
            "Other",
            d("3000"),
            usd,
            d("30"),
            d("300"),
        ));
        record
    }

    #[test]
    fn test_consolidated_run_reduces_shared_costs() {
        let record = consolidated_record();
        let computation = compute_shipment(&record, &CostingPolicy::default()).unwrap();

        let ratios = computation.result.participation.expect("consolidated ratios");
        assert_eq!(ratios.by_value, d("0.25"));
        assert_eq!(ratios.by_volume, d("0.25"));
        assert_eq!(ratios.by_weight, d("0.25"));

        // 400 * 1000 reduced by the volume ratio
        assert_eq!(computation.result.totals.customs_base_expense, d("100000"));
        assert_eq!(computation.result.totals.incidental_expense, d("50000"));
        assert_eq!(computation.expenses[0].converted_amount, Some(d("200000")));
        assert_eq!(computation.expenses[0].prorated_amount, Some(d("50000")));
        assert_eq!(computation.shipment.status, ComputationStatus::Computed);
        assert!(computation.line_items.iter().all(|item| item.cost.is_some()));
    }

    #[test]
    fn test_preview_matches_compute_ratios() {
        let record = consolidated_record();
        let policy = CostingPolicy::default();
        let preview = preview_consolidation(&record, &policy).unwrap();
        let computation = compute_shipment(&record, &policy).unwrap();

        assert_eq!(Some(preview.ratios), computation.result.participation);
        assert_eq!(preview.combined.commercial_value, d("4000"));
        assert_eq!(
            preview.estimated_incidental_total,
            computation.result.totals.incidental_expense
        );
        let by_weight = preview
            .expenses_by_method
            .iter()
            .find(|m| m.method == ProrationMethod::ByWeight)
            .unwrap();
        assert_eq!(by_weight.total, d("200000"));
        assert_eq!(by_weight.prorated, d("50000"));
    }

    #[test]
    fn test_preview_of_standalone_shipment_is_neutral() {
        let mut record = consolidated_record();
        record.shipment.is_consolidated = false;
        let preview = preview_consolidation(&record, &CostingPolicy::default()).unwrap();

        assert!(!preview.is_consolidated);
        assert!(preview.participants.is_empty());
        assert_eq!(preview.ratios, ParticipationRatios::neutral());
        assert_eq!(preview.estimated_incidental_total, d("200000"));
    }

    #[test]
    fn test_missing_primary_rate_is_a_warning() {
        let mut record = consolidated_record();
        record.shipment.exchange_rates.clear();
        let computation = compute_shipment(&record, &CostingPolicy::default()).unwrap();

        assert_eq!(computation.result.exchange_rate, Decimal::one());
        assert!(computation
            .result
            .warnings
            .iter()
            .any(|w| matches!(w, ComputationWarning::MissingRate { source: RateSource::Unit, .. })));
    }

    #[test]
    fn test_orphan_group_pool_is_reported() {
        let mut record = consolidated_record();
        record.shipment.is_consolidated = false;
        record.expenses[0].group = GroupTag::new("toys");
        let computation = compute_shipment(&record, &CostingPolicy::default()).unwrap();

        assert_eq!(
            computation.result.warnings,
            vec![ComputationWarning::UnallocatedGroupExpense {
                group: GroupTag::new("toys"),
                amount: d("200000"),
            }]
        );
        assert_eq!(computation.result.items[0].cost.incidental_expense, Decimal::zero());
    }

    #[test]
    fn test_oversized_value_overflows_instead_of_panicking() {
        let mut record = consolidated_record();
        record.line_items[0].total_value = d("100000000000000000000000000");

        assert!(record.validate().is_ok());
        let err = compute_shipment(&record, &CostingPolicy::default()).unwrap_err();
        assert_eq!(err.step, "commercial_value");
        assert!(preview_consolidation(&record, &CostingPolicy::default()).is_ok());
    }

    #[test]
    fn test_stale_conversion_changes_digest_and_result() {
        let record = consolidated_record();
        let policy = CostingPolicy::default();
        let first = compute_shipment(&record, &policy).unwrap();

        let mut reloaded = record.clone();
        reloaded.expenses = first.expenses.clone();
        let again = compute_shipment(&reloaded, &policy).unwrap();
        assert_eq!(first.result.input_digest, again.result.input_digest);
        assert_eq!(first.result, again.result);

        let mut stale = reloaded.clone();
        stale.expenses[0].converted_amount = Some(d("999999"));
        let changed = compute_shipment(&stale, &policy).unwrap();
        assert_ne!(changed.result.totals, first.result.totals);
        assert_ne!(changed.result.input_digest, first.result.input_digest);
    }
}
