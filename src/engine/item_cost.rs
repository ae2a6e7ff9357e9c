use crate::domain::{Decimal, GroupTag, LineItem, LineItemCost};
use std::collections::BTreeMap;

use super::{
    add, div, mul, total, Diagnostics, ExpensePools, OverflowError, Rounding,
    REGULATORY_FEE_RATE, STATISTICS_LEVY_RATE, VAT_RATE,
};

/// Shipment-wide figures every line item is costed against.
///
/// Built once before the per-item loop; items never read each other's
/// derived fields, only these shared totals.
#[derive(Debug, Clone)]
pub struct AllocationContext {
    primary_rate: Decimal,
    rounding: Rounding,
    commercial_total: Decimal,
    fee_subject_total: Decimal,
    group_commercial: BTreeMap<GroupTag, Decimal>,
    customs_base_pool: Decimal,
    general_pool: Decimal,
    group_pools: BTreeMap<GroupTag, Decimal>,
}

impl AllocationContext {
    pub fn new(
        items: &[LineItem],
        primary_rate: Decimal,
        pools: &ExpensePools,
        rounding: Rounding,
    ) -> Result<Self, OverflowError> {
        let mut commercial_total = Decimal::zero();
        let mut fee_subject_total = Decimal::zero();
        let mut group_commercial: BTreeMap<GroupTag, Decimal> = BTreeMap::new();

        for item in items {
            let local = rounding.money(mul(item.total_value, primary_rate, "commercial_value")?);
            commercial_total = add(commercial_total, local, "commercial_value")?;
            let group = group_commercial.entry(item.group.clone()).or_default();
            *group = add(*group, local, "commercial_value")?;
            if item.regulatory_fee_applies {
                fee_subject_total = add(fee_subject_total, local, "commercial_value")?;
            }
        }

        Ok(Self {
            primary_rate,
            rounding,
            commercial_total,
            fee_subject_total,
            group_commercial,
            customs_base_pool: pools.customs_base_total,
            general_pool: pools.general_pool(),
            group_pools: pools
                .group_pools()
                .map(|(tag, amount)| (tag.clone(), *amount))
                .collect(),
        })
    }

    /// Report pools that no line item can absorb.
    pub(crate) fn note_unallocated(&self, has_items: bool, diagnostics: &mut Diagnostics) {
        if has_items && self.commercial_total.is_zero() {
            diagnostics.note_degenerate("line_item_commercial_value");
        }
        if self.commercial_total.is_zero() && self.general_pool.is_positive() {
            diagnostics.note_unallocated(&GroupTag::general(), self.general_pool);
        }
        for (tag, amount) in &self.group_pools {
            let group_value = self.group_commercial.get(tag).copied().unwrap_or_default();
            if group_value.is_zero() && amount.is_positive() {
                diagnostics.note_unallocated(tag, *amount);
            }
        }
    }

    fn incidental_for(
        &self,
        item: &LineItem,
        commercial: Decimal,
        share: Decimal,
    ) -> Result<Decimal, OverflowError> {
        let r = &self.rounding;
        let general = r.money(mul(self.general_pool, share, "incidental_expense")?);
        if item.group.is_general() {
            return Ok(general);
        }
        let group_value = self.group_commercial.get(&item.group).copied().unwrap_or_default();
        match self.group_pools.get(&item.group) {
            Some(pool) if group_value.is_positive() => {
                let weighted = mul(*pool, commercial, "incidental_expense")?;
                let scoped = r.money(div(weighted, group_value, "incidental_expense")?);
                add(general, scoped, "incidental_expense")
            }
            _ => Ok(general),
        }
    }

    /// Cost one line item from its raw inputs and the shared totals.
    pub fn cost_item(&self, item: &LineItem) -> Result<LineItemCost, OverflowError> {
        let r = &self.rounding;
        let units = item.effective_units();
        let unit_count = Decimal::from(units);

        let commercial = r.money(mul(item.total_value, self.primary_rate, "commercial_value")?);
        let share = commercial.ratio_or(self.commercial_total, Decimal::zero());

        let regulatory_fee = if item.regulatory_fee_applies && self.fee_subject_total.is_positive()
        {
            r.money(mul(commercial, REGULATORY_FEE_RATE, "regulatory_fee")?)
        } else {
            Decimal::zero()
        };

        let customs_base_expense =
            r.money(mul(self.customs_base_pool, share, "customs_base_expense")?);
        let customs_base = add(commercial, customs_base_expense, "customs_base")?;

        // The statistics levy follows duty exemption, not a flag of its own.
        let (duty, statistics_levy) = if item.duty_rate.is_positive() {
            (
                r.money(mul(customs_base, item.duty_rate, "duty")?),
                r.money(mul(customs_base, STATISTICS_LEVY_RATE, "statistics_levy")?),
            )
        } else {
            (Decimal::zero(), Decimal::zero())
        };

        let incidental_expense = self.incidental_for(item, commercial, share)?;

        let net_cost = total(
            [commercial, regulatory_fee, duty, statistics_levy, incidental_expense],
            "net_cost",
        )?;
        let net_cost_per_unit = r.money(div(net_cost, unit_count, "net_cost_per_unit")?);

        let excise_per_unit = r.money(mul(net_cost_per_unit, item.excise_rate, "excise")?);
        let vat_per_unit = r.money(mul(net_cost_per_unit, VAT_RATE, "vat")?);
        let final_cost_per_unit = total(
            [net_cost_per_unit, excise_per_unit, vat_per_unit],
            "final_cost",
        )?;

        let commercial_value_per_unit = r.money(div(commercial, unit_count, "commercial_value")?);
        let markup_factor_pct = if commercial_value_per_unit.is_positive() {
            let markup = div(
                net_cost_per_unit - commercial_value_per_unit,
                commercial_value_per_unit,
                "markup_factor_pct",
            )?;
            mul(markup, Decimal::hundred(), "markup_factor_pct")?
        } else {
            Decimal::zero()
        };

        Ok(LineItemCost {
            units,
            commercial_value_per_unit_declared: r.money(div(
                item.total_value,
                unit_count,
                "commercial_value",
            )?),
            commercial_value_per_unit,
            commercial_value: commercial,
            participation_share: share,
            regulatory_fee,
            customs_base_expense,
            customs_base,
            duty,
            statistics_levy,
            incidental_expense,
            net_cost,
            net_cost_per_unit,
            excise_per_unit,
            excise: r.money(mul(excise_per_unit, unit_count, "excise")?),
            vat_per_unit,
            vat: r.money(mul(vat_per_unit, unit_count, "vat")?),
            final_cost_per_unit,
            final_cost: r.money(mul(final_cost_per_unit, unit_count, "final_cost")?),
            markup_factor_pct,
        })
    }
}
