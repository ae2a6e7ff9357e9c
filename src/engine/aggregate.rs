use crate::domain::{LineItem, LineItemCost, ShipmentTotals};

use super::{add, total, ExpensePools, OverflowError};

/// Sum costed line items into shipment totals.
///
/// Every item must be paired with its freshly computed cost.
pub fn aggregate_totals(
    costed: &[(&LineItem, &LineItemCost)],
    pools: &ExpensePools,
) -> Result<ShipmentTotals, OverflowError> {
    let mut totals = ShipmentTotals {
        customs_base_expense: pools.customs_base_total,
        incidental_expense: pools.incidental_total,
        ..ShipmentTotals::default()
    };

    for (item, cost) in costed {
        totals.commercial_value_declared = add(
            totals.commercial_value_declared,
            item.total_value,
            "total_commercial_value_declared",
        )?;
        totals.commercial_value =
            add(totals.commercial_value, cost.commercial_value, "total_commercial_value")?;
        totals.regulatory_fee =
            add(totals.regulatory_fee, cost.regulatory_fee, "total_regulatory_fee")?;
        totals.duty = add(totals.duty, cost.duty, "total_duty")?;
        totals.statistics_levy =
            add(totals.statistics_levy, cost.statistics_levy, "total_statistics_levy")?;
        totals.vat = add(totals.vat, cost.vat, "total_vat")?;
        totals.excise = add(totals.excise, cost.excise, "total_excise")?;
        totals.net_cost = add(totals.net_cost, cost.net_cost, "total_net_cost")?;
        totals.final_cost = add(totals.final_cost, cost.final_cost, "total_final_cost")?;
        totals.units = totals.units.saturating_add(cost.units);
    }

    totals.total_taxes = total(
        [totals.duty, totals.statistics_levy, totals.vat, totals.excise],
        "total_taxes",
    )?;
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, LineItemId};
    use std::collections::BTreeMap;

    #[test]
    fn test_totals_sum_items_and_carry_pools() {
        let a = LineItem::new(LineItemId::new_v4(), "A", "A", 2, Decimal::from(10));
        let b = LineItem::new(LineItemId::new_v4(), "B", "B", 3, Decimal::from(20));
        let cost_a = LineItemCost {
            units: 2,
            commercial_value: Decimal::from(100),
            duty: Decimal::from(7),
            vat: Decimal::from(21),
            final_cost: Decimal::from(128),
            net_cost: Decimal::from(107),
            ..LineItemCost::default()
        };
        let cost_b = LineItemCost {
            units: 3,
            commercial_value: Decimal::from(200),
            excise: Decimal::from(5),
            vat: Decimal::from(42),
            final_cost: Decimal::from(247),
            net_cost: Decimal::from(200),
            ..LineItemCost::default()
        };
        let pools = ExpensePools {
            customs_base_total: Decimal::from(9),
            incidental_total: Decimal::from(4),
            by_group: BTreeMap::new(),
            by_method: BTreeMap::new(),
            expenses: Vec::new(),
        };

        let totals = aggregate_totals(&[(&a, &cost_a), (&b, &cost_b)], &pools).unwrap();

        assert_eq!(totals.commercial_value_declared, Decimal::from(30));
        assert_eq!(totals.commercial_value, Decimal::from(300));
        assert_eq!(totals.units, 5);
        assert_eq!(totals.total_taxes, Decimal::from(75));
        assert_eq!(totals.final_cost, Decimal::from(375));
        assert_eq!(totals.customs_base_expense, Decimal::from(9));
        assert_eq!(totals.incidental_expense, Decimal::from(4));
        assert_eq!(totals.vat, Decimal::from(63));
    }

    #[test]
    fn test_totals_report_overflow() {
        let a = LineItem::new(LineItemId::new_v4(), "A", "A", 1, Decimal::from(1));
        let huge = LineItemCost {
            units: 1,
            final_cost: Decimal::new(rust_decimal::Decimal::MAX),
            ..LineItemCost::default()
        };
        let pools = ExpensePools {
            customs_base_total: Decimal::zero(),
            incidental_total: Decimal::zero(),
            by_group: BTreeMap::new(),
            by_method: BTreeMap::new(),
            expenses: Vec::new(),
        };

        let err = aggregate_totals(&[(&a, &huge), (&a, &huge)], &pools).unwrap_err();
        assert_eq!(err.step, "total_final_cost");
    }
}
