use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use facturx_core::{round_money, DomainResult, InvoiceError};

use crate::line_item::LineItem;

/// Per-VAT-rate subtotal (one tax breakdown entry of the output document).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSubtotal {
    pub vat_percent: Decimal,
    /// Sum of line totals charged at this rate.
    pub basis_amount: Decimal,
    /// Sum of tax amounts charged at this rate.
    pub tax_amount: Decimal,
}

/// Document-level totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub net_total: Decimal,
    pub tax_total: Decimal,
    /// Always `net_total + tax_total`.
    pub gross_total: Decimal,
    /// Ordered by ascending VAT percent.
    pub tax_breakdown: Vec<TaxSubtotal>,
}

/// Aggregate resolved line amounts into invoice totals.
///
/// The gross total is derived from the rounded net and tax totals rather than
/// from the per-line gross amounts, so it can never drift by a cent.
pub fn aggregate(lines: &[LineItem]) -> DomainResult<InvoiceTotals> {
    if lines.is_empty() {
        return Err(InvoiceError::EmptyInvoice);
    }

    let mut net = Decimal::ZERO;
    let mut tax = Decimal::ZERO;
    let mut by_rate: BTreeMap<Decimal, (Decimal, Decimal)> = BTreeMap::new();

    for line in lines {
        net = checked_sum(net, line.line_total())?;
        tax = checked_sum(tax, line.tax_amount())?;

        let entry = by_rate
            .entry(line.vat_percent().normalize())
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        entry.0 = checked_sum(entry.0, line.line_total())?;
        entry.1 = checked_sum(entry.1, line.tax_amount())?;
    }

    let net_total = round_money(net);
    let tax_total = round_money(tax);
    let gross_total = net_total
        .checked_add(tax_total)
        .ok_or_else(|| InvoiceError::invalid_amount("gross total overflow"))?;

    let tax_breakdown = by_rate
        .into_iter()
        .map(|(vat_percent, (basis, tax))| TaxSubtotal {
            vat_percent,
            basis_amount: round_money(basis),
            tax_amount: round_money(tax),
        })
        .collect();

    Ok(InvoiceTotals {
        net_total,
        tax_total,
        gross_total,
        tax_breakdown,
    })
}

fn checked_sum(acc: Decimal, value: Decimal) -> DomainResult<Decimal> {
    acc.checked_add(value)
        .ok_or_else(|| InvoiceError::invalid_amount("invoice total overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_item::{DerivedField, LineOverrides};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn line(qty: Decimal, price: Decimal, vat: Decimal) -> LineItem {
        LineItem::new("Item", qty, price, vat).unwrap()
    }

    #[test]
    fn empty_sequence_is_rejected() {
        assert_eq!(aggregate(&[]).unwrap_err(), InvoiceError::EmptyInvoice);
    }

    #[test]
    fn single_line_example() {
        let totals = aggregate(&[line(dec!(10), dec!(120.0), dec!(19))]).unwrap();
        assert_eq!(totals.net_total, dec!(1200.00));
        assert_eq!(totals.tax_total, dec!(228.00));
        assert_eq!(totals.gross_total, dec!(1428.00));
        assert_eq!(totals.gross_total.to_string(), "1428.00");
    }

    #[test]
    fn breakdown_groups_by_rate_in_ascending_order() {
        let lines = vec![
            line(dec!(1), dec!(100), dec!(19)),
            line(dec!(2), dec!(10), dec!(7)),
            line(dec!(1), dec!(50), dec!(19.0)),
            line(dec!(1), dec!(30), dec!(0)),
        ];
        let totals = aggregate(&lines).unwrap();

        let rates: Vec<_> = totals.tax_breakdown.iter().map(|s| s.vat_percent).collect();
        assert_eq!(rates, vec![dec!(0), dec!(7), dec!(19)]);

        let standard = &totals.tax_breakdown[2];
        assert_eq!(standard.basis_amount, dec!(150.00));
        assert_eq!(standard.tax_amount, dec!(28.50));

        let breakdown_tax: Decimal = totals.tax_breakdown.iter().map(|s| s.tax_amount).sum();
        assert_eq!(breakdown_tax, totals.tax_total);
        assert_eq!(totals.net_total, dec!(200.00));
        assert_eq!(totals.tax_total, dec!(29.90));
    }

    #[test]
    fn overridden_amounts_flow_into_totals() {
        let mut first = line(dec!(10), dec!(120), dec!(19));
        first.set_override(DerivedField::Tax, dec!(200)).unwrap();
        let second = line(dec!(1), dec!(100), dec!(19))
            .with_overrides(LineOverrides::none().with_total(dec!(80)))
            .unwrap();

        let totals = aggregate(&[first, second]).unwrap();
        assert_eq!(totals.net_total, dec!(1280.00));
        assert_eq!(totals.tax_total, dec!(215.20));
        assert_eq!(totals.gross_total, dec!(1495.20));
    }

    #[test]
    fn gross_total_ignores_overridden_line_gross() {
        let mut only = line(dec!(1), dec!(100), dec!(19));
        only.set_override(DerivedField::Gross, dec!(150)).unwrap();
        let totals = aggregate(&[only]).unwrap();
        assert_eq!(totals.gross_total, dec!(119.00));
    }

    proptest! {
        /// Property: gross total equals net total plus tax total, exactly.
        #[test]
        fn gross_is_net_plus_tax(
            items in prop::collection::vec(
                (1i64..10_000i64, -1_000_000i64..1_000_000i64, 0i64..300i64),
                1..20,
            )
        ) {
            let lines: Vec<LineItem> = items
                .into_iter()
                .map(|(q, p, v)| line(Decimal::new(q, 2), Decimal::new(p, 2), Decimal::new(v, 1)))
                .collect();
            let totals = aggregate(&lines).unwrap();
            prop_assert_eq!(totals.gross_total, totals.net_total + totals.tax_total);

            let breakdown_net: Decimal = totals.tax_breakdown.iter().map(|s| s.basis_amount).sum();
            prop_assert_eq!(breakdown_net, totals.net_total);
        }
    }
}
