use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use facturx_core::{percent_of, round_money, DomainResult, InvoiceError};

/// Unit of measure (UN/ECE Recommendation 20 subset offered to users).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitCode {
    #[serde(rename = "HUR")]
    Hour,
    #[serde(rename = "DAY")]
    Day,
    #[serde(rename = "H87")]
    Piece,
    #[default]
    #[serde(rename = "C62")]
    Unit,
    #[serde(rename = "LS")]
    FlatRate,
    #[serde(rename = "KMT")]
    Kilometre,
}

impl UnitCode {
    pub const ALL: [UnitCode; 6] = [
        UnitCode::Hour,
        UnitCode::Day,
        UnitCode::Piece,
        UnitCode::Unit,
        UnitCode::FlatRate,
        UnitCode::Kilometre,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            UnitCode::Hour => "HUR",
            UnitCode::Day => "DAY",
            UnitCode::Piece => "H87",
            UnitCode::Unit => "C62",
            UnitCode::FlatRate => "LS",
            UnitCode::Kilometre => "KMT",
        }
    }
}

impl FromStr for UnitCode {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        UnitCode::ALL
            .into_iter()
            .find(|u| u.code() == wanted)
            .ok_or_else(|| InvoiceError::InvalidUnitCode(s.to_string()))
    }
}

/// A derived amount, tagged with where its value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum Derived {
    /// Calculated from quantity, unit price and VAT percent.
    Computed(Decimal),
    /// Supplied by the caller; replaces the calculation for this field only.
    Overridden(Decimal),
}

impl Derived {
    pub fn value(&self) -> Decimal {
        match self {
            Derived::Computed(v) | Derived::Overridden(v) => *v,
        }
    }

    pub fn is_overridden(&self) -> bool {
        matches!(self, Derived::Overridden(_))
    }
}

/// The three overridable fields, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivedField {
    Total,
    Tax,
    Gross,
}

/// Manual overrides for a line's derived amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross: Option<Decimal>,
}

impl LineOverrides {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_total(mut self, value: Decimal) -> Self {
        self.total = Some(value);
        self
    }

    pub fn with_tax(mut self, value: Decimal) -> Self {
        self.tax = Some(value);
        self
    }

    pub fn with_gross(mut self, value: Decimal) -> Self {
        self.gross = Some(value);
        self
    }

    pub fn get(&self, field: DerivedField) -> Option<Decimal> {
        match field {
            DerivedField::Total => self.total,
            DerivedField::Tax => self.tax,
            DerivedField::Gross => self.gross,
        }
    }

    pub fn set(&mut self, field: DerivedField, value: Option<Decimal>) {
        match field {
            DerivedField::Total => self.total = value,
            DerivedField::Tax => self.tax = value,
            DerivedField::Gross => self.gross = value,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_none() && self.tax.is_none() && self.gross.is_none()
    }
}

/// Resolved amounts of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAmounts {
    pub line_total: Derived,
    pub tax_amount: Derived,
    pub gross_amount: Derived,
}

/// Compute a line's derived amounts.
///
/// Resolution runs total → tax → gross. Each field takes its override when one
/// is present, otherwise it is computed from the already-resolved upstream
/// fields, so an overridden total feeds the computed tax and gross. Every value
/// is rounded exactly once, when it is resolved.
pub fn compute_line_item(
    quantity: Decimal,
    unit_price: Decimal,
    vat_percent: Decimal,
    overrides: &LineOverrides,
) -> DomainResult<LineAmounts> {
    if quantity <= Decimal::ZERO {
        return Err(InvoiceError::invalid_quantity(format!(
            "quantity must be positive, got {quantity}"
        )));
    }

    let line_total = match overrides.total {
        Some(value) => Derived::Overridden(round_money(value)),
        None => {
            let net = quantity
                .checked_mul(unit_price)
                .ok_or_else(|| InvoiceError::invalid_amount("line total overflow"))?;
            Derived::Computed(round_money(net))
        }
    };

    if vat_percent < Decimal::ZERO {
        return Err(InvoiceError::invalid_tax_rate(format!(
            "VAT percent must not be negative, got {vat_percent}"
        )));
    }

    let tax_amount = match overrides.tax {
        Some(value) => Derived::Overridden(round_money(value)),
        None => {
            let tax = percent_of(line_total.value(), vat_percent)
                .ok_or_else(|| InvoiceError::invalid_amount("tax amount overflow"))?;
            Derived::Computed(round_money(tax))
        }
    };

    let gross_amount = match overrides.gross {
        Some(value) => Derived::Overridden(round_money(value)),
        None => {
            let gross = line_total
                .value()
                .checked_add(tax_amount.value())
                .ok_or_else(|| InvoiceError::invalid_amount("gross amount overflow"))?;
            Derived::Computed(round_money(gross))
        }
    };

    Ok(LineAmounts {
        line_total,
        tax_amount,
        gross_amount,
    })
}

/// One billable entry of an invoice.
///
/// Derived amounts are kept in sync with the inputs: every setter recomputes
/// them, and overrides stay in place until cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    name: String,
    quantity: Decimal,
    unit_price: Decimal,
    vat_percent: Decimal,
    unit_code: UnitCode,
    #[serde(skip)]
    overrides: LineOverrides,
    #[serde(flatten)]
    amounts: LineAmounts,
}

impl LineItem {
    pub fn new(
        name: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
        vat_percent: Decimal,
    ) -> DomainResult<Self> {
        let name = checked_name(name.into())?;
        let overrides = LineOverrides::none();
        let amounts = compute_line_item(quantity, unit_price, vat_percent, &overrides)?;
        Ok(Self {
            name,
            quantity,
            unit_price,
            vat_percent,
            unit_code: UnitCode::default(),
            overrides,
            amounts,
        })
    }

    pub fn with_unit_code(mut self, unit_code: UnitCode) -> Self {
        self.unit_code = unit_code;
        self
    }

    pub fn with_overrides(mut self, overrides: LineOverrides) -> DomainResult<Self> {
        self.recompute(self.quantity, self.unit_price, self.vat_percent, overrides)?;
        Ok(self)
    }

    /// Rebuild a line from resolved amounts, marking as overridden exactly the
    /// fields whose value differs from what the inputs would produce.
    pub(crate) fn restore(
        name: &str,
        quantity: Decimal,
        unit_price: Decimal,
        vat_percent: Decimal,
        unit_code: UnitCode,
        resolved: [Decimal; 3],
    ) -> DomainResult<Self> {
        let mut line =
            Self::new(name, quantity, unit_price, vat_percent)?.with_unit_code(unit_code);
        let fields = [DerivedField::Total, DerivedField::Tax, DerivedField::Gross];
        for (field, value) in fields.into_iter().zip(resolved) {
            if line.amount(field) != value {
                line.set_override(field, value)?;
            }
        }
        Ok(line)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn vat_percent(&self) -> Decimal {
        self.vat_percent
    }

    pub fn unit_code(&self) -> UnitCode {
        self.unit_code
    }

    pub fn overrides(&self) -> &LineOverrides {
        &self.overrides
    }

    pub fn amounts(&self) -> &LineAmounts {
        &self.amounts
    }

    pub fn line_total(&self) -> Decimal {
        self.amounts.line_total.value()
    }

    pub fn tax_amount(&self) -> Decimal {
        self.amounts.tax_amount.value()
    }

    pub fn gross_amount(&self) -> Decimal {
        self.amounts.gross_amount.value()
    }

    pub fn amount(&self, field: DerivedField) -> Decimal {
        match field {
            DerivedField::Total => self.line_total(),
            DerivedField::Tax => self.tax_amount(),
            DerivedField::Gross => self.gross_amount(),
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> DomainResult<()> {
        self.name = checked_name(name.into())?;
        Ok(())
    }

    pub fn set_unit_code(&mut self, unit_code: UnitCode) {
        self.unit_code = unit_code;
    }

    pub fn set_quantity(&mut self, quantity: Decimal) -> DomainResult<()> {
        self.recompute(quantity, self.unit_price, self.vat_percent, self.overrides)
    }

    pub fn set_unit_price(&mut self, unit_price: Decimal) -> DomainResult<()> {
        self.recompute(self.quantity, unit_price, self.vat_percent, self.overrides)
    }

    pub fn set_vat_percent(&mut self, vat_percent: Decimal) -> DomainResult<()> {
        self.recompute(self.quantity, self.unit_price, vat_percent, self.overrides)
    }

    pub fn set_override(&mut self, field: DerivedField, value: Decimal) -> DomainResult<()> {
        let mut overrides = self.overrides;
        overrides.set(field, Some(value));
        self.recompute(self.quantity, self.unit_price, self.vat_percent, overrides)
    }

    pub fn clear_override(&mut self, field: DerivedField) -> DomainResult<()> {
        let mut overrides = self.overrides;
        overrides.set(field, None);
        self.recompute(self.quantity, self.unit_price, self.vat_percent, overrides)
    }

    // State only changes when the new inputs compute cleanly.
    fn recompute(
        &mut self,
        quantity: Decimal,
        unit_price: Decimal,
        vat_percent: Decimal,
        overrides: LineOverrides,
    ) -> DomainResult<()> {
        let amounts = compute_line_item(quantity, unit_price, vat_percent, &overrides)?;
        self.quantity = quantity;
        self.unit_price = unit_price;
        self.vat_percent = vat_percent;
        self.overrides = overrides;
        self.amounts = amounts;
        Ok(())
    }
}

fn checked_name(name: String) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(InvoiceError::invalid_line_item("line item name is empty"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn consulting() -> LineItem {
        LineItem::new("Consulting Services", dec!(10), dec!(120.0), dec!(19)).unwrap()
    }

    fn plain(quantity: Decimal, price: Decimal, vat: Decimal) -> DomainResult<LineAmounts> {
        compute_line_item(quantity, price, vat, &LineOverrides::none())
    }

    #[test]
    fn computes_total_tax_and_gross() {
        let amounts = plain(dec!(10), dec!(120.0), dec!(19)).unwrap();
        assert_eq!(amounts.line_total, Derived::Computed(dec!(1200.00)));
        assert_eq!(amounts.tax_amount, Derived::Computed(dec!(228.00)));
        assert_eq!(amounts.gross_amount, Derived::Computed(dec!(1428.00)));
    }

    #[test]
    fn rounds_each_value_once_half_up() {
        // 3 * 0.335 = 1.005 -> 1.01; 1.01 * 7% = 0.0707 -> 0.07
        let amounts = plain(dec!(3), dec!(0.335), dec!(7)).unwrap();
        assert_eq!(amounts.line_total.value(), dec!(1.01));
        assert_eq!(amounts.tax_amount.value(), dec!(0.07));
        assert_eq!(amounts.gross_amount.value(), dec!(1.08));
    }

    #[test]
    fn negative_price_is_a_credit() {
        let amounts = plain(dec!(2), dec!(-50), dec!(19)).unwrap();
        assert_eq!(amounts.line_total.value(), dec!(-100.00));
        assert_eq!(amounts.tax_amount.value(), dec!(-19.00));
        assert_eq!(amounts.gross_amount.value(), dec!(-119.00));
    }

    #[test]
    fn zero_vat_yields_zero_tax() {
        let amounts = plain(dec!(1.5), dec!(80), dec!(0)).unwrap();
        assert_eq!(amounts.tax_amount.value(), dec!(0.00));
        assert_eq!(amounts.gross_amount.value(), dec!(120.00));
    }

    #[test]
    fn rejects_non_positive_quantity() {
        for qty in [dec!(0), dec!(-1)] {
            let err = plain(qty, dec!(1), dec!(19)).unwrap_err();
            assert_eq!(err.kind(), "invalid_quantity");
        }
    }

    #[test]
    fn rejects_negative_vat() {
        let err = plain(dec!(1), dec!(1), dec!(-0.5)).unwrap_err();
        assert_eq!(err.kind(), "invalid_tax_rate");
    }

    #[test]
    fn quantity_is_checked_before_vat() {
        let err = plain(dec!(0), dec!(1), dec!(-1)).unwrap_err();
        assert_eq!(err.kind(), "invalid_quantity");
    }

    #[test]
    fn overflowing_product_is_an_invalid_amount() {
        let err = plain(Decimal::MAX, dec!(2), dec!(0)).unwrap_err();
        assert_eq!(err.kind(), "invalid_amount");
    }

    #[test]
    fn total_override_feeds_tax_and_gross() {
        let overrides = LineOverrides::none().with_total(dec!(1000));
        let amounts = compute_line_item(dec!(10), dec!(120), dec!(19), &overrides).unwrap();
        assert_eq!(amounts.line_total, Derived::Overridden(dec!(1000.00)));
        assert_eq!(amounts.tax_amount, Derived::Computed(dec!(190.00)));
        assert_eq!(amounts.gross_amount, Derived::Computed(dec!(1190.00)));
    }

    #[test]
    fn tax_override_feeds_gross() {
        let overrides = LineOverrides::none().with_tax(dec!(200));
        let amounts = compute_line_item(dec!(10), dec!(120), dec!(19), &overrides).unwrap();
        assert_eq!(amounts.line_total, Derived::Computed(dec!(1200.00)));
        assert_eq!(amounts.tax_amount, Derived::Overridden(dec!(200.00)));
        assert_eq!(amounts.gross_amount, Derived::Computed(dec!(1400.00)));
    }

    #[test]
    fn downstream_override_wins() {
        let overrides = LineOverrides::none().with_total(dec!(1000)).with_gross(dec!(1234.5));
        let amounts = compute_line_item(dec!(10), dec!(120), dec!(19), &overrides).unwrap();
        assert_eq!(amounts.tax_amount.value(), dec!(190.00));
        assert_eq!(amounts.gross_amount, Derived::Overridden(dec!(1234.50)));
    }

    #[test]
    fn override_values_are_rounded_when_finalized() {
        let overrides = LineOverrides::none().with_tax(dec!(10.005));
        let amounts = compute_line_item(dec!(1), dec!(1), dec!(19), &overrides).unwrap();
        assert_eq!(amounts.tax_amount.value(), dec!(10.01));
    }

    #[test]
    fn override_survives_input_edits_until_cleared() {
        let mut line = consulting();
        line.set_override(DerivedField::Total, dec!(999)).unwrap();

        line.set_quantity(dec!(20)).unwrap();
        assert_eq!(line.line_total(), dec!(999.00));
        assert_eq!(line.tax_amount(), dec!(189.81));

        line.clear_override(DerivedField::Total).unwrap();
        assert_eq!(line.line_total(), dec!(2400.00));
        assert_eq!(line.tax_amount(), dec!(456.00));
        assert!(line.overrides().is_empty());
    }

    #[test]
    fn failed_edit_leaves_line_unchanged() {
        let mut line = consulting();
        let before = line.clone();
        assert!(line.set_quantity(dec!(0)).is_err());
        assert!(line.set_vat_percent(dec!(-1)).is_err());
        assert_eq!(line, before);
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = LineItem::new("  ", dec!(1), dec!(1), dec!(19)).unwrap_err();
        assert_eq!(err.kind(), "invalid_line_item");
    }

    #[test]
    fn restore_marks_only_divergent_fields() {
        let line = LineItem::restore(
            "Travel",
            dec!(2),
            dec!(50),
            dec!(19),
            UnitCode::Kilometre,
            [dec!(100.00), dec!(20.00), dec!(120.00)],
        )
        .unwrap();
        assert!(!line.amounts().line_total.is_overridden());
        assert!(line.amounts().tax_amount.is_overridden());
        // Gross follows the overridden tax, so it needs no override of its own.
        assert!(!line.amounts().gross_amount.is_overridden());
        assert_eq!(line.unit_code(), UnitCode::Kilometre);
    }

    #[test]
    fn unit_codes_parse_case_insensitively() {
        assert_eq!("hur".parse::<UnitCode>().unwrap(), UnitCode::Hour);
        assert_eq!("C62".parse::<UnitCode>().unwrap(), UnitCode::Unit);
        assert_eq!("XYZ".parse::<UnitCode>().unwrap_err().kind(), "invalid_unit_code");
    }

    #[test]
    fn serializes_with_source_tags() {
        let json = serde_json::to_value(consulting()).unwrap();
        assert_eq!(json["unit_code"], "C62");
        assert_eq!(json["line_total"]["source"], "computed");
        assert_eq!(json["line_total"]["value"], "1200.00");
        assert_eq!(json["gross_amount"]["value"], "1428.00");
    }

    fn arb_quantity() -> impl Strategy<Value = Decimal> {
        (1i64..100_000i64).prop_map(|hundredths| Decimal::new(hundredths, 2))
    }

    fn arb_price() -> impl Strategy<Value = Decimal> {
        (-10_000_000i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
    }

    fn arb_vat() -> impl Strategy<Value = Decimal> {
        (0i64..3000i64).prop_map(|tenths| Decimal::new(tenths, 1))
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: without overrides the amounts follow the closed-form formulas.
        #[test]
        fn amounts_follow_formulas(q in arb_quantity(), p in arb_price(), v in arb_vat()) {
            let amounts = plain(q, p, v).unwrap();
            let total = round_money(q * p);
            let tax = round_money(total * v / Decimal::ONE_HUNDRED);
            prop_assert_eq!(amounts.line_total.value(), total);
            prop_assert_eq!(amounts.tax_amount.value(), tax);
            prop_assert_eq!(amounts.gross_amount.value(), total + tax);
        }

        /// Property: identical inputs give identical outputs.
        #[test]
        fn computation_is_deterministic(q in arb_quantity(), p in arb_price(), v in arb_vat()) {
            let a = plain(q, p, v).unwrap();
            let b = plain(q, p, v).unwrap();
            prop_assert_eq!(a, b);
        }

        /// Property: an overridden total behaves exactly like a naturally computed one
        /// for the downstream tax and gross.
        #[test]
        fn total_override_is_transparent(
            q in arb_quantity(),
            p in arb_price(),
            v in arb_vat(),
            t in arb_price(),
        ) {
            let overrides = LineOverrides::none().with_total(t);
            let overridden = compute_line_item(q, p, v, &overrides).unwrap();
            let natural = plain(Decimal::ONE, t, v).unwrap();
            prop_assert_eq!(overridden.line_total.value(), natural.line_total.value());
            prop_assert_eq!(overridden.tax_amount.value(), natural.tax_amount.value());
            prop_assert_eq!(overridden.gross_amount.value(), natural.gross_amount.value());
        }
    }
}
