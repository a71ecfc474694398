use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use facturx_core::{AggregateRoot, CurrencyCode, DomainResult, InvoiceError};

use crate::line_item::{LineItem, UnitCode};
use crate::numbering::{next_invoice_number, InvoiceNumber};
use crate::party::Party;
use crate::totals::{aggregate, InvoiceTotals};
use crate::validation::{validate, FutureDatePolicy, ValidationReport, ValidationWarning};

/// Service / delivery period (Leistungszeitraum).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Structured bank details for the payment means section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bic: Option<String>,
}

impl PaymentDetails {
    pub fn is_empty(&self) -> bool {
        [&self.bank_name, &self.iban, &self.bic]
            .iter()
            .all(|v| v.as_deref().is_none_or(|s| s.trim().is_empty()))
    }
}

/// Aggregate root: an invoice being edited.
///
/// Owns its lines and party snapshots. Every accepted mutation bumps the
/// version; rejected mutations leave the draft untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDraft {
    number: InvoiceNumber,
    issue_date: NaiveDate,
    currency: String,
    seller: Option<Party>,
    buyer: Option<Party>,
    lines: Vec<LineItem>,
    due_date: Option<NaiveDate>,
    service_period: Option<ServicePeriod>,
    subject: Option<String>,
    payment: Option<PaymentDetails>,
    notes: Vec<String>,
    version: u64,
}

impl InvoiceDraft {
    pub fn new(number: InvoiceNumber, issue_date: NaiveDate) -> Self {
        Self {
            number,
            issue_date,
            currency: CurrencyCode::euro().to_string(),
            seller: None,
            buyer: None,
            lines: Vec::new(),
            due_date: None,
            service_period: None,
            subject: None,
            payment: None,
            notes: Vec::new(),
            version: 0,
        }
    }

    /// Empty draft dated `today`, numbered after the last sequence used this year.
    pub fn with_defaults(today: NaiveDate, last_sequence_for_year: u32) -> DomainResult<Self> {
        let number = next_invoice_number(today.year(), last_sequence_for_year)?;
        Ok(Self::new(number, today))
    }

    pub fn number(&self) -> &InvoiceNumber {
        &self.number
    }

    pub fn issue_date(&self) -> NaiveDate {
        self.issue_date
    }

    /// Raw currency as entered; checked by validation.
    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn seller(&self) -> Option<&Party> {
        self.seller.as_ref()
    }

    pub fn buyer(&self) -> Option<&Party> {
        self.buyer.as_ref()
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn service_period(&self) -> Option<ServicePeriod> {
        self.service_period
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn payment(&self) -> Option<&PaymentDetails> {
        self.payment.as_ref()
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn set_number(&mut self, number: InvoiceNumber) {
        self.number = number;
        self.touch();
    }

    pub fn set_issue_date(&mut self, issue_date: NaiveDate) {
        self.issue_date = issue_date;
        self.touch();
    }

    pub fn set_currency(&mut self, currency: impl Into<String>) {
        self.currency = currency.into();
        self.touch();
    }

    pub fn set_seller(&mut self, seller: Party) {
        self.seller = Some(seller);
        self.touch();
    }

    pub fn set_buyer(&mut self, buyer: Party) {
        self.buyer = Some(buyer);
        self.touch();
    }

    pub fn set_due_date(&mut self, due_date: Option<NaiveDate>) {
        self.due_date = due_date;
        self.touch();
    }

    pub fn set_service_period(&mut self, period: Option<ServicePeriod>) {
        self.service_period = period;
        self.touch();
    }

    pub fn set_subject(&mut self, subject: Option<String>) {
        self.subject = subject.filter(|s| !s.trim().is_empty());
        self.touch();
    }

    pub fn set_payment(&mut self, payment: Option<PaymentDetails>) {
        self.payment = payment.filter(|p| !p.is_empty());
        self.touch();
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
        self.touch();
    }

    /// Append a line; returns its 1-based line number.
    pub fn add_line(&mut self, line: LineItem) -> usize {
        self.lines.push(line);
        self.touch();
        self.lines.len()
    }

    /// Edit the line at `line_no` (1-based) in place.
    ///
    /// The edit runs on a copy and is only committed when it succeeds.
    pub fn edit_line<F>(&mut self, line_no: usize, edit: F) -> DomainResult<()>
    where
        F: FnOnce(&mut LineItem) -> DomainResult<()>,
    {
        let idx = self.line_index(line_no)?;
        let mut line = self.lines[idx].clone();
        edit(&mut line)?;
        self.lines[idx] = line;
        self.touch();
        Ok(())
    }

    pub fn remove_line(&mut self, line_no: usize) -> DomainResult<LineItem> {
        let idx = self.line_index(line_no)?;
        let removed = self.lines.remove(idx);
        self.touch();
        Ok(removed)
    }

    /// Totals over the current lines.
    pub fn totals(&self) -> DomainResult<InvoiceTotals> {
        aggregate(&self.lines)
    }

    pub fn validate(
        &self,
        today: NaiveDate,
        policy: FutureDatePolicy,
    ) -> DomainResult<ValidationReport> {
        validate(self, today, policy)
    }

    /// Validate, aggregate and freeze the draft into a serialization-ready view.
    ///
    /// The draft itself is left as it was; the finalized invoice is a copy.
    pub fn finalize(
        &self,
        today: NaiveDate,
        policy: FutureDatePolicy,
    ) -> DomainResult<FinalizedInvoice> {
        let report = self.validate(today, policy)?;
        let totals = self.totals()?;
        let currency = CurrencyCode::parse(&self.currency)?;
        let (seller, buyer) = match (&self.seller, &self.buyer) {
            (Some(s), Some(b)) => (s.clone(), b.clone()),
            _ => return Err(InvoiceError::missing_party_field("seller and buyer are required")),
        };

        let lines = self
            .lines
            .iter()
            .enumerate()
            .map(|(idx, line)| FinalizedLine {
                line_no: idx + 1,
                name: line.name().to_string(),
                quantity: line.quantity(),
                unit_price: line.unit_price(),
                vat_percent: line.vat_percent(),
                unit_code: line.unit_code(),
                line_total: line.line_total(),
                tax_amount: line.tax_amount(),
                gross_amount: line.gross_amount(),
            })
            .collect();

        Ok(FinalizedInvoice {
            number: self.number.clone(),
            issue_date: self.issue_date,
            currency,
            seller,
            buyer,
            lines,
            totals,
            due_date: self.due_date,
            service_period: self.service_period,
            subject: self.subject.clone(),
            payment: self.payment.clone(),
            notes: self.notes.clone(),
            warnings: report.warnings,
            draft_version: self.version,
        })
    }

    fn line_index(&self, line_no: usize) -> DomainResult<usize> {
        if line_no == 0 || line_no > self.lines.len() {
            return Err(InvoiceError::LineNotFound(line_no));
        }
        Ok(line_no - 1)
    }

    fn touch(&mut self) {
        self.version += 1;
    }
}

impl AggregateRoot for InvoiceDraft {
    type Id = InvoiceNumber;

    fn id(&self) -> &Self::Id {
        &self.number
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// A line with every amount resolved to a plain value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalizedLine {
    pub line_no: usize,
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub vat_percent: Decimal,
    pub unit_code: UnitCode,
    pub line_total: Decimal,
    pub tax_amount: Decimal,
    pub gross_amount: Decimal,
}

/// Read-only, serialization-ready invoice.
///
/// Produced by [`InvoiceDraft::finalize`]; never mutated afterwards. Editing a
/// generated invoice goes through [`FinalizedInvoice::reopen`], which yields a
/// fresh draft and leaves this record as the trace of what was generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalizedInvoice {
    number: InvoiceNumber,
    issue_date: NaiveDate,
    currency: CurrencyCode,
    seller: Party,
    buyer: Party,
    lines: Vec<FinalizedLine>,
    totals: InvoiceTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service_period: Option<ServicePeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment: Option<PaymentDetails>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    notes: Vec<String>,
    warnings: Vec<ValidationWarning>,
    draft_version: u64,
}

impl FinalizedInvoice {
    pub fn number(&self) -> &InvoiceNumber {
        &self.number
    }

    pub fn issue_date(&self) -> NaiveDate {
        self.issue_date
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn seller(&self) -> &Party {
        &self.seller
    }

    pub fn buyer(&self) -> &Party {
        &self.buyer
    }

    pub fn lines(&self) -> &[FinalizedLine] {
        &self.lines
    }

    pub fn totals(&self) -> &InvoiceTotals {
        &self.totals
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn service_period(&self) -> Option<ServicePeriod> {
        self.service_period
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn payment(&self) -> Option<&PaymentDetails> {
        self.payment.as_ref()
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }

    /// Version of the draft this invoice was produced from.
    pub fn draft_version(&self) -> u64 {
        self.draft_version
    }

    /// Start a new draft from this invoice.
    ///
    /// Lines whose resolved amounts differ from what their inputs compute come
    /// back with the matching overrides set.
    pub fn reopen(&self) -> DomainResult<InvoiceDraft> {
        let lines = self
            .lines
            .iter()
            .map(|l| {
                LineItem::restore(
                    &l.name,
                    l.quantity,
                    l.unit_price,
                    l.vat_percent,
                    l.unit_code,
                    [l.line_total, l.tax_amount, l.gross_amount],
                )
            })
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(InvoiceDraft {
            number: self.number.clone(),
            issue_date: self.issue_date,
            currency: self.currency.to_string(),
            seller: Some(self.seller.clone()),
            buyer: Some(self.buyer.clone()),
            lines,
            due_date: self.due_date,
            service_period: self.service_period,
            subject: self.subject.clone(),
            payment: self.payment.clone(),
            notes: self.notes.clone(),
            version: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_item::DerivedField;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2026, 5, 4)
    }

    fn draft() -> InvoiceDraft {
        let mut draft = InvoiceDraft::with_defaults(today(), 0).unwrap();
        draft.set_seller(
            Party::new("My Company GmbH", vec!["Musterstr. 1".into(), "10115 Berlin".into()])
                .with_tax_id("DE123456789"),
        );
        draft.set_buyer(
            Party::new("Client Corp", vec!["Main St 5".into()]).with_customer_id("C-42"),
        );
        draft.add_line(
            LineItem::new("Consulting Services", dec!(10), dec!(120.0), dec!(19)).unwrap(),
        );
        draft
    }

    #[test]
    fn defaults_use_today_and_next_number() {
        let draft = InvoiceDraft::with_defaults(today(), 7).unwrap();
        assert_eq!(draft.number().as_str(), "INV-2026-008");
        assert_eq!(draft.issue_date(), today());
        assert_eq!(draft.currency(), "EUR");
        assert!(draft.lines().is_empty());
        assert_eq!(draft.version(), 0);
    }

    #[test]
    fn end_to_end_single_line() {
        let invoice = draft().finalize(today(), FutureDatePolicy::Warn).unwrap();
        assert_eq!(invoice.number().as_str(), "INV-2026-001");
        assert_eq!(invoice.lines()[0].line_total, dec!(1200.00));
        assert_eq!(invoice.lines()[0].tax_amount, dec!(228.00));
        assert_eq!(invoice.lines()[0].gross_amount, dec!(1428.00));
        assert_eq!(invoice.totals().net_total, dec!(1200.00));
        assert_eq!(invoice.totals().tax_total, dec!(228.00));
        assert_eq!(invoice.totals().gross_total, dec!(1428.00));
        assert!(invoice.warnings().is_empty());
    }

    #[test]
    fn mutations_bump_version_and_failures_do_not() {
        let mut draft = draft();
        let before = draft.version();

        draft.edit_line(1, |l| l.set_quantity(dec!(2))).unwrap();
        assert_eq!(draft.version(), before + 1);

        let err = draft.edit_line(1, |l| l.set_quantity(dec!(0))).unwrap_err();
        assert_eq!(err.kind(), "invalid_quantity");
        assert_eq!(draft.version(), before + 1);
        assert_eq!(draft.lines()[0].quantity(), dec!(2));

        assert_eq!(draft.remove_line(5).unwrap_err(), InvoiceError::LineNotFound(5));
        assert_eq!(draft.edit_line(0, |_| Ok(())).unwrap_err(), InvoiceError::LineNotFound(0));
    }

    #[test]
    fn finalize_records_draft_version() {
        let draft = draft();
        let invoice = draft.finalize(today(), FutureDatePolicy::Warn).unwrap();
        assert_eq!(invoice.draft_version(), draft.version());
    }

    #[test]
    fn finalize_refuses_invalid_drafts() {
        let mut draft = draft();
        draft.remove_line(1).unwrap();
        let err = draft.finalize(today(), FutureDatePolicy::Warn).unwrap_err();
        assert_eq!(err, InvoiceError::EmptyInvoice);
    }

    #[test]
    fn finalize_carries_warnings() {
        let mut draft = draft();
        draft.set_issue_date(date(2028, 1, 1));
        let invoice = draft.finalize(today(), FutureDatePolicy::Warn).unwrap();
        assert_eq!(invoice.warnings().len(), 1);
    }

    #[test]
    fn finalized_copy_is_independent_of_later_edits() {
        let mut draft = draft();
        let invoice = draft.finalize(today(), FutureDatePolicy::Warn).unwrap();

        draft.set_seller(Party::new("Renamed GmbH", vec!["Elsewhere 1".into()]));
        draft.edit_line(1, |l| l.set_unit_price(dec!(1))).unwrap();

        assert_eq!(invoice.seller().name, "My Company GmbH");
        assert_eq!(invoice.totals().net_total, dec!(1200.00));
    }

    #[test]
    fn reopen_recovers_overrides() {
        let mut draft = draft();
        draft.edit_line(1, |l| l.set_override(DerivedField::Total, dec!(1000))).unwrap();
        draft.set_due_date(Some(date(2026, 5, 18)));
        let invoice = draft.finalize(today(), FutureDatePolicy::Warn).unwrap();

        let reopened = invoice.reopen().unwrap();
        assert_eq!(reopened.version(), 0);
        assert_eq!(reopened.due_date(), Some(date(2026, 5, 18)));
        let line = &reopened.lines()[0];
        assert!(line.amounts().line_total.is_overridden());
        assert!(!line.amounts().tax_amount.is_overridden());
        assert_eq!(line.tax_amount(), dec!(190.00));

        let again = reopened.finalize(today(), FutureDatePolicy::Warn).unwrap();
        assert_eq!(again.totals(), invoice.totals());
    }

    #[test]
    fn empty_payment_details_are_dropped() {
        let mut draft = draft();
        draft.set_payment(Some(PaymentDetails {
            bank_name: Some(" ".into()),
            ..PaymentDetails::default()
        }));
        assert!(draft.payment().is_none());

        draft.set_payment(Some(PaymentDetails {
            iban: Some("DE89370400440532013000".into()),
            ..PaymentDetails::default()
        }));
        assert!(draft.payment().is_some());
    }

    #[test]
    fn serializes_resolved_view() {
        let invoice = draft().finalize(today(), FutureDatePolicy::Warn).unwrap();
        let json = serde_json::to_value(&invoice).unwrap();
        assert_eq!(json["number"], "INV-2026-001");
        assert_eq!(json["currency"], "EUR");
        assert_eq!(json["issue_date"], "2026-05-04");
        assert_eq!(json["totals"]["gross_total"], "1428.00");
        assert_eq!(json["lines"][0]["line_total"], "1200.00");
        assert!(json.get("due_date").is_none());
    }
}
