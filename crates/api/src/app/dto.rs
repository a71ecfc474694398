use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use facturx_core::{DomainResult, InvoiceError};
use facturx_invoicing::{
    FinalizedInvoice, InvoiceDraft, InvoiceNumber, InvoiceTotals, LineItem, LineOverrides, Party,
    PaymentDetails, ServicePeriod, UnitCode, ValidationWarning,
};

/// VAT percent applied when an item does not name one.
pub const DEFAULT_VAT_PERCENT: Decimal = Decimal::from_parts(19, 0, 0, false, 0);

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct InvoiceRequest {
    /// Invoice number; the next free number is used when absent.
    pub id: Option<String>,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub service_period: Option<ServicePeriod>,
    pub subject: Option<String>,
    pub currency: Option<String>,
    pub payment: Option<PaymentDetails>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub seller: PartyRequest,
    #[serde(default)]
    pub buyer: PartyRequest,
    #[serde(default)]
    pub items: Vec<LineItemRequest>,
}

/// Party as sent by clients. Missing fields are left empty so validation can
/// name what is missing.
///
/// `address_block` is a pasted multi-line block (name first, then address);
/// it fills `name` and `address_lines` when those are blank.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PartyRequest {
    pub name: String,
    pub address_lines: Vec<String>,
    pub address_block: Option<String>,
    pub tax_id: Option<String>,
    pub customer_id: Option<String>,
    pub purchase_order_id: Option<String>,
    pub project_id: Option<String>,
    pub country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LineItemRequest {
    pub name: String,
    pub qty: Decimal,
    pub price: Decimal,
    pub vat_percent: Option<Decimal>,
    pub unit_code: Option<String>,
    pub total: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub gross: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct NextNumberQuery {
    pub year: Option<i32>,
}

impl InvoiceRequest {
    /// Explicit invoice number, if the client sent a non-blank one.
    pub fn explicit_number(&self) -> Option<InvoiceNumber> {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(InvoiceNumber::new)
    }

    /// Build a draft numbered `number`. Line-level rules are enforced here.
    pub fn into_draft(self, number: InvoiceNumber) -> DomainResult<InvoiceDraft> {
        let mut draft = InvoiceDraft::new(number, self.issue_date);
        if let Some(currency) = self.currency {
            draft.set_currency(currency);
        }
        draft.set_seller(self.seller.into());
        draft.set_buyer(self.buyer.into());
        draft.set_due_date(self.due_date);
        draft.set_service_period(self.service_period);
        draft.set_subject(self.subject.filter(|s| !s.trim().is_empty()));
        draft.set_payment(self.payment.filter(|p| !p.is_empty()));
        for note in self.notes {
            draft.add_note(note);
        }
        for (idx, item) in self.items.into_iter().enumerate() {
            let line = item.into_line().map_err(|err| at_line(err, idx + 1))?;
            draft.add_line(line);
        }
        Ok(draft)
    }
}

impl From<PartyRequest> for Party {
    fn from(req: PartyRequest) -> Self {
        let block = req
            .address_block
            .as_deref()
            .map(Party::from_address_block)
            .unwrap_or_default();
        let name = match req.name.trim() {
            "" => block.name,
            name => name.to_string(),
        };
        let mut address_lines: Vec<String> = req
            .address_lines
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        if address_lines.is_empty() {
            address_lines = block.address_lines;
        }

        Party {
            name,
            address_lines,
            tax_id: non_blank(req.tax_id),
            customer_id: non_blank(req.customer_id),
            purchase_order_id: non_blank(req.purchase_order_id),
            project_id: non_blank(req.project_id),
            country_code: non_blank(req.country_code).map(|c| c.to_ascii_uppercase()),
        }
    }
}

impl LineItemRequest {
    pub fn into_line(self) -> DomainResult<LineItem> {
        let vat_percent = self.vat_percent.unwrap_or(DEFAULT_VAT_PERCENT);
        let unit_code = match non_blank(self.unit_code) {
            Some(code) => code.parse::<UnitCode>()?,
            None => UnitCode::default(),
        };
        let overrides = LineOverrides {
            total: self.total,
            tax: self.tax,
            gross: self.gross,
        };
        LineItem::new(self.name, self.qty, self.price, vat_percent)?
            .with_unit_code(unit_code)
            .with_overrides(overrides)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Prefix the message with the 1-based item position.
fn at_line(err: InvoiceError, line_no: usize) -> InvoiceError {
    let at = |m: String| format!("item {line_no}: {m}");
    match err {
        InvoiceError::InvalidQuantity(m) => InvoiceError::InvalidQuantity(at(m)),
        InvoiceError::InvalidAmount(m) => InvoiceError::InvalidAmount(at(m)),
        InvoiceError::InvalidTaxRate(m) => InvoiceError::InvalidTaxRate(at(m)),
        InvoiceError::InvalidUnitCode(m) => InvoiceError::InvalidUnitCode(at(m)),
        InvoiceError::InvalidLineItem(m) => InvoiceError::InvalidLineItem(at(m)),
        other => other,
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct NextNumberResponse {
    pub invoice_number: InvoiceNumber,
}

/// Computed invoice model: lines keep their computed/overridden tags.
#[derive(Debug, Serialize)]
pub struct ComputedInvoiceResponse<'a> {
    pub invoice_number: &'a InvoiceNumber,
    pub issue_date: NaiveDate,
    pub currency: &'a str,
    pub lines: &'a [LineItem],
    pub totals: &'a InvoiceTotals,
    pub warnings: Vec<WarningResponse>,
}

#[derive(Debug, Serialize)]
pub struct WarningResponse {
    pub kind: &'static str,
    pub message: String,
}

impl From<&ValidationWarning> for WarningResponse {
    fn from(warning: &ValidationWarning) -> Self {
        Self {
            kind: warning.kind(),
            message: warning.message(),
        }
    }
}

pub fn computed_response<'a>(
    draft: &'a InvoiceDraft,
    invoice: &'a FinalizedInvoice,
) -> ComputedInvoiceResponse<'a> {
    ComputedInvoiceResponse {
        invoice_number: invoice.number(),
        issue_date: invoice.issue_date(),
        currency: invoice.currency().as_str(),
        lines: draft.lines(),
        totals: invoice.totals(),
        warnings: invoice.warnings().iter().map(WarningResponse::from).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(items: serde_json::Value) -> InvoiceRequest {
        serde_json::from_value(json!({
            "issue_date": "2026-01-15",
            "seller": { "name": " My Company GmbH ", "address_lines": ["Musterstr. 1", " "] },
            "buyer": {
                "name": "Client Corp",
                "address_lines": ["Main St 5"],
                "country_code": "fr"
            },
            "items": items,
        }))
        .unwrap()
    }

    #[test]
    fn defaults_vat_and_unit_code() {
        let draft = request(json!([{ "name": "Consulting", "qty": 10, "price": "120.00" }]))
            .into_draft(InvoiceNumber::new("INV-2026-001"))
            .unwrap();
        let line = &draft.lines()[0];
        assert_eq!(line.vat_percent(), Decimal::from(19));
        assert_eq!(line.unit_code(), UnitCode::default());
        assert_eq!(draft.currency(), "EUR");
    }

    #[test]
    fn parties_are_trimmed_and_normalized() {
        let draft = request(json!([{ "name": "X", "qty": 1, "price": 1 }]))
            .into_draft(InvoiceNumber::new("INV-2026-001"))
            .unwrap();
        let seller = draft.seller().unwrap();
        assert_eq!(seller.name, "My Company GmbH");
        assert_eq!(seller.address_lines, vec!["Musterstr. 1"]);
        assert_eq!(draft.buyer().unwrap().country_code(), "FR");
    }

    #[test]
    fn overrides_are_carried_onto_the_line() {
        let draft = request(json!([
            { "name": "Flat fee", "qty": 1, "price": 100, "vat_percent": 19, "tax": "20" }
        ]))
        .into_draft(InvoiceNumber::new("INV-2026-001"))
        .unwrap();
        let line = &draft.lines()[0];
        assert_eq!(line.tax_amount(), Decimal::from(20));
        assert!(line.amounts().tax_amount.is_overridden());
        assert_eq!(line.gross_amount(), Decimal::from(120));
    }

    #[test]
    fn line_errors_name_the_item() {
        let err = request(json!([
            { "name": "Ok", "qty": 1, "price": 1 },
            { "name": "Broken", "qty": 0, "price": 1 }
        ]))
        .into_draft(InvoiceNumber::new("INV-2026-001"))
        .unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidQuantity(ref m) if m.starts_with("item 2:")));
    }

    #[test]
    fn unknown_unit_code_is_rejected() {
        let item = json!({ "name": "X", "qty": 1, "price": 1, "unit_code": "BOX" });
        let err = request(json!([item]))
            .into_draft(InvoiceNumber::new("INV-2026-001"))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_unit_code");
    }

    #[test]
    fn address_block_fills_blank_party_fields() {
        let req: PartyRequest = serde_json::from_value(json!({
            "address_block": "Client Corp\n\nMain St 5\n10115 Berlin\n",
            "country_code": "de"
        }))
        .unwrap();
        let party = Party::from(req);
        assert_eq!(party.name, "Client Corp");
        assert_eq!(party.address_lines, vec!["Main St 5", "10115 Berlin"]);
        assert_eq!(party.country_code(), "DE");
    }

    #[test]
    fn explicit_party_fields_win_over_the_block() {
        let req: PartyRequest = serde_json::from_value(json!({
            "name": "Client Corp SARL",
            "address_block": "Client Corp\nMain St 5"
        }))
        .unwrap();
        let party = Party::from(req);
        assert_eq!(party.name, "Client Corp SARL");
        assert_eq!(party.address_lines, vec!["Main St 5"]);
    }

    #[test]
    fn missing_parties_become_empty_for_validation() {
        let req: InvoiceRequest = serde_json::from_value(json!({
            "issue_date": "2026-01-15",
            "seller": { "name": "My Company GmbH", "address_lines": ["Musterstr. 1"] },
            "items": [{ "name": "X", "qty": 1, "price": 1 }]
        }))
        .unwrap();
        let draft = req.into_draft(InvoiceNumber::new("INV-2026-001")).unwrap();
        assert_eq!(draft.buyer().unwrap().name, "");
    }

    #[test]
    fn blank_id_means_no_explicit_number() {
        let mut req = request(json!([]));
        req.id = Some("  ".into());
        assert_eq!(req.explicit_number(), None);
        req.id = Some("RE-7".into());
        assert_eq!(req.explicit_number(), Some(InvoiceNumber::new("RE-7")));
    }
}
