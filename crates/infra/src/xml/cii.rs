//! UN/CEFACT Cross Industry Invoice (CII) in the Factur-X EN 16931 profile.

use chrono::NaiveDate;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use rust_decimal::Decimal;

use facturx_invoicing::{FinalizedInvoice, FinalizedLine, Party, TaxSubtotal};

use super::InvoiceSerializer;
use crate::error::InfraError;

pub const GUIDELINE_ID: &str = "urn:cen.eu:en16931:2017#compliant#urn:factur-x.eu:1p0:en16931";
/// UNTDID 1001: commercial invoice.
pub const INVOICE_TYPE_CODE: &str = "380";
/// UNTDID 4461: SEPA credit transfer.
const PAYMENT_MEANS_CREDIT_TRANSFER: &str = "58";
const MAX_ADDRESS_LINES: usize = 3;

const NAMESPACES: [(&str, &str); 4] = [
    (
        "xmlns:rsm",
        "urn:un:unece:uncefact:data:standard:CrossIndustryInvoice:100",
    ),
    (
        "xmlns:ram",
        "urn:un:unece:uncefact:data:standard:ReusableAggregateBusinessInformationEntity:100",
    ),
    (
        "xmlns:qdt",
        "urn:un:unece:uncefact:data:standard:QualifiedDataType:100",
    ),
    (
        "xmlns:udt",
        "urn:un:unece:uncefact:data:standard:UnqualifiedDataType:100",
    ),
];

/// Writes `factur-x.xml` documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct CiiXmlSerializer;

impl CiiXmlSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl InvoiceSerializer for CiiXmlSerializer {
    fn media_type(&self) -> &'static str {
        "application/xml"
    }

    fn file_name(&self) -> &'static str {
        "factur-x.xml"
    }

    fn serialize(&self, invoice: &FinalizedInvoice) -> Result<Vec<u8>, InfraError> {
        let mut doc = CiiWriter::new();
        doc.declaration()?;
        doc.start_with("rsm:CrossIndustryInvoice", &NAMESPACES)?;

        doc.start("rsm:ExchangedDocumentContext")?;
        doc.start("ram:GuidelineSpecifiedDocumentContextParameter")?;
        doc.text("ram:ID", GUIDELINE_ID)?;
        doc.end("ram:GuidelineSpecifiedDocumentContextParameter")?;
        doc.end("rsm:ExchangedDocumentContext")?;

        write_header(&mut doc, invoice)?;

        doc.start("rsm:SupplyChainTradeTransaction")?;
        for line in invoice.lines() {
            write_line(&mut doc, line)?;
        }
        write_agreement(&mut doc, invoice)?;
        doc.start("ram:ApplicableHeaderTradeDelivery")?;
        doc.end("ram:ApplicableHeaderTradeDelivery")?;
        write_settlement(&mut doc, invoice)?;
        doc.end("rsm:SupplyChainTradeTransaction")?;

        doc.end("rsm:CrossIndustryInvoice")?;
        Ok(doc.finish())
    }
}

fn write_header(doc: &mut CiiWriter, invoice: &FinalizedInvoice) -> Result<(), InfraError> {
    doc.start("rsm:ExchangedDocument")?;
    doc.text("ram:ID", invoice.number().as_str())?;
    doc.text("ram:TypeCode", INVOICE_TYPE_CODE)?;
    doc.date("ram:IssueDateTime", invoice.issue_date())?;
    let notes = invoice
        .subject()
        .into_iter()
        .chain(invoice.notes().iter().map(String::as_str))
        .filter(|n| !n.trim().is_empty());
    for note in notes {
        doc.start("ram:IncludedNote")?;
        doc.text("ram:Content", note)?;
        doc.end("ram:IncludedNote")?;
    }
    doc.end("rsm:ExchangedDocument")
}

fn write_line(doc: &mut CiiWriter, line: &FinalizedLine) -> Result<(), InfraError> {
    doc.start("ram:IncludedSupplyChainTradeLineItem")?;

    doc.start("ram:AssociatedDocumentLineDocument")?;
    doc.text("ram:LineID", &line.line_no.to_string())?;
    doc.end("ram:AssociatedDocumentLineDocument")?;

    doc.start("ram:SpecifiedTradeProduct")?;
    doc.text("ram:Name", &line.name)?;
    doc.end("ram:SpecifiedTradeProduct")?;

    doc.start("ram:SpecifiedLineTradeAgreement")?;
    doc.start("ram:NetPriceProductTradePrice")?;
    doc.text("ram:ChargeAmount", &plain(line.unit_price))?;
    doc.end("ram:NetPriceProductTradePrice")?;
    doc.end("ram:SpecifiedLineTradeAgreement")?;

    doc.start("ram:SpecifiedLineTradeDelivery")?;
    doc.text_with(
        "ram:BilledQuantity",
        &[("unitCode", line.unit_code.code())],
        &plain(line.quantity),
    )?;
    doc.end("ram:SpecifiedLineTradeDelivery")?;

    doc.start("ram:SpecifiedLineTradeSettlement")?;
    doc.start("ram:ApplicableTradeTax")?;
    doc.text("ram:TypeCode", "VAT")?;
    doc.text("ram:CategoryCode", tax_category(line.vat_percent))?;
    doc.text("ram:RateApplicablePercent", &plain(line.vat_percent))?;
    doc.end("ram:ApplicableTradeTax")?;
    doc.start("ram:SpecifiedTradeSettlementLineMonetarySummation")?;
    doc.text("ram:LineTotalAmount", &money(line.line_total))?;
    doc.end("ram:SpecifiedTradeSettlementLineMonetarySummation")?;
    doc.end("ram:SpecifiedLineTradeSettlement")?;

    doc.end("ram:IncludedSupplyChainTradeLineItem")
}

fn write_agreement(doc: &mut CiiWriter, invoice: &FinalizedInvoice) -> Result<(), InfraError> {
    let buyer = invoice.buyer();
    doc.start("ram:ApplicableHeaderTradeAgreement")?;
    if let Some(reference) = non_blank(buyer.customer_id.as_deref()) {
        doc.text("ram:BuyerReference", reference)?;
    }
    write_party(doc, "ram:SellerTradeParty", invoice.seller())?;
    write_party(doc, "ram:BuyerTradeParty", buyer)?;
    if let Some(order) = non_blank(buyer.purchase_order_id.as_deref()) {
        doc.start("ram:BuyerOrderReferencedDocument")?;
        doc.text("ram:IssuerAssignedID", order)?;
        doc.end("ram:BuyerOrderReferencedDocument")?;
    }
    if let Some(project) = non_blank(buyer.project_id.as_deref()) {
        doc.start("ram:SpecifiedProcuringProject")?;
        doc.text("ram:ID", project)?;
        doc.text("ram:Name", "Project")?;
        doc.end("ram:SpecifiedProcuringProject")?;
    }
    doc.end("ram:ApplicableHeaderTradeAgreement")
}

fn write_party(doc: &mut CiiWriter, element: &str, party: &Party) -> Result<(), InfraError> {
    doc.start(element)?;
    doc.text("ram:Name", party.name.trim())?;

    doc.start("ram:PostalTradeAddress")?;
    let lines: Vec<&str> = party
        .address_lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    for (tag, line) in ["ram:LineOne", "ram:LineTwo", "ram:LineThree"]
        .into_iter()
        .zip(address_slots(&lines))
    {
        doc.text(tag, &line)?;
    }
    doc.text("ram:CountryID", party.country_code())?;
    doc.end("ram:PostalTradeAddress")?;

    if let Some(tax_id) = non_blank(party.tax_id.as_deref()) {
        doc.start("ram:SpecifiedTaxRegistration")?;
        doc.text_with("ram:ID", &[("schemeID", "VA")], tax_id)?;
        doc.end("ram:SpecifiedTaxRegistration")?;
    }
    doc.end(element)
}

/// CII has three address line slots; overflow lines are folded into the last one.
fn address_slots(lines: &[&str]) -> Vec<String> {
    if lines.len() <= MAX_ADDRESS_LINES {
        return lines.iter().map(|l| l.to_string()).collect();
    }
    let mut slots: Vec<String> = lines[..MAX_ADDRESS_LINES - 1]
        .iter()
        .map(|l| l.to_string())
        .collect();
    slots.push(lines[MAX_ADDRESS_LINES - 1..].join(", "));
    slots
}

fn write_settlement(doc: &mut CiiWriter, invoice: &FinalizedInvoice) -> Result<(), InfraError> {
    let currency = invoice.currency().as_str();
    let totals = invoice.totals();

    doc.start("ram:ApplicableHeaderTradeSettlement")?;
    doc.text("ram:InvoiceCurrencyCode", currency)?;

    if let Some(payment) = invoice.payment().filter(|p| !p.is_empty()) {
        doc.start("ram:SpecifiedTradeSettlementPaymentMeans")?;
        doc.text("ram:TypeCode", PAYMENT_MEANS_CREDIT_TRANSFER)?;
        if let Some(iban) = non_blank(payment.iban.as_deref()) {
            doc.start("ram:PayeePartyCreditorFinancialAccount")?;
            doc.text("ram:IBANID", &compact(iban))?;
            doc.end("ram:PayeePartyCreditorFinancialAccount")?;
        }
        if let Some(bic) = non_blank(payment.bic.as_deref()) {
            doc.start("ram:PayeeSpecifiedCreditorFinancialInstitution")?;
            doc.text("ram:BICID", &compact(bic))?;
            doc.end("ram:PayeeSpecifiedCreditorFinancialInstitution")?;
        }
        doc.end("ram:SpecifiedTradeSettlementPaymentMeans")?;
    }

    for subtotal in &totals.tax_breakdown {
        write_tax_subtotal(doc, subtotal)?;
    }

    if let Some(period) = invoice.service_period() {
        doc.start("ram:BillingSpecifiedPeriod")?;
        doc.date("ram:StartDateTime", period.start)?;
        doc.date("ram:EndDateTime", period.end)?;
        doc.end("ram:BillingSpecifiedPeriod")?;
    }

    if let Some(due_date) = invoice.due_date() {
        doc.start("ram:SpecifiedTradePaymentTerms")?;
        doc.date("ram:DueDateDateTime", due_date)?;
        doc.end("ram:SpecifiedTradePaymentTerms")?;
    }

    doc.start("ram:SpecifiedTradeSettlementHeaderMonetarySummation")?;
    doc.text("ram:LineTotalAmount", &money(totals.net_total))?;
    doc.text("ram:ChargeTotalAmount", &money(Decimal::ZERO))?;
    doc.text("ram:AllowanceTotalAmount", &money(Decimal::ZERO))?;
    doc.text("ram:TaxBasisTotalAmount", &money(totals.net_total))?;
    doc.text_with(
        "ram:TaxTotalAmount",
        &[("currencyID", currency)],
        &money(totals.tax_total),
    )?;
    doc.text("ram:GrandTotalAmount", &money(totals.gross_total))?;
    doc.text("ram:DuePayableAmount", &money(totals.gross_total))?;
    doc.end("ram:SpecifiedTradeSettlementHeaderMonetarySummation")?;

    doc.end("ram:ApplicableHeaderTradeSettlement")
}

fn write_tax_subtotal(doc: &mut CiiWriter, subtotal: &TaxSubtotal) -> Result<(), InfraError> {
    doc.start("ram:ApplicableTradeTax")?;
    doc.text("ram:CalculatedAmount", &money(subtotal.tax_amount))?;
    doc.text("ram:TypeCode", "VAT")?;
    doc.text("ram:BasisAmount", &money(subtotal.basis_amount))?;
    doc.text("ram:CategoryCode", tax_category(subtotal.vat_percent))?;
    doc.text("ram:RateApplicablePercent", &plain(subtotal.vat_percent))?;
    doc.end("ram:ApplicableTradeTax")
}

/// UNCL 5305: standard rate or zero rated.
fn tax_category(vat_percent: Decimal) -> &'static str {
    if vat_percent.is_zero() { "Z" } else { "S" }
}

fn money(value: Decimal) -> String {
    let mut value = value.round_dp(2);
    value.rescale(2);
    value.to_string()
}

fn plain(value: Decimal) -> String {
    value.normalize().to_string()
}

fn compact(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

struct CiiWriter {
    inner: Writer<Vec<u8>>,
}

impl CiiWriter {
    fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn declaration(&mut self) -> Result<(), InfraError> {
        self.inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(())
    }

    fn start(&mut self, name: &str) -> Result<(), InfraError> {
        self.start_with(name, &[])
    }

    fn start_with(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), InfraError> {
        let mut element = BytesStart::new(name);
        for &attribute in attributes {
            element.push_attribute(attribute);
        }
        self.inner.write_event(Event::Start(element))?;
        Ok(())
    }

    fn end(&mut self, name: &str) -> Result<(), InfraError> {
        self.inner.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn text(&mut self, name: &str, value: &str) -> Result<(), InfraError> {
        self.text_with(name, &[], value)
    }

    fn text_with(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        value: &str,
    ) -> Result<(), InfraError> {
        self.start_with(name, attributes)?;
        self.inner.write_event(Event::Text(BytesText::new(value)))?;
        self.end(name)
    }

    /// Date in UNTDID 2379 format 102 (`YYYYMMDD`).
    fn date(&mut self, name: &str, date: NaiveDate) -> Result<(), InfraError> {
        self.start(name)?;
        self.text_with(
            "udt:DateTimeString",
            &[("format", "102")],
            &date.format("%Y%m%d").to_string(),
        )?;
        self.end(name)
    }

    fn finish(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}
