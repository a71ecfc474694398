use serde::{Deserialize, Serialize};

use facturx_core::{DomainResult, InvoiceError};

/// Country code written for a party that carries none.
pub const DEFAULT_COUNTRY_CODE: &str = "DE";

/// Which side of the invoice a party is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Seller,
    Buyer,
}

impl PartyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyRole::Seller => "seller",
            PartyRole::Buyer => "buyer",
        }
    }
}

/// Seller or buyer snapshot.
///
/// An invoice owns its own copy of each party, so editing a reused party later
/// never changes an invoice that was already generated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    pub address_lines: Vec<String>,
    /// VAT id (USt-IdNr.).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    /// BT-13.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_order_id: Option<String>,
    /// BT-18.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// ISO 3166-1 alpha-2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

impl Party {
    pub fn new(name: impl Into<String>, address_lines: Vec<String>) -> Self {
        Self {
            name: name.into(),
            address_lines,
            ..Self::default()
        }
    }

    /// Parse a free-text block: first non-blank line is the name, the remaining
    /// non-blank lines are the address.
    pub fn from_address_block(text: &str) -> Self {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);
        let name = lines.next().unwrap_or_default();
        Self::new(name, lines.collect())
    }

    pub fn with_tax_id(mut self, tax_id: impl Into<String>) -> Self {
        self.tax_id = Some(tax_id.into());
        self
    }

    pub fn with_customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_purchase_order_id(mut self, id: impl Into<String>) -> Self {
        self.purchase_order_id = Some(id.into());
        self
    }

    pub fn with_project_id(mut self, id: impl Into<String>) -> Self {
        self.project_id = Some(id.into());
        self
    }

    pub fn with_country_code(mut self, code: impl Into<String>) -> Self {
        self.country_code = Some(code.into());
        self
    }

    pub fn country_code(&self) -> &str {
        self.country_code.as_deref().unwrap_or(DEFAULT_COUNTRY_CODE)
    }

    /// Name and address joined as one block; used to deduplicate party history.
    pub fn name_address(&self) -> String {
        core::iter::once(self.name.as_str())
            .chain(self.address_lines.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Invariant: non-blank name and at least one non-blank address line.
    pub fn ensure_complete(&self, role: PartyRole) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(InvoiceError::missing_party_field(format!(
                "{} name is empty",
                role.as_str()
            )));
        }
        if !self.address_lines.iter().any(|l| !l.trim().is_empty()) {
            return Err(InvoiceError::missing_party_field(format!(
                "{} needs at least one address line",
                role.as_str()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_block_splits_name_and_lines() {
        let party = Party::from_address_block("  My Company GmbH\n\nMusterstr. 1 \n12345 Berlin\n");
        assert_eq!(party.name, "My Company GmbH");
        assert_eq!(party.address_lines, vec!["Musterstr. 1", "12345 Berlin"]);
    }

    #[test]
    fn empty_block_yields_empty_party() {
        let party = Party::from_address_block(" \n \n");
        assert!(party.name.is_empty());
        assert!(party.address_lines.is_empty());
    }

    #[test]
    fn complete_party_passes() {
        let party = Party::new("Client Corp", vec!["Main St 5".into()]);
        assert!(party.ensure_complete(PartyRole::Buyer).is_ok());
    }

    #[test]
    fn blank_name_is_rejected_with_role() {
        let party = Party::new("   ", vec!["Main St 5".into()]);
        let err = party.ensure_complete(PartyRole::Buyer).unwrap_err();
        match err {
            InvoiceError::MissingPartyField(msg) if msg.contains("buyer name") => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn blank_address_lines_do_not_count() {
        let party = Party::new("Seller", vec!["  ".into()]);
        let err = party.ensure_complete(PartyRole::Seller).unwrap_err();
        assert_eq!(err.kind(), "missing_party_field");
    }

    #[test]
    fn country_defaults_to_germany() {
        let party = Party::new("A", vec!["B".into()]);
        assert_eq!(party.country_code(), "DE");
        assert_eq!(party.with_country_code("FR").country_code(), "FR");
    }

    #[test]
    fn optional_ids_are_skipped_when_absent() {
        let json = serde_json::to_value(Party::new("A", vec!["B".into()])).unwrap();
        assert!(json.get("tax_id").is_none());
        assert_eq!(json["address_lines"][0], "B");
    }
}
