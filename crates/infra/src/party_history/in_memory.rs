use std::sync::RwLock;

use facturx_invoicing::{Party, PartyRole};

use super::{HistoryBook, PartyHistory};
use crate::error::InfraError;

/// In-memory party history for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryPartyHistory {
    inner: RwLock<HistoryBook>,
}

impl InMemoryPartyHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PartyHistory for InMemoryPartyHistory {
    fn record(&self, role: PartyRole, party: &Party) -> Result<bool, InfraError> {
        let mut book = self
            .inner
            .write()
            .map_err(|_| InfraError::Poisoned("party history"))?;
        Ok(book.insert(role, party))
    }

    fn list(&self, role: PartyRole) -> Result<Vec<Party>, InfraError> {
        let book = self
            .inner
            .read()
            .map_err(|_| InfraError::Poisoned("party history"))?;
        Ok(book.list(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_in_insertion_order() {
        let history = InMemoryPartyHistory::new();
        let first = Party::new("First GmbH", vec!["A 1".into()]);
        let second = Party::new("Second AG", vec!["B 2".into()]);
        history.record(PartyRole::Buyer, &first).unwrap();
        history.record(PartyRole::Buyer, &second).unwrap();
        history.record(PartyRole::Buyer, &first).unwrap();

        assert_eq!(history.list(PartyRole::Buyer).unwrap(), vec![first, second]);
        assert!(history.list(PartyRole::Seller).unwrap().is_empty());
    }
}
