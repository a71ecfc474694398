//! Previously used sellers and buyers, offered back for reuse.

pub mod file;
pub mod in_memory;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use facturx_invoicing::{Party, PartyRole};

use crate::error::InfraError;

pub use file::FilePartyHistory;
pub use in_memory::InMemoryPartyHistory;

/// Store of parties that appeared on generated invoices.
///
/// Entries are unique per role by name and address; the first recorded
/// version of a party is kept.
pub trait PartyHistory: Send + Sync {
    /// Returns `false` when an equal entry already existed.
    fn record(&self, role: PartyRole, party: &Party) -> Result<bool, InfraError>;

    /// Recorded parties in insertion order.
    fn list(&self, role: PartyRole) -> Result<Vec<Party>, InfraError>;
}

impl<H> PartyHistory for Arc<H>
where
    H: PartyHistory + ?Sized,
{
    fn record(&self, role: PartyRole, party: &Party) -> Result<bool, InfraError> {
        (**self).record(role, party)
    }

    fn list(&self, role: PartyRole) -> Result<Vec<Party>, InfraError> {
        (**self).list(role)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct HistoryBook {
    #[serde(default)]
    sellers: Vec<Party>,
    #[serde(default)]
    buyers: Vec<Party>,
}

impl HistoryBook {
    fn entries(&self, role: PartyRole) -> &Vec<Party> {
        match role {
            PartyRole::Seller => &self.sellers,
            PartyRole::Buyer => &self.buyers,
        }
    }

    pub(crate) fn list(&self, role: PartyRole) -> Vec<Party> {
        self.entries(role).clone()
    }

    pub(crate) fn insert(&mut self, role: PartyRole, party: &Party) -> bool {
        if party.name.trim().is_empty() {
            return false;
        }
        let key = party.name_address();
        let entries = match role {
            PartyRole::Seller => &mut self.sellers,
            PartyRole::Buyer => &mut self.buyers,
        };
        if entries.iter().any(|p| p.name_address() == key) {
            return false;
        }
        entries.push(party.clone());
        true
    }
}
