use std::path::{Path, PathBuf};
use std::sync::Mutex;

use facturx_invoicing::{Party, PartyRole};

use super::{HistoryBook, PartyHistory};
use crate::error::InfraError;
use crate::json_file::{load_or_default, write_atomically};

/// Party history persisted as `{"sellers": [...], "buyers": [...]}`.
#[derive(Debug)]
pub struct FilePartyHistory {
    path: PathBuf,
    inner: Mutex<HistoryBook>,
}

impl FilePartyHistory {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, InfraError> {
        let path = path.into();
        let book: HistoryBook = load_or_default(&path)?;
        Ok(Self {
            path,
            inner: Mutex::new(book),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PartyHistory for FilePartyHistory {
    fn record(&self, role: PartyRole, party: &Party) -> Result<bool, InfraError> {
        let mut book = self
            .inner
            .lock()
            .map_err(|_| InfraError::Poisoned("party history"))?;
        let mut updated = book.clone();
        if !updated.insert(role, party) {
            return Ok(false);
        }
        write_atomically(&self.path, &updated)?;
        *book = updated;
        Ok(true)
    }

    fn list(&self, role: PartyRole) -> Result<Vec<Party>, InfraError> {
        let book = self
            .inner
            .lock()
            .map_err(|_| InfraError::Poisoned("party history"))?;
        Ok(book.list(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_survives_reopen() {
        let path = std::env::temp_dir()
            .join(format!("facturx-history-{}", uuid::Uuid::now_v7()))
            .join("history.json");
        let seller =
            Party::new("My Company GmbH", vec!["Musterstr. 1".into()]).with_tax_id("DE123456789");

        {
            let history = FilePartyHistory::open(&path).unwrap();
            assert!(history.record(PartyRole::Seller, &seller).unwrap());
            assert!(!history.record(PartyRole::Seller, &seller).unwrap());
        }

        let reopened = FilePartyHistory::open(&path).unwrap();
        assert_eq!(reopened.list(PartyRole::Seller).unwrap(), vec![seller]);
        assert!(reopened.list(PartyRole::Buyer).unwrap().is_empty());
    }
}
