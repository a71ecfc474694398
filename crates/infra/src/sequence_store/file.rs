use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{claim_in, Counters, SequenceStore};
use crate::error::InfraError;
use crate::json_file::{load_or_default, write_atomically};

/// Counter store persisted as a JSON object of `year -> last sequence`.
///
/// The file is read once on open; every change rewrites it atomically while
/// the in-process lock is held.
#[derive(Debug)]
pub struct FileSequenceStore {
    path: PathBuf,
    inner: Mutex<Counters>,
}

impl FileSequenceStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, InfraError> {
        let path = path.into();
        let counters: Counters = load_or_default(&path)?;
        tracing::debug!(path = %path.display(), years = counters.len(), "sequence store opened");
        Ok(Self {
            path,
            inner: Mutex::new(counters),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SequenceStore for FileSequenceStore {
    fn last_sequence_for_year(&self, year: i32) -> Result<u32, InfraError> {
        let counters = self
            .inner
            .lock()
            .map_err(|_| InfraError::Poisoned("sequence store"))?;
        Ok(counters.get(&year).copied().unwrap_or(0))
    }

    /// The claim only counts once the file is written.
    fn claim(&self, year: i32, sequence: u32) -> Result<bool, InfraError> {
        let mut counters = self
            .inner
            .lock()
            .map_err(|_| InfraError::Poisoned("sequence store"))?;
        let mut updated = counters.clone();
        if !claim_in(&mut updated, year, sequence) {
            return Ok(false);
        }
        write_atomically(&self.path, &updated)?;
        *counters = updated;
        Ok(true)
    }
}
