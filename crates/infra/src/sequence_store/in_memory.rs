use std::sync::Mutex;

use super::{claim_in, Counters, SequenceStore};
use crate::error::InfraError;

/// In-memory counter store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySequenceStore {
    inner: Mutex<Counters>,
}

impl InMemorySequenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that starts with `year` already at `last`.
    pub fn starting_at(year: i32, last: u32) -> Self {
        let mut counters = Counters::new();
        counters.insert(year, last);
        Self {
            inner: Mutex::new(counters),
        }
    }
}

impl SequenceStore for InMemorySequenceStore {
    fn last_sequence_for_year(&self, year: i32) -> Result<u32, InfraError> {
        let counters = self
            .inner
            .lock()
            .map_err(|_| InfraError::Poisoned("sequence store"))?;
        Ok(counters.get(&year).copied().unwrap_or(0))
    }

    fn claim(&self, year: i32, sequence: u32) -> Result<bool, InfraError> {
        let mut counters = self
            .inner
            .lock()
            .map_err(|_| InfraError::Poisoned("sequence store"))?;
        Ok(claim_in(&mut counters, year, sequence))
    }
}
