//! Per-year invoice number counters.
//!
//! The domain computes numbers from a `last sequence` value; stores here own
//! that value and decide when it moves.

pub mod file;
pub mod in_memory;

use std::collections::BTreeMap;
use std::sync::Arc;

use facturx_invoicing::{next_invoice_number, InvoiceNumber};

use crate::error::InfraError;

pub use file::FileSequenceStore;
pub use in_memory::InMemorySequenceStore;

/// Persistent per-year counter of used invoice sequences.
pub trait SequenceStore: Send + Sync {
    /// Highest sequence used in `year`, 0 when the year is untouched.
    fn last_sequence_for_year(&self, year: i32) -> Result<u32, InfraError>;

    /// Mark `sequence` as issued if no equal or higher sequence was issued
    /// in `year` yet. Check and update happen under one lock.
    ///
    /// Returns `false`, leaving the counter as it was, when the sequence is
    /// already taken. Of two concurrent claims for the same sequence exactly
    /// one succeeds.
    fn claim(&self, year: i32, sequence: u32) -> Result<bool, InfraError>;

    /// Number the next successful claim for `year` would issue.
    fn peek_next(&self, year: i32) -> Result<InvoiceNumber, InfraError> {
        Ok(next_invoice_number(year, self.last_sequence_for_year(year)?)?)
    }
}

impl<S> SequenceStore for Arc<S>
where
    S: SequenceStore + ?Sized,
{
    fn last_sequence_for_year(&self, year: i32) -> Result<u32, InfraError> {
        (**self).last_sequence_for_year(year)
    }

    fn claim(&self, year: i32, sequence: u32) -> Result<bool, InfraError> {
        (**self).claim(year, sequence)
    }

    fn peek_next(&self, year: i32) -> Result<InvoiceNumber, InfraError> {
        (**self).peek_next(year)
    }
}

pub(crate) type Counters = BTreeMap<i32, u32>;

/// Returns whether the counter moved.
pub(crate) fn claim_in(counters: &mut Counters, year: i32, sequence: u32) -> bool {
    let current = counters.entry(year).or_insert(0);
    if sequence > *current {
        *current = sequence;
        true
    } else {
        false
    }
}
