use serde::{Deserialize, Serialize};

use facturx_core::{DomainResult, InvoiceError};

const PREFIX: &str = "INV";

/// Human-facing invoice number (BT-1).
///
/// Usually produced by [`next_invoice_number`], but callers may supply any
/// string of their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `(year, sequence)` when the number has the `INV-<year>-<sequence>` shape.
    pub fn sequence_parts(&self) -> Option<(i32, u32)> {
        let mut parts = self.0.splitn(3, '-');
        if parts.next()? != PREFIX {
            return None;
        }
        let year = parts.next()?;
        let sequence = parts.next()?;
        if year.is_empty() || sequence.is_empty() {
            return None;
        }
        let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !digits(year) || !digits(sequence) {
            return None;
        }
        Some((year.parse().ok()?, sequence.parse().ok()?))
    }
}

impl core::fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Next number in a year's sequence: `INV-<year>-<last + 1>`, zero-padded to
/// three digits.
///
/// Pure: the per-year counter is owned by the caller's sequence store, and a
/// new year simply starts from its own last value (0 when unused).
pub fn next_invoice_number(year: i32, last_sequence_for_year: u32) -> DomainResult<InvoiceNumber> {
    let next = last_sequence_for_year
        .checked_add(1)
        .ok_or(InvoiceError::SequenceExhausted(year))?;
    Ok(InvoiceNumber(format!("{PREFIX}-{year}-{next:03}")))
}
