//! Structured invoice output.

pub mod cii;

use facturx_invoicing::FinalizedInvoice;

use crate::error::InfraError;

pub use cii::CiiXmlSerializer;

/// Turns a finalized invoice into a machine-readable document.
pub trait InvoiceSerializer: Send + Sync {
    fn media_type(&self) -> &'static str;

    /// File name the document carries when attached or downloaded.
    fn file_name(&self) -> &'static str;

    fn serialize(&self, invoice: &FinalizedInvoice) -> Result<Vec<u8>, InfraError>;
}
