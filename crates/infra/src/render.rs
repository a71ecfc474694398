//! Seams for the human-readable document.
//!
//! Page layout and PDF/A-3 attachment are supplied by the host; this crate
//! only fixes the order in which they run.

use std::sync::Arc;

use facturx_invoicing::FinalizedInvoice;

use crate::error::InfraError;

/// Lays out the visual invoice as PDF bytes.
pub trait InvoiceRenderer: Send + Sync {
    fn render(&self, invoice: &FinalizedInvoice) -> Result<Vec<u8>, InfraError>;
}

/// Attaches the structured XML to a rendered PDF, producing the hybrid file.
pub trait PdfEmbedder: Send + Sync {
    fn embed(&self, pdf: &[u8], xml: &[u8], file_name: &str) -> Result<Vec<u8>, InfraError>;
}

impl<R> InvoiceRenderer for Arc<R>
where
    R: InvoiceRenderer + ?Sized,
{
    fn render(&self, invoice: &FinalizedInvoice) -> Result<Vec<u8>, InfraError> {
        (**self).render(invoice)
    }
}

impl<E> PdfEmbedder for Arc<E>
where
    E: PdfEmbedder + ?Sized,
{
    fn embed(&self, pdf: &[u8], xml: &[u8], file_name: &str) -> Result<Vec<u8>, InfraError> {
        (**self).embed(pdf, xml, file_name)
    }
}
