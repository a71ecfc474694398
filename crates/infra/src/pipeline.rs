use std::sync::Arc;

use chrono::{Datelike, NaiveDate};

use facturx_core::{DocumentId, InvoiceError};
use facturx_invoicing::{
    next_invoice_number, FinalizedInvoice, FutureDatePolicy, InvoiceDraft, InvoiceNumber,
    PartyRole,
};

use crate::error::InfraError;
use crate::party_history::PartyHistory;
use crate::render::{InvoiceRenderer, PdfEmbedder};
use crate::sequence_store::SequenceStore;
use crate::xml::InvoiceSerializer;

/// Claims lost to concurrent generations before giving up.
const MAX_CLAIM_ATTEMPTS: usize = 32;

/// Output of one successful generation run.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub document_id: DocumentId,
    pub invoice: FinalizedInvoice,
    pub xml: Vec<u8>,
    /// Present when a renderer and embedder are configured.
    pub pdf: Option<Vec<u8>>,
}

struct Outputs {
    invoice: FinalizedInvoice,
    xml: Vec<u8>,
    pdf: Option<Vec<u8>>,
}

/// Validate, finalize, serialize and (optionally) render an invoice draft.
///
/// Side effects run last and only after every output was produced: the
/// invoice number is claimed, then the parties are remembered. A failed run
/// leaves both stores as they were, so it neither burns a number nor leaves a
/// gap.
pub struct DocumentPipeline {
    serializer: Arc<dyn InvoiceSerializer>,
    sequences: Arc<dyn SequenceStore>,
    pdf: Option<(Arc<dyn InvoiceRenderer>, Arc<dyn PdfEmbedder>)>,
    history: Option<Arc<dyn PartyHistory>>,
    policy: FutureDatePolicy,
}

impl DocumentPipeline {
    pub fn new(serializer: Arc<dyn InvoiceSerializer>, sequences: Arc<dyn SequenceStore>) -> Self {
        Self {
            serializer,
            sequences,
            pdf: None,
            history: None,
            policy: FutureDatePolicy::default(),
        }
    }

    pub fn with_pdf(
        mut self,
        renderer: Arc<dyn InvoiceRenderer>,
        embedder: Arc<dyn PdfEmbedder>,
    ) -> Self {
        self.pdf = Some((renderer, embedder));
        self
    }

    pub fn with_history(mut self, history: Arc<dyn PartyHistory>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_policy(mut self, policy: FutureDatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FutureDatePolicy {
        self.policy
    }

    pub fn serializer(&self) -> &dyn InvoiceSerializer {
        self.serializer.as_ref()
    }

    /// Number the next invoice of `year` would get. Does not reserve it.
    pub fn suggest_number(&self, year: i32) -> Result<InvoiceNumber, InfraError> {
        self.sequences.peek_next(year)
    }

    /// Generate a draft under the number it already carries.
    ///
    /// An `INV-<year>-<seq>` number must not have been issued yet and moves
    /// the counter up to `seq`. Other numbers are taken as given.
    #[tracing::instrument(skip_all, fields(invoice_number = %draft.number()))]
    pub fn generate(
        &self,
        draft: &InvoiceDraft,
        today: NaiveDate,
    ) -> Result<GeneratedDocument, InfraError> {
        let outputs = self.produce(draft, today)?;
        self.claim_number(outputs.invoice.number())?;
        Ok(self.complete(outputs))
    }

    /// Generate a draft under the next free number of its issue year.
    ///
    /// The number is claimed after the outputs are built. When a concurrent
    /// run takes it first, the draft is renumbered and built again.
    #[tracing::instrument(skip_all, fields(year = draft.issue_date().year()))]
    pub fn generate_with_next_number(
        &self,
        draft: &InvoiceDraft,
        today: NaiveDate,
    ) -> Result<GeneratedDocument, InfraError> {
        let year = draft.issue_date().year();
        let mut numbered = draft.clone();
        for attempt in 1..=MAX_CLAIM_ATTEMPTS {
            let last = self.sequences.last_sequence_for_year(year)?;
            numbered.set_number(next_invoice_number(year, last)?);
            let outputs = self.produce(&numbered, today)?;
            // next_invoice_number already rejected u32::MAX
            if self.sequences.claim(year, last + 1)? {
                return Ok(self.complete(outputs));
            }
            tracing::debug!(attempt, sequence = last + 1, "number taken concurrently, retrying");
        }
        Err(InfraError::SequenceContended(year))
    }

    fn produce(&self, draft: &InvoiceDraft, today: NaiveDate) -> Result<Outputs, InfraError> {
        let invoice = draft.finalize(today, self.policy)?;
        for warning in invoice.warnings() {
            tracing::warn!(kind = warning.kind(), "{}", warning.message());
        }

        let xml = self.serializer.serialize(&invoice)?;
        let pdf = match &self.pdf {
            Some((renderer, embedder)) => {
                let visual = renderer.render(&invoice)?;
                Some(embedder.embed(&visual, &xml, self.serializer.file_name())?)
            }
            None => None,
        };
        Ok(Outputs { invoice, xml, pdf })
    }

    fn claim_number(&self, number: &InvoiceNumber) -> Result<(), InfraError> {
        let Some((year, sequence)) = number.sequence_parts() else {
            tracing::debug!(%number, "custom invoice number, counter unchanged");
            return Ok(());
        };
        if self.sequences.claim(year, sequence)? {
            Ok(())
        } else {
            Err(InvoiceError::DuplicateInvoiceNumber(number.to_string()).into())
        }
    }

    fn complete(&self, outputs: Outputs) -> GeneratedDocument {
        let Outputs { invoice, xml, pdf } = outputs;
        self.remember_parties(&invoice);

        let document_id = DocumentId::new();
        tracing::info!(
            %document_id,
            invoice_number = %invoice.number(),
            gross_total = %invoice.totals().gross_total,
            lines = invoice.lines().len(),
            hybrid = pdf.is_some(),
            "invoice generated"
        );

        GeneratedDocument {
            document_id,
            invoice,
            xml,
            pdf,
        }
    }

    fn remember_parties(&self, invoice: &FinalizedInvoice) {
        let Some(history) = &self.history else {
            return;
        };
        for (role, party) in [
            (PartyRole::Seller, invoice.seller()),
            (PartyRole::Buyer, invoice.buyer()),
        ] {
            if let Err(err) = history.record(role, party) {
                tracing::warn!(
                    role = role.as_str(),
                    error = %err,
                    "failed to record party history"
                );
            }
        }
    }
}
