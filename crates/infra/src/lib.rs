//! Infrastructure layer: counter persistence, party history, CII XML output
//! and the document generation pipeline.

pub mod error;
pub mod json_file;
pub mod party_history;
pub mod pipeline;
pub mod render;
pub mod sequence_store;
pub mod xml;

pub use error::InfraError;
pub use party_history::{FilePartyHistory, InMemoryPartyHistory, PartyHistory};
pub use pipeline::{DocumentPipeline, GeneratedDocument};
pub use render::{InvoiceRenderer, PdfEmbedder};
pub use sequence_store::{FileSequenceStore, InMemorySequenceStore, SequenceStore};
pub use xml::{CiiXmlSerializer, InvoiceSerializer};
