use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, Utc};

use facturx_infra::{
    CiiXmlSerializer, DocumentPipeline, FilePartyHistory, FileSequenceStore, InMemoryPartyHistory,
    InMemorySequenceStore, PartyHistory, SequenceStore,
};
use facturx_invoicing::FutureDatePolicy;

use crate::config::AppConfig;

/// Shared state handed to every handler.
pub struct AppServices {
    pipeline: DocumentPipeline,
    history: Arc<dyn PartyHistory>,
}

impl AppServices {
    pub fn new(pipeline: DocumentPipeline, history: Arc<dyn PartyHistory>) -> Self {
        Self { pipeline, history }
    }

    /// Everything in memory; used by tests and when no files are configured.
    pub fn in_memory(policy: FutureDatePolicy) -> Self {
        Self::assemble(
            Arc::new(InMemorySequenceStore::new()),
            Arc::new(InMemoryPartyHistory::new()),
            policy,
        )
    }

    pub fn pipeline(&self) -> &DocumentPipeline {
        &self.pipeline
    }

    pub fn history(&self) -> &dyn PartyHistory {
        self.history.as_ref()
    }

    /// Date used for validation and default numbering.
    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    fn assemble(
        sequences: Arc<dyn SequenceStore>,
        history: Arc<dyn PartyHistory>,
        policy: FutureDatePolicy,
    ) -> Self {
        let pipeline = DocumentPipeline::new(Arc::new(CiiXmlSerializer::new()), sequences)
            .with_history(history.clone())
            .with_policy(policy);
        Self::new(pipeline, history)
    }
}

/// Wire stores from configuration (file-backed when a path is set).
pub fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let sequences: Arc<dyn SequenceStore> = match &config.counter_file {
        Some(path) => Arc::new(
            FileSequenceStore::open(path)
                .with_context(|| format!("failed to open counter file {}", path.display()))?,
        ),
        None => {
            tracing::warn!(
                "FACTURX_COUNTER_FILE not set; invoice counters are kept in memory only"
            );
            Arc::new(InMemorySequenceStore::new())
        }
    };

    let history: Arc<dyn PartyHistory> = match &config.history_file {
        Some(path) => Arc::new(
            FilePartyHistory::open(path)
                .with_context(|| format!("failed to open party history {}", path.display()))?,
        ),
        None => Arc::new(InMemoryPartyHistory::new()),
    };

    Ok(AppServices::assemble(sequences, history, config.future_date_policy))
}
