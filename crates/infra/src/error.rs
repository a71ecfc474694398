use thiserror::Error;

use facturx_core::InvoiceError;

/// Infrastructure failure.
///
/// Domain rule violations pass through unchanged in [`InfraError::Domain`] so
/// callers can still tell a bad invoice from a broken disk.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error(transparent)]
    Domain(#[from] InvoiceError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("rendering failed: {0}")]
    Render(String),

    #[error("pdf embedding failed: {0}")]
    Embed(String),

    #[error("could not claim an invoice number for {0}: counter kept moving")]
    SequenceContended(i32),

    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}

impl InfraError {
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }

    pub fn embed(message: impl Into<String>) -> Self {
        Self::Embed(message.into())
    }

    /// The wrapped domain error, if this failure is a rule violation.
    pub fn as_domain(&self) -> Option<&InvoiceError> {
        match self {
            Self::Domain(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_stay_recognizable() {
        let err: InfraError = InvoiceError::EmptyInvoice.into();
        assert_eq!(err.as_domain(), Some(&InvoiceError::EmptyInvoice));
        assert_eq!(err.to_string(), InvoiceError::EmptyInvoice.to_string());
    }

    #[test]
    fn io_errors_are_not_domain_errors() {
        let err: InfraError = std::io::Error::other("disk full").into();
        assert!(err.as_domain().is_none());
        assert!(err.to_string().contains("disk full"));
    }
}
