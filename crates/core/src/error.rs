//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, InvoiceError>;

/// Invoice-level error.
///
/// Keep this focused on deterministic, business/domain failures detected while
/// computing or validating an invoice. Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvoiceError {
    /// Quantity was zero or negative.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// A monetary amount was not a finite decimal, or arithmetic overflowed.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// VAT percent was negative.
    #[error("invalid tax rate: {0}")]
    InvalidTaxRate(String),

    /// The invoice has no line items.
    #[error("invoice must contain at least one line item")]
    EmptyInvoice,

    /// Seller or buyer is missing, or lacks a name / address line.
    #[error("missing party field: {0}")]
    MissingPartyField(String),

    /// Currency is not a recognized ISO 4217 code.
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// Issue date lies suspiciously far in the future.
    ///
    /// Warning-level: only raised as an error when the caller's policy rejects it.
    #[error("issue date is suspiciously far in the future: {0}")]
    FutureDateSuspicious(String),

    /// Due date precedes the issue date.
    #[error("invalid due date: {0}")]
    InvalidDueDate(String),

    /// Service period ends before it starts.
    #[error("invalid service period: {0}")]
    InvalidServicePeriod(String),

    /// Unit of measure is not one of the supported UN/ECE codes.
    #[error("invalid unit code: {0}")]
    InvalidUnitCode(String),

    /// A line item is malformed (e.g. blank name).
    #[error("invalid line item: {0}")]
    InvalidLineItem(String),

    /// No line item exists at the given (1-based) position.
    #[error("line item {0} not found")]
    LineNotFound(usize),

    /// The invoice number was already issued.
    #[error("invoice number already issued: {0}")]
    DuplicateInvoiceNumber(String),

    /// The per-year invoice sequence cannot be incremented any further.
    #[error("invoice sequence exhausted for year {0}")]
    SequenceExhausted(i32),
}

impl InvoiceError {
    pub fn invalid_quantity(msg: impl Into<String>) -> Self {
        Self::InvalidQuantity(msg.into())
    }

    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    pub fn invalid_tax_rate(msg: impl Into<String>) -> Self {
        Self::InvalidTaxRate(msg.into())
    }

    pub fn missing_party_field(msg: impl Into<String>) -> Self {
        Self::MissingPartyField(msg.into())
    }

    pub fn unsupported_currency(msg: impl Into<String>) -> Self {
        Self::UnsupportedCurrency(msg.into())
    }

    pub fn invalid_line_item(msg: impl Into<String>) -> Self {
        Self::InvalidLineItem(msg.into())
    }

    /// Stable machine-readable kind, used in API error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidQuantity(_) => "invalid_quantity",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::InvalidTaxRate(_) => "invalid_tax_rate",
            Self::EmptyInvoice => "empty_invoice",
            Self::MissingPartyField(_) => "missing_party_field",
            Self::UnsupportedCurrency(_) => "unsupported_currency",
            Self::FutureDateSuspicious(_) => "future_date_suspicious",
            Self::InvalidDueDate(_) => "invalid_due_date",
            Self::InvalidServicePeriod(_) => "invalid_service_period",
            Self::InvalidUnitCode(_) => "invalid_unit_code",
            Self::InvalidLineItem(_) => "invalid_line_item",
            Self::LineNotFound(_) => "line_not_found",
            Self::DuplicateInvoiceNumber(_) => "duplicate_invoice_number",
            Self::SequenceExhausted(_) => "sequence_exhausted",
        }
    }
}
