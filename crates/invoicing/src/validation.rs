use core::str::FromStr;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use facturx_core::{CurrencyCode, DomainResult, InvoiceError};

use crate::invoice::InvoiceDraft;
use crate::party::PartyRole;

/// How far past `today` an issue date may lie before it looks like a typo.
pub const MAX_FUTURE_DAYS: u64 = 365;

/// What to do with an issue date beyond [`MAX_FUTURE_DAYS`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FutureDatePolicy {
    /// Accept the invoice and report a warning.
    #[default]
    Warn,
    /// Fail validation with `FutureDateSuspicious`.
    Reject,
    /// Accept silently.
    Ignore,
}

impl FromStr for FutureDatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(FutureDatePolicy::Warn),
            "reject" => Ok(FutureDatePolicy::Reject),
            "ignore" => Ok(FutureDatePolicy::Ignore),
            other => Err(format!(
                "unknown future date policy '{other}' (expected warn, reject or ignore)"
            )),
        }
    }
}

/// Non-fatal finding attached to an accepted invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    FutureDateSuspicious {
        issue_date: NaiveDate,
        latest_expected: NaiveDate,
    },
}

impl ValidationWarning {
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationWarning::FutureDateSuspicious { .. } => "future_date_suspicious",
        }
    }

    pub fn message(&self) -> String {
        match self {
            ValidationWarning::FutureDateSuspicious {
                issue_date,
                latest_expected,
            } => format!("issue date {issue_date} is after {latest_expected}"),
        }
    }
}

/// Outcome of a successful validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub warnings: Vec<ValidationWarning>,
}

/// Check an invoice before generation. Fails on the first violated rule.
///
/// Rule order: seller, buyer, currency, at least one line, positive quantities,
/// issue date horizon, due date, service period. `today` is passed in so the
/// check stays deterministic.
pub fn validate(
    invoice: &InvoiceDraft,
    today: NaiveDate,
    policy: FutureDatePolicy,
) -> DomainResult<ValidationReport> {
    let mut report = ValidationReport::default();

    invoice
        .seller()
        .ok_or_else(|| InvoiceError::missing_party_field("seller is missing"))?
        .ensure_complete(PartyRole::Seller)?;
    invoice
        .buyer()
        .ok_or_else(|| InvoiceError::missing_party_field("buyer is missing"))?
        .ensure_complete(PartyRole::Buyer)?;

    CurrencyCode::parse(invoice.currency())?;

    if invoice.lines().is_empty() {
        return Err(InvoiceError::EmptyInvoice);
    }

    for (idx, line) in invoice.lines().iter().enumerate() {
        if line.quantity() <= Decimal::ZERO {
            return Err(InvoiceError::invalid_quantity(format!(
                "line {} quantity must be positive",
                idx + 1
            )));
        }
    }

    let issue_date = invoice.issue_date();
    if let Some(latest_expected) = today.checked_add_days(Days::new(MAX_FUTURE_DAYS)) {
        if issue_date > latest_expected {
            match policy {
                FutureDatePolicy::Reject => {
                    return Err(InvoiceError::FutureDateSuspicious(format!(
                        "issue date {issue_date} is after {latest_expected}"
                    )));
                }
                FutureDatePolicy::Warn => {
                    report.warnings.push(ValidationWarning::FutureDateSuspicious {
                        issue_date,
                        latest_expected,
                    });
                }
                FutureDatePolicy::Ignore => {}
            }
        }
    }

    if let Some(due_date) = invoice.due_date() {
        if due_date < issue_date {
            return Err(InvoiceError::InvalidDueDate(format!(
                "due date {due_date} precedes issue date {issue_date}"
            )));
        }
    }

    if let Some(period) = invoice.service_period() {
        if period.end < period.start {
            return Err(InvoiceError::InvalidServicePeriod(format!(
                "period ends {} before it starts {}",
                period.end, period.start
            )));
        }
    }

    Ok(report)
}
