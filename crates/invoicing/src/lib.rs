//! Invoice Model Builder.
//!
//! Turns raw party records and line items into a normalized, arithmetically
//! consistent invoice ready for serialization. Pure domain logic: no IO, no
//! clocks (callers pass `today`), no shared state.

pub mod invoice;
pub mod line_item;
pub mod numbering;
pub mod party;
pub mod totals;
pub mod validation;

pub use invoice::{FinalizedInvoice, FinalizedLine, InvoiceDraft, PaymentDetails, ServicePeriod};
pub use line_item::{
    compute_line_item, Derived, DerivedField, LineAmounts, LineItem, LineOverrides, UnitCode,
};
pub use numbering::{next_invoice_number, InvoiceNumber};
pub use party::{Party, PartyRole};
pub use totals::{aggregate, InvoiceTotals, TaxSubtotal};
pub use validation::{
    validate, FutureDatePolicy, ValidationReport, ValidationWarning, MAX_FUTURE_DAYS,
};
