//! `facturx-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! the invoice error model, money rounding, currency codes and identifiers.

pub mod aggregate;
pub mod currency;
pub mod error;
pub mod id;
pub mod money;

pub use aggregate::AggregateRoot;
pub use currency::CurrencyCode;
pub use error::{DomainResult, InvoiceError};
pub use id::DocumentId;
pub use money::{percent_of, round_money, MONEY_SCALE};
