//! Aggregate root trait for mutable domain documents.

/// Aggregate root marker + minimal interface.
///
/// Drafts expose their identity and a version that moves forward on every
/// accepted mutation, so a finalized document can record exactly which state it
/// was produced from.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state.
    fn version(&self) -> u64;
}
