//! Entity marker: identity that outlives attribute changes.

/// An object inside an aggregate that is tracked by id rather than by value.
///
/// A work order's line item is the canonical case: quantity and price edits
/// change its attributes, but it stays the same line item for its whole life
/// on the ticket.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
