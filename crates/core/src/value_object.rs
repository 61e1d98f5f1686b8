//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attributes. Amounts and
/// commission schedules are value objects; a `Transaction` or a `Profile` is an
/// entity (see [`crate::Entity`]).
///
/// A transaction snapshots value objects (`Money` fees, commission) instead of
/// referencing mutable catalog state, so a later catalog edit cannot change
/// historical amounts.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
