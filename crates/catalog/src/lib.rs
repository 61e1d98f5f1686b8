//! Operation type catalog.
//!
//! The catalog's editing screens live elsewhere; this crate holds what the
//! workflows depend on: the operation type record, its field schema, and the
//! validation of a submitted payload against that schema.

pub mod operation_type;
pub mod payload;

pub use operation_type::{FieldKind, FormField, OperationType, OperationTypeStatus};
pub use payload::{Payload, validate_payload};
