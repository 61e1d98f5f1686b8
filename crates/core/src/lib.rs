//! `agencyops-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::{Entity, EntityKind};
pub use error::{DomainError, DomainResult};
pub use id::{AgencyId, OperationTypeId, RechargeId, RequestId, TransactionId, UserId};
pub use money::Money;
pub use value_object::ValueObject;
