//! Domain error model.

use thiserror::Error;

use crate::id::{AgencyId, UserId};
use crate::money::Money;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// illegal transitions, authorization at the entity level). Storage and
/// transport concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or missing submission input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Corrupt or non-covering commission configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The actor may not perform this action on this entity.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Another actor already owns the work item.
    #[error("already claimed by {holder}")]
    AlreadyClaimed { holder: UserId },

    /// The entity reached a terminal state; no further transitions are legal.
    #[error("already finalized ({0})")]
    AlreadyFinalized(String),

    /// The balance cannot absorb the requested debit.
    #[error("insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: Money, required: Money },

    /// The agency has no chef to route a recharge request to.
    #[error("agency {0} has no chef d'agence")]
    NoAgencyChef(AgencyId),

    /// A state-machine invariant was violated (illegal transition).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn already_finalized(status: impl Into<String>) -> Self {
        Self::AlreadyFinalized(status.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
