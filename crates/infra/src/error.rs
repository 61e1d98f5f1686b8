//! Error surface of the workflow services.

use thiserror::Error;

use agencyops_auth::AuthzError;
use agencyops_core::{AgencyId, DomainError, Money, UserId};

use crate::store::StoreError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// Malformed or missing input; shown to the submitter.
    #[error("{0}")]
    Validation(String),

    /// Corrupt commission configuration on the catalog side.
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    PermissionDenied(String),

    /// Lost a claim race; the caller should re-fetch.
    #[error("already claimed by {holder}")]
    AlreadyClaimed { holder: UserId },

    #[error("already finalized ({0})")]
    AlreadyFinalized(String),

    #[error("insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: Money, required: Money },

    #[error("agency {0} has no chef d'agence")]
    NoAgencyChef(AgencyId),

    #[error("{0} not found")]
    NotFound(String),

    /// Stale write or illegal transition.
    #[error("{0}")]
    Conflict(String),

    #[error("store failure: {0}")]
    Store(String),

    /// Publication failed after a successful commit; state is kept.
    #[error("publish failed after commit: {0}")]
    Publish(String),
}

impl WorkflowError {
    /// Stable machine-readable code, used as the `error` field of API bodies.
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::Validation(_) => "validation_error",
            WorkflowError::Config(_) => "config_error",
            WorkflowError::PermissionDenied(_) => "permission_denied",
            WorkflowError::AlreadyClaimed { .. } => "already_claimed",
            WorkflowError::AlreadyFinalized(_) => "already_finalized",
            WorkflowError::InsufficientFunds { .. } => "insufficient_funds",
            WorkflowError::NoAgencyChef(_) => "no_agency_chef",
            WorkflowError::NotFound(_) => "not_found",
            WorkflowError::Conflict(_) => "conflict",
            WorkflowError::Store(_) => "store_error",
            WorkflowError::Publish(_) => "publish_error",
        }
    }

    pub(crate) fn not_found(what: impl core::fmt::Display) -> Self {
        WorkflowError::NotFound(what.to_string())
    }
}

impl From<DomainError> for WorkflowError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => WorkflowError::Validation(msg),
            DomainError::Config(msg) => WorkflowError::Config(msg),
            DomainError::PermissionDenied(msg) => WorkflowError::PermissionDenied(msg),
            DomainError::AlreadyClaimed { holder } => WorkflowError::AlreadyClaimed { holder },
            DomainError::AlreadyFinalized(status) => WorkflowError::AlreadyFinalized(status),
            DomainError::InsufficientFunds { available, required } => {
                WorkflowError::InsufficientFunds { available, required }
            }
            DomainError::NoAgencyChef(agency) => WorkflowError::NoAgencyChef(agency),
            DomainError::InvariantViolation(msg) | DomainError::Conflict(msg) => WorkflowError::Conflict(msg),
            DomainError::NotFound => WorkflowError::NotFound("entity".to_string()),
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { kind, id } => WorkflowError::NotFound(format!("{kind} {id}")),
            StoreError::AlreadyExists { kind, id } => WorkflowError::Conflict(format!("{kind} {id} already exists")),
            StoreError::Conflict { .. } => WorkflowError::Conflict(value.to_string()),
            StoreError::AlreadyClaimed { holder } => WorkflowError::AlreadyClaimed { holder },
            StoreError::Rejected(err) => err.into(),
            StoreError::Poisoned => WorkflowError::Store(value.to_string()),
        }
    }
}

impl From<AuthzError> for WorkflowError {
    fn from(value: AuthzError) -> Self {
        WorkflowError::PermissionDenied(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agencyops_core::EntityKind;

    #[test]
    fn store_refusals_keep_their_domain_kind() {
        let err: WorkflowError = StoreError::Rejected(DomainError::InsufficientFunds {
            available: Money::new(10),
            required: Money::new(20),
        })
        .into();
        assert_eq!(err.code(), "insufficient_funds");

        let holder = UserId::new();
        let err: WorkflowError = StoreError::AlreadyClaimed { holder }.into();
        assert_eq!(err, WorkflowError::AlreadyClaimed { holder });

        let err: WorkflowError = StoreError::NotFound {
            kind: EntityKind::Transaction,
            id: "x".into(),
        }
        .into();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn illegal_transitions_surface_as_conflicts() {
        let err: WorkflowError = DomainError::invariant("only an assigned transaction can be released").into();
        assert_eq!(err.code(), "conflict");
    }
}
