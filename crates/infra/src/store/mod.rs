//! Entity store boundary.
//!
//! The store is the sole mutator of persisted state. Reads hand out snapshots;
//! every write goes through [`EntityStore::commit`], which applies a whole
//! [`UnitOfWork`] or nothing. Each row write carries a [`Guard`] checked against
//! the stored row at commit time, so callers never "read, then blindly write".

pub mod filter;
pub mod in_memory;
pub mod unit_of_work;

use std::sync::Arc;

use thiserror::Error;

use agencyops_catalog::OperationType;
use agencyops_core::{
    AgencyId, DomainError, EntityKind, OperationTypeId, RechargeId, RequestId, TransactionId, UserId,
};
use agencyops_directory::{Agency, Profile};
use agencyops_recharges::RechargeRequest;
use agencyops_requests::SupportRequest;
use agencyops_transactions::Transaction;

pub use filter::{Assignee, ListFilter};
pub use in_memory::InMemoryEntityStore;
pub use unit_of_work::{Guard, UnitOfWork};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("{kind} {id} already exists")]
    AlreadyExists { kind: EntityKind, id: String },

    /// Optimistic concurrency check failed (stale version).
    #[error("stale write on {kind} {id}: {detail}")]
    Conflict {
        kind: EntityKind,
        id: String,
        detail: String,
    },

    /// The `Unclaimed` guard failed: someone else holds the row.
    #[error("already claimed by {holder}")]
    AlreadyClaimed { holder: UserId },

    /// A profile change was refused by the profile's own rules (e.g. funds).
    #[error("{0}")]
    Rejected(DomainError),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Snapshot reads plus atomic, guarded commits.
pub trait EntityStore: Send + Sync {
    fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError>;

    /// Transactions matching `filter`, oldest first.
    fn transactions(&self, filter: &ListFilter) -> Result<Vec<Transaction>, StoreError>;

    fn recharge(&self, id: RechargeId) -> Result<Option<RechargeRequest>, StoreError>;

    fn recharges(&self, filter: &ListFilter) -> Result<Vec<RechargeRequest>, StoreError>;

    fn support_request(&self, id: RequestId) -> Result<Option<SupportRequest>, StoreError>;

    fn support_requests(&self, filter: &ListFilter) -> Result<Vec<SupportRequest>, StoreError>;

    fn operation_type(&self, id: &OperationTypeId) -> Result<Option<OperationType>, StoreError>;

    fn operation_types(&self) -> Result<Vec<OperationType>, StoreError>;

    fn agency(&self, id: AgencyId) -> Result<Option<Agency>, StoreError>;

    /// Every agency, by name.
    fn agencies(&self) -> Result<Vec<Agency>, StoreError>;

    fn profile(&self, id: UserId) -> Result<Option<Profile>, StoreError>;

    /// Every profile, by name.
    fn profiles(&self) -> Result<Vec<Profile>, StoreError>;

    /// Apply every write of `uow`, or none of them.
    fn commit(&self, uow: UnitOfWork) -> Result<(), StoreError>;
}

impl<S> EntityStore for Arc<S>
where
    S: EntityStore + ?Sized,
{
    fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        (**self).transaction(id)
    }

    fn transactions(&self, filter: &ListFilter) -> Result<Vec<Transaction>, StoreError> {
        (**self).transactions(filter)
    }

    fn recharge(&self, id: RechargeId) -> Result<Option<RechargeRequest>, StoreError> {
        (**self).recharge(id)
    }

    fn recharges(&self, filter: &ListFilter) -> Result<Vec<RechargeRequest>, StoreError> {
        (**self).recharges(filter)
    }

    fn support_request(&self, id: RequestId) -> Result<Option<SupportRequest>, StoreError> {
        (**self).support_request(id)
    }

    fn support_requests(&self, filter: &ListFilter) -> Result<Vec<SupportRequest>, StoreError> {
        (**self).support_requests(filter)
    }

    fn operation_type(&self, id: &OperationTypeId) -> Result<Option<OperationType>, StoreError> {
        (**self).operation_type(id)
    }

    fn operation_types(&self) -> Result<Vec<OperationType>, StoreError> {
        (**self).operation_types()
    }

    fn agency(&self, id: AgencyId) -> Result<Option<Agency>, StoreError> {
        (**self).agency(id)
    }

    fn profile(&self, id: UserId) -> Result<Option<Profile>, StoreError> {
        (**self).profile(id)
    }

    fn agencies(&self) -> Result<Vec<Agency>, StoreError> {
        (**self).agencies()
    }

    fn profiles(&self) -> Result<Vec<Profile>, StoreError> {
        (**self).profiles()
    }

    fn commit(&self, uow: UnitOfWork) -> Result<(), StoreError> {
        (**self).commit(uow)
    }
}
