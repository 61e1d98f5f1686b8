use agencyops_catalog::OperationType;
use agencyops_core::{ExpectedVersion, UserId};
use agencyops_directory::{Agency, Profile, ProfileChange};
use agencyops_recharges::RechargeRequest;
use agencyops_requests::SupportRequest;
use agencyops_transactions::Transaction;

/// Condition a row write must satisfy at commit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Insert: the row must not exist yet.
    Absent,
    /// Update: the stored version must match. Catalog and directory rows are
    /// unversioned and always report version 0.
    Version(ExpectedVersion),
    /// Claim: the stored row must be unassigned and still at `version`.
    ///
    /// A row that gained an assignee fails with `AlreadyClaimed` naming it.
    Unclaimed { version: u64 },
}

#[derive(Debug, Clone)]
pub(crate) enum Write {
    Transaction(Transaction, Guard),
    Recharge(RechargeRequest, Guard),
    SupportRequest(SupportRequest, Guard),
    OperationType(OperationType, Guard),
    Agency(Agency, Guard),
    Profile(Profile, Guard),
    ProfileChange(UserId, ProfileChange),
}

/// A batch of writes applied all-or-nothing by [`EntityStore::commit`].
///
/// Profile changes are deltas applied to the stored row inside the commit, in
/// the order they were staged.
///
/// [`EntityStore::commit`]: crate::store::EntityStore::commit
#[derive(Debug, Clone, Default)]
pub struct UnitOfWork {
    pub(crate) writes: Vec<Write>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_transaction(&mut self, tx: Transaction, guard: Guard) -> &mut Self {
        self.writes.push(Write::Transaction(tx, guard));
        self
    }

    pub fn put_recharge(&mut self, recharge: RechargeRequest, guard: Guard) -> &mut Self {
        self.writes.push(Write::Recharge(recharge, guard));
        self
    }

    pub fn put_support_request(&mut self, request: SupportRequest, guard: Guard) -> &mut Self {
        self.writes.push(Write::SupportRequest(request, guard));
        self
    }

    pub fn put_operation_type(&mut self, op: OperationType, guard: Guard) -> &mut Self {
        self.writes.push(Write::OperationType(op, guard));
        self
    }

    pub fn put_agency(&mut self, agency: Agency, guard: Guard) -> &mut Self {
        self.writes.push(Write::Agency(agency, guard));
        self
    }

    pub fn put_profile(&mut self, profile: Profile, guard: Guard) -> &mut Self {
        self.writes.push(Write::Profile(profile, guard));
        self
    }

    pub fn change_profile(&mut self, user_id: UserId, change: ProfileChange) -> &mut Self {
        self.writes.push(Write::ProfileChange(user_id, change));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }
}
