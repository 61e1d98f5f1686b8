//! Task queue and assignment protocol shared by the claimable workflows.
//!
//! A claim is one guarded write: the store accepts it only if the stored row
//! still has no assignee, so of N concurrent claimants exactly one wins and the
//! others get `AlreadyClaimed` naming the winner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agencyops_auth::{Action, Actor, Grant, Resource, Role, SubAdminPermissions, Workflow};
use agencyops_core::{Aggregate, AggregateRoot, DomainError, EntityKind, ExpectedVersion, RequestId, TransactionId, UserId};
use agencyops_events::{Event, EventBus, TransitionEvent};
use agencyops_requests::{
    ClaimRequest, ReassignRequest, ReleaseRequest, SupportRequest, SupportRequestCommand,
};
use agencyops_transactions::{
    ClaimTransaction, ReassignTransaction, ReleaseTransaction, Transaction, TransactionCommand,
};

use crate::error::WorkflowError;
use crate::store::{Assignee, EntityStore, Guard, ListFilter, StoreError, UnitOfWork};
use crate::workflow::{Engine, log_refusal};

/// Queue views exposed per workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueView {
    /// Open items nobody holds.
    #[default]
    Unassigned,
    /// Open items held by the caller.
    Mine,
    /// Every open item; admin_general only.
    #[serde(rename = "all")]
    AllOpen,
}

/// An entity that goes through the claim/release/reassign protocol.
pub trait WorkItem: Aggregate<Error = DomainError, Event: Event> + Clone {
    const WORKFLOW: Workflow;
    const KIND: EntityKind;

    type Key: Copy + core::fmt::Display;

    fn key(&self) -> Self::Key;

    fn status_str(&self) -> &'static str;

    fn assignee(&self) -> Option<UserId>;

    fn authz_resource(&self) -> Resource;

    /// Whether a sous_admin with `permissions` may be handed this kind of item.
    fn may_be_assigned(permissions: &SubAdminPermissions) -> bool;

    fn claim_command(grant: Grant, at: DateTime<Utc>) -> Self::Command;

    fn release_command(grant: Grant, at: DateTime<Utc>) -> Self::Command;

    fn reassign_command(grant: Grant, assignee: UserId, at: DateTime<Utc>) -> Self::Command;

    fn load<S: EntityStore + ?Sized>(store: &S, key: Self::Key) -> Result<Option<Self>, StoreError>;

    fn list<S: EntityStore + ?Sized>(store: &S, filter: &ListFilter) -> Result<Vec<Self>, StoreError>;

    fn stage(self, uow: &mut UnitOfWork, guard: Guard);
}

impl WorkItem for Transaction {
    const WORKFLOW: Workflow = Workflow::Transactions;
    const KIND: EntityKind = EntityKind::Transaction;

    type Key = TransactionId;

    fn key(&self) -> TransactionId {
        self.transaction_id()
    }

    fn status_str(&self) -> &'static str {
        self.status().as_str()
    }

    fn assignee(&self) -> Option<UserId> {
        self.assigned_to()
    }

    fn authz_resource(&self) -> Resource {
        self.resource()
    }

    fn may_be_assigned(permissions: &SubAdminPermissions) -> bool {
        permissions.can_validate_transactions
    }

    fn claim_command(grant: Grant, at: DateTime<Utc>) -> TransactionCommand {
        TransactionCommand::Claim(ClaimTransaction { grant, occurred_at: at })
    }

    fn release_command(grant: Grant, at: DateTime<Utc>) -> TransactionCommand {
        TransactionCommand::Release(ReleaseTransaction { grant, occurred_at: at })
    }

    fn reassign_command(grant: Grant, assignee: UserId, at: DateTime<Utc>) -> TransactionCommand {
        TransactionCommand::Reassign(ReassignTransaction {
            grant,
            assignee,
            occurred_at: at,
        })
    }

    fn load<S: EntityStore + ?Sized>(store: &S, key: TransactionId) -> Result<Option<Self>, StoreError> {
        store.transaction(key)
    }

    fn list<S: EntityStore + ?Sized>(store: &S, filter: &ListFilter) -> Result<Vec<Self>, StoreError> {
        store.transactions(filter)
    }

    fn stage(self, uow: &mut UnitOfWork, guard: Guard) {
        uow.put_transaction(self, guard);
    }
}

impl WorkItem for SupportRequest {
    const WORKFLOW: Workflow = Workflow::SupportRequests;
    const KIND: EntityKind = EntityKind::SupportRequest;

    type Key = RequestId;

    fn key(&self) -> RequestId {
        self.request_id()
    }

    fn status_str(&self) -> &'static str {
        self.status().as_str()
    }

    fn assignee(&self) -> Option<UserId> {
        self.assigned_to()
    }

    fn authz_resource(&self) -> Resource {
        self.resource()
    }

    fn may_be_assigned(permissions: &SubAdminPermissions) -> bool {
        permissions.can_manage_requests
    }

    fn claim_command(grant: Grant, at: DateTime<Utc>) -> SupportRequestCommand {
        SupportRequestCommand::Claim(ClaimRequest { grant, occurred_at: at })
    }

    fn release_command(grant: Grant, at: DateTime<Utc>) -> SupportRequestCommand {
        SupportRequestCommand::Release(ReleaseRequest { grant, occurred_at: at })
    }

    fn reassign_command(grant: Grant, assignee: UserId, at: DateTime<Utc>) -> SupportRequestCommand {
        SupportRequestCommand::Reassign(ReassignRequest {
            grant,
            assignee,
            occurred_at: at,
        })
    }

    fn load<S: EntityStore + ?Sized>(store: &S, key: RequestId) -> Result<Option<Self>, StoreError> {
        store.support_request(key)
    }

    fn list<S: EntityStore + ?Sized>(store: &S, filter: &ListFilter) -> Result<Vec<Self>, StoreError> {
        store.support_requests(filter)
    }

    fn stage(self, uow: &mut UnitOfWork, guard: Guard) {
        uow.put_support_request(self, guard);
    }
}

/// Audit record for a transition from `before` to `after`, named after the
/// last aggregate event it emitted.
pub(crate) fn transition<T: WorkItem>(
    actor: &Actor,
    action: &str,
    before: Option<&T>,
    after: &T,
    events: &[T::Event],
    at: DateTime<Utc>,
) -> TransitionEvent {
    let record = TransitionEvent::new(
        actor.id(),
        action,
        T::KIND,
        after.key(),
        before.map(WorkItem::status_str),
        after.status_str(),
        at,
    );
    match events.last() {
        Some(event) => record.caused_by(event),
        None => record,
    }
}

impl<S, B> Engine<S, B>
where
    S: EntityStore,
    B: EventBus<TransitionEvent>,
{
    pub(crate) fn load_item<T: WorkItem>(&self, key: T::Key) -> Result<T, WorkflowError> {
        T::load(self.store(), key)?.ok_or_else(|| WorkflowError::not_found(format!("{} {key}", T::KIND)))
    }

    /// Take ownership of an unassigned item.
    pub fn claim<T: WorkItem>(&self, actor_id: UserId, key: T::Key) -> Result<T, WorkflowError> {
        self.try_claim(actor_id, key).inspect_err(|err| log_refusal("claim", err))
    }

    fn try_claim<T: WorkItem>(&self, actor_id: UserId, key: T::Key) -> Result<T, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let item: T = self.load_item(key)?;
        self.claim_snapshot(&actor, item)
    }

    /// Claim from an already-loaded snapshot.
    ///
    /// If the row moved on but is unassigned again (claimed then released in
    /// between), the claim is retried once against a fresh snapshot; a row
    /// that is held by then answers `AlreadyClaimed`.
    pub(crate) fn claim_snapshot<T: WorkItem>(&self, actor: &Actor, item: T) -> Result<T, WorkflowError> {
        let key = item.key();
        match self.claim_once(actor, item) {
            Err(WorkflowError::Conflict(detail)) => {
                let fresh: T = self.load_item(key)?;
                if let Some(holder) = fresh.assignee() {
                    return Err(WorkflowError::AlreadyClaimed { holder });
                }
                tracing::debug!(%key, %detail, "stale claim snapshot; retrying");
                self.claim_once(actor, fresh)
            }
            other => other,
        }
    }

    fn claim_once<T: WorkItem>(&self, actor: &Actor, item: T) -> Result<T, WorkflowError> {
        let grant = self.grant(actor, T::WORKFLOW, Action::Claim, &item.authz_resource())?;

        let now = Utc::now();
        let (next, events) = item.execute(&T::claim_command(grant, now))?;

        let mut uow = UnitOfWork::new();
        next.clone().stage(
            &mut uow,
            Guard::Unclaimed {
                version: item.version(),
            },
        );
        self.commit(uow, transition(actor, "claim", Some(&item), &next, &events, now))?;
        Ok(next)
    }

    /// Hand a held item back to the queue.
    pub fn release<T: WorkItem>(&self, actor_id: UserId, key: T::Key) -> Result<T, WorkflowError> {
        self.try_release(actor_id, key).inspect_err(|err| log_refusal("release", err))
    }

    fn try_release<T: WorkItem>(&self, actor_id: UserId, key: T::Key) -> Result<T, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let item: T = self.load_item(key)?;
        let grant = self.grant(&actor, T::WORKFLOW, Action::Release, &item.authz_resource())?;

        let now = Utc::now();
        let (next, events) = item.execute(&T::release_command(grant, now))?;

        let mut uow = UnitOfWork::new();
        next.clone()
            .stage(&mut uow, Guard::Version(ExpectedVersion::Exact(item.version())));
        self.commit(uow, transition(&actor, "release", Some(&item), &next, &events, now))?;
        Ok(next)
    }

    /// Move an item to a named sous_admin eligible for its workflow.
    pub fn reassign<T: WorkItem>(&self, actor_id: UserId, key: T::Key, assignee: UserId) -> Result<T, WorkflowError> {
        self.try_reassign(actor_id, key, assignee)
            .inspect_err(|err| log_refusal("reassign", err))
    }

    fn try_reassign<T: WorkItem>(&self, actor_id: UserId, key: T::Key, assignee: UserId) -> Result<T, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let item: T = self.load_item(key)?;
        let grant = self.grant(&actor, T::WORKFLOW, Action::Reassign, &item.authz_resource())?;

        let target = self.load_profile(assignee)?;
        let eligible = target.is_active()
            && target.role == Role::SousAdmin
            && target.permissions.as_ref().is_some_and(T::may_be_assigned);
        if !eligible {
            return Err(WorkflowError::Validation(format!(
                "user {assignee} cannot be assigned {} items",
                T::KIND
            )));
        }

        let now = Utc::now();
        let (next, events) = item.execute(&T::reassign_command(grant, assignee, now))?;

        let mut uow = UnitOfWork::new();
        next.clone()
            .stage(&mut uow, Guard::Version(ExpectedVersion::Exact(item.version())));
        self.commit(uow, transition(&actor, "reassign", Some(&item), &next, &events, now))?;
        Ok(next)
    }

    /// Open items in `view`, oldest first.
    pub fn queue<T: WorkItem>(&self, actor_id: UserId, view: QueueView) -> Result<Vec<T>, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let filter = match view {
            QueueView::Unassigned => {
                self.grant(&actor, T::WORKFLOW, Action::ViewQueue, &Resource::None)?;
                ListFilter::open().assigned(Assignee::Unassigned)
            }
            QueueView::Mine => {
                self.grant(&actor, T::WORKFLOW, Action::ViewQueue, &Resource::None)?;
                ListFilter::open().assigned(Assignee::Is(actor.id()))
            }
            QueueView::AllOpen => {
                self.grant(&actor, T::WORKFLOW, Action::ViewAllOpen, &Resource::None)?;
                ListFilter::open()
            }
        };
        Ok(T::list(self.store(), &filter)?)
    }
}
