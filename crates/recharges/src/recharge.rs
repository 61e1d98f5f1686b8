use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agencyops_auth::{Action, Grant, Resource, Workflow};
use agencyops_core::{Aggregate, AggregateRoot, DomainError, Money, RechargeId, UserId};
use agencyops_events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RechargeStatus {
    PendingChef,
    Approved,
    Rejected,
}

impl RechargeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RechargeStatus::PendingChef => "pending_chef",
            RechargeStatus::Approved => "approved",
            RechargeStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RechargeStatus::PendingChef)
    }
}

/// Aggregate root: an agent's request to top up their balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RechargeRequest {
    id: RechargeId,
    created_at: DateTime<Utc>,
    agent_id: UserId,
    chef_agence_id: UserId,
    amount: Money,
    motif: Option<String>,
    status: RechargeStatus,
    rejection_reason: Option<String>,
    processed_by: Option<UserId>,
    processing_date: Option<DateTime<Utc>>,
    version: u64,
    #[serde(skip)]
    created: bool,
}

impl RechargeRequest {
    pub fn empty(id: RechargeId) -> Self {
        Self {
            id,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            agent_id: UserId::nil(),
            chef_agence_id: UserId::nil(),
            amount: Money::ZERO,
            motif: None,
            status: RechargeStatus::PendingChef,
            rejection_reason: None,
            processed_by: None,
            processing_date: None,
            version: 0,
            created: false,
        }
    }

    pub fn recharge_id(&self) -> RechargeId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn agent_id(&self) -> UserId {
        self.agent_id
    }

    pub fn chef_agence_id(&self) -> UserId {
        self.chef_agence_id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn motif(&self) -> Option<&str> {
        self.motif.as_deref()
    }

    pub fn status(&self) -> RechargeStatus {
        self.status
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn processed_by(&self) -> Option<UserId> {
        self.processed_by
    }

    pub fn processing_date(&self) -> Option<DateTime<Utc>> {
        self.processing_date
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn resource(&self) -> Resource {
        Resource::Recharge {
            agent_id: self.agent_id,
            chef_agence_id: self.chef_agence_id,
        }
    }
}

impl AggregateRoot for RechargeRequest {
    type Id = RechargeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RequestRecharge.
///
/// `chef_agence_id` is resolved by the caller from the agent's agency record.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRecharge {
    pub grant: Grant,
    pub chef_agence_id: UserId,
    pub amount: Money,
    pub motif: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveRecharge.
#[derive(Debug, Clone, PartialEq)]
pub struct ApproveRecharge {
    pub grant: Grant,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectRecharge.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectRecharge {
    pub grant: Grant,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RechargeCommand {
    Request(RequestRecharge),
    Approve(ApproveRecharge),
    Reject(RejectRecharge),
}

/// Event: RechargeRequested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RechargeRequested {
    pub recharge_id: RechargeId,
    pub agent_id: UserId,
    pub chef_agence_id: UserId,
    pub amount: Money,
    pub motif: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RechargeApproved. The store credits `amount` to `agent_id` in the same write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RechargeApproved {
    pub recharge_id: RechargeId,
    pub by: UserId,
    pub agent_id: UserId,
    pub amount: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RechargeRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RechargeRejected {
    pub recharge_id: RechargeId,
    pub by: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RechargeEvent {
    Requested(RechargeRequested),
    Approved(RechargeApproved),
    Rejected(RechargeRejected),
}

impl Event for RechargeEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RechargeEvent::Requested(_) => "recharges.recharge.requested",
            RechargeEvent::Approved(_) => "recharges.recharge.approved",
            RechargeEvent::Rejected(_) => "recharges.recharge.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RechargeEvent::Requested(e) => e.occurred_at,
            RechargeEvent::Approved(e) => e.occurred_at,
            RechargeEvent::Rejected(e) => e.occurred_at,
        }
    }
}

impl Aggregate for RechargeRequest {
    type Command = RechargeCommand;
    type Event = RechargeEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            RechargeEvent::Requested(e) => {
                self.id = e.recharge_id;
                self.created_at = e.occurred_at;
                self.agent_id = e.agent_id;
                self.chef_agence_id = e.chef_agence_id;
                self.amount = e.amount;
                self.motif = e.motif.clone();
                self.status = RechargeStatus::PendingChef;
                self.created = true;
            }
            RechargeEvent::Approved(e) => {
                self.status = RechargeStatus::Approved;
                self.processed_by = Some(e.by);
                self.processing_date = Some(e.occurred_at);
            }
            RechargeEvent::Rejected(e) => {
                self.status = RechargeStatus::Rejected;
                self.processed_by = Some(e.by);
                self.rejection_reason = Some(e.reason.clone());
                self.processing_date = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            RechargeCommand::Request(cmd) => self.handle_request(cmd),
            RechargeCommand::Approve(cmd) => self.handle_approve(cmd),
            RechargeCommand::Reject(cmd) => self.handle_reject(cmd),
        }
    }
}

impl RechargeRequest {
    fn ensure_grant(grant: &Grant, action: Action) -> Result<(), DomainError> {
        if grant.workflow() != Workflow::Recharges || grant.action() != action {
            return Err(DomainError::invariant(format!(
                "grant for {:?}/{:?} used for recharges/{action:?}",
                grant.workflow(),
                grant.action()
            )));
        }
        Ok(())
    }

    fn ensure_decidable_by(&self, grant: &Grant) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.status.is_terminal() {
            return Err(DomainError::already_finalized(self.status.as_str()));
        }
        if !grant.overrides_assignment() && grant.actor_id() != self.chef_agence_id {
            return Err(DomainError::permission_denied(
                "only the agency chef may decide this recharge request",
            ));
        }
        Ok(())
    }

    fn handle_request(&self, cmd: &RequestRecharge) -> Result<Vec<RechargeEvent>, DomainError> {
        Self::ensure_grant(&cmd.grant, Action::Submit)?;
        if self.created {
            return Err(DomainError::conflict("recharge request already exists"));
        }
        if !cmd.amount.is_positive() {
            return Err(DomainError::validation("recharge amount must be positive"));
        }
        if cmd.chef_agence_id == cmd.grant.actor_id() {
            return Err(DomainError::validation("a recharge request cannot be addressed to its requester"));
        }

        let motif = cmd
            .motif
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_owned);

        Ok(vec![RechargeEvent::Requested(RechargeRequested {
            recharge_id: self.id,
            agent_id: cmd.grant.actor_id(),
            chef_agence_id: cmd.chef_agence_id,
            amount: cmd.amount,
            motif,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveRecharge) -> Result<Vec<RechargeEvent>, DomainError> {
        Self::ensure_grant(&cmd.grant, Action::Approve)?;
        self.ensure_decidable_by(&cmd.grant)?;

        Ok(vec![RechargeEvent::Approved(RechargeApproved {
            recharge_id: self.id,
            by: cmd.grant.actor_id(),
            agent_id: self.agent_id,
            amount: self.amount,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectRecharge) -> Result<Vec<RechargeEvent>, DomainError> {
        Self::ensure_grant(&cmd.grant, Action::Reject)?;
        self.ensure_decidable_by(&cmd.grant)?;

        let reason = cmd.reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("rejection_reason must not be empty"));
        }

        Ok(vec![RechargeEvent::Rejected(RechargeRejected {
            recharge_id: self.id,
            by: cmd.grant.actor_id(),
            reason: reason.to_owned(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agencyops_auth::{Actor, authorize};
    use agencyops_core::AgencyId;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    struct Fixture {
        agent: Actor,
        chef: Actor,
    }

    fn fixture() -> Fixture {
        let agency = AgencyId::new();
        Fixture {
            agent: Actor::Agent {
                id: UserId::new(),
                agency_id: Some(agency),
            },
            chef: Actor::ChefAgence {
                id: UserId::new(),
                agency_id: Some(agency),
            },
        }
    }

    fn requested(f: &Fixture, amount: i64) -> RechargeRequest {
        let cmd = RechargeCommand::Request(RequestRecharge {
            grant: authorize(&f.agent, Workflow::Recharges, Action::Submit, &Resource::None).unwrap(),
            chef_agence_id: f.chef.id(),
            amount: Money::new(amount),
            motif: Some("  fin de mois ".into()),
            occurred_at: now(),
        });
        RechargeRequest::empty(RechargeId::new()).execute(&cmd).unwrap().0
    }

    fn approve(actor: &Actor, r: &RechargeRequest) -> Result<(RechargeRequest, Vec<RechargeEvent>), DomainError> {
        let grant = authorize(actor, Workflow::Recharges, Action::Approve, &r.resource()).unwrap();
        r.execute(&RechargeCommand::Approve(ApproveRecharge {
            grant,
            occurred_at: now(),
        }))
    }

    fn reject(actor: &Actor, r: &RechargeRequest, reason: &str) -> Result<(RechargeRequest, Vec<RechargeEvent>), DomainError> {
        let grant = authorize(actor, Workflow::Recharges, Action::Reject, &r.resource()).unwrap();
        r.execute(&RechargeCommand::Reject(RejectRecharge {
            grant,
            reason: reason.into(),
            occurred_at: now(),
        }))
    }

    #[test]
    fn request_is_routed_to_the_chef() {
        let f = fixture();
        let r = requested(&f, 100_000);
        assert_eq!(r.status(), RechargeStatus::PendingChef);
        assert_eq!(r.chef_agence_id(), f.chef.id());
        assert_eq!(r.agent_id(), f.agent.id());
        assert_eq!(r.motif(), Some("fin de mois"));
    }

    #[test]
    fn non_positive_amount_is_refused() {
        let f = fixture();
        let cmd = RechargeCommand::Request(RequestRecharge {
            grant: authorize(&f.agent, Workflow::Recharges, Action::Submit, &Resource::None).unwrap(),
            chef_agence_id: f.chef.id(),
            amount: Money::ZERO,
            motif: None,
            occurred_at: now(),
        });
        let err = RechargeRequest::empty(RechargeId::new()).handle(&cmd).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn chef_approval_emits_credit() {
        let f = fixture();
        let r = requested(&f, 75_000);
        let (done, events) = approve(&f.chef, &r).unwrap();

        assert_eq!(done.status(), RechargeStatus::Approved);
        assert!(done.processing_date().is_some());
        assert_eq!(
            events,
            vec![RechargeEvent::Approved(RechargeApproved {
                recharge_id: r.recharge_id(),
                by: f.chef.id(),
                agent_id: f.agent.id(),
                amount: Money::new(75_000),
                occurred_at: done.processing_date().unwrap(),
            })]
        );
    }

    #[test]
    fn admin_may_decide_any_request() {
        let f = fixture();
        let admin = Actor::AdminGeneral { id: UserId::new() };
        let (done, _) = reject(&admin, &requested(&f, 10), "justificatif manquant").unwrap();
        assert_eq!(done.status(), RechargeStatus::Rejected);
        assert_eq!(done.processed_by(), Some(admin.id()));
    }

    #[test]
    fn reject_requires_reason_and_decisions_are_final() {
        let f = fixture();
        let r = requested(&f, 10_000);
        assert!(matches!(reject(&f.chef, &r, ""), Err(DomainError::Validation(_))));

        let (done, _) = reject(&f.chef, &r, "montant incohérent").unwrap();
        assert_eq!(done.rejection_reason(), Some("montant incohérent"));
        assert_eq!(
            approve(&f.chef, &done).unwrap_err(),
            DomainError::AlreadyFinalized("rejected".into())
        );
    }
}
