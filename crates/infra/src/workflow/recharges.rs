use chrono::Utc;
use serde::Deserialize;

use agencyops_auth::{Action, Actor, Resource, Workflow};
use agencyops_core::{Aggregate, AggregateRoot, EntityKind, ExpectedVersion, Money, RechargeId, UserId};
use agencyops_directory::{Profile, ProfileChange};
use agencyops_events::{EventBus, TransitionEvent};
use agencyops_recharges::{
    ApproveRecharge, RechargeCommand, RechargeEvent, RechargeRequest, RejectRecharge, RequestRecharge,
};

use crate::error::WorkflowError;
use crate::store::{EntityStore, Guard, ListFilter, UnitOfWork};
use crate::workflow::{Engine, log_refusal, submitting_agency};

#[derive(Debug, Clone, Deserialize)]
pub struct NewRecharge {
    pub amount: Money,
    #[serde(default)]
    pub motif: Option<String>,
}

/// Outcome of a chef-to-agent transfer; there is no request entity behind it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DirectRecharge {
    pub chef: Profile,
    pub agent: Profile,
    pub amount: Money,
}

fn recharge_transition(
    actor: &Actor,
    action: &str,
    before: Option<&RechargeRequest>,
    after: &RechargeRequest,
    events: &[RechargeEvent],
    at: chrono::DateTime<Utc>,
) -> TransitionEvent {
    let record = TransitionEvent::new(
        actor.id(),
        action,
        EntityKind::RechargeRequest,
        after.recharge_id(),
        before.map(|r| r.status().as_str()),
        after.status().as_str(),
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
    /// File a top-up request, routed to the chef of the agent's agency.
    #[tracing::instrument(skip(self, input), fields(amount = %input.amount))]
    pub fn request_recharge(&self, actor_id: UserId, input: NewRecharge) -> Result<RechargeRequest, WorkflowError> {
        self.try_request_recharge(actor_id, input)
            .inspect_err(|err| log_refusal("request_recharge", err))
    }

    fn try_request_recharge(&self, actor_id: UserId, input: NewRecharge) -> Result<RechargeRequest, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let grant = self.grant(&actor, Workflow::Recharges, Action::Submit, &Resource::None)?;

        let agency_id = submitting_agency(&actor, "request recharges")?;
        let agency = self
            .store()
            .agency(agency_id)?
            .ok_or_else(|| WorkflowError::not_found(format!("agency {agency_id}")))?;
        let chef_agence_id = agency.chef_id.ok_or(WorkflowError::NoAgencyChef(agency_id))?;

        let now = Utc::now();
        let command = RechargeCommand::Request(RequestRecharge {
            grant,
            chef_agence_id,
            amount: input.amount,
            motif: input.motif,
            occurred_at: now,
        });
        let (created, events) = RechargeRequest::empty(RechargeId::new()).execute(&command)?;

        let mut uow = UnitOfWork::new();
        uow.put_recharge(created.clone(), Guard::Absent);
        self.commit(uow, recharge_transition(&actor, "request", None, &created, &events, now))?;
        Ok(created)
    }

    /// Recharge requests awaiting the actor's decision (all of them for admin_general).
    pub fn pending_recharges(&self, actor_id: UserId) -> Result<Vec<RechargeRequest>, WorkflowError> {
        let actor = self.actor(actor_id)?;
        self.grant(&actor, Workflow::Recharges, Action::ViewQueue, &Resource::None)?;
        let filter = if actor.is_admin_general() {
            ListFilter::open()
        } else {
            ListFilter::open().decided_by(actor.id())
        };
        Ok(self.store().recharges(&filter)?)
    }

    /// The agent's own recharge requests, oldest first.
    pub fn my_recharges(&self, actor_id: UserId) -> Result<Vec<RechargeRequest>, WorkflowError> {
        let actor = self.actor(actor_id)?;
        Ok(self.store().recharges(&ListFilter::default().owned_by(actor.id()))?)
    }

    /// Approve, crediting the agent in the same commit.
    #[tracing::instrument(skip(self))]
    pub fn approve_recharge(&self, actor_id: UserId, id: RechargeId) -> Result<RechargeRequest, WorkflowError> {
        self.try_approve_recharge(actor_id, id)
            .inspect_err(|err| log_refusal("approve_recharge", err))
    }

    fn try_approve_recharge(&self, actor_id: UserId, id: RechargeId) -> Result<RechargeRequest, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let request = self.load_recharge(id)?;
        let grant = self.grant(&actor, Workflow::Recharges, Action::Approve, &request.resource())?;

        let now = Utc::now();
        let (approved, events) = request.execute(&RechargeCommand::Approve(ApproveRecharge { grant, occurred_at: now }))?;

        let mut uow = UnitOfWork::new();
        uow.put_recharge(approved.clone(), Guard::Version(ExpectedVersion::Exact(request.version())));
        for event in &events {
            if let RechargeEvent::Approved(e) = event {
                uow.change_profile(e.agent_id, ProfileChange::Credit(e.amount));
            }
        }

        self.commit(uow, recharge_transition(&actor, "approve", Some(&request), &approved, &events, now))?;
        Ok(approved)
    }

    #[tracing::instrument(skip(self, reason))]
    pub fn reject_recharge(&self, actor_id: UserId, id: RechargeId, reason: &str) -> Result<RechargeRequest, WorkflowError> {
        self.try_reject_recharge(actor_id, id, reason)
            .inspect_err(|err| log_refusal("reject_recharge", err))
    }

    fn try_reject_recharge(&self, actor_id: UserId, id: RechargeId, reason: &str) -> Result<RechargeRequest, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let request = self.load_recharge(id)?;
        let grant = self.grant(&actor, Workflow::Recharges, Action::Reject, &request.resource())?;

        let now = Utc::now();
        let (rejected, events) = request.execute(&RechargeCommand::Reject(RejectRecharge {
            grant,
            reason: reason.to_owned(),
            occurred_at: now,
        }))?;

        let mut uow = UnitOfWork::new();
        uow.put_recharge(rejected.clone(), Guard::Version(ExpectedVersion::Exact(request.version())));
        self.commit(uow, recharge_transition(&actor, "reject", Some(&request), &rejected, &events, now))?;
        Ok(rejected)
    }

    /// Move `amount` from the chef's balance to an agent of their agency.
    #[tracing::instrument(skip(self))]
    pub fn direct_recharge(&self, actor_id: UserId, agent_id: UserId, amount: Money) -> Result<DirectRecharge, WorkflowError> {
        self.try_direct_recharge(actor_id, agent_id, amount)
            .inspect_err(|err| log_refusal("direct_recharge", err))
    }

    fn try_direct_recharge(&self, actor_id: UserId, agent_id: UserId, amount: Money) -> Result<DirectRecharge, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let agent = self.load_profile(agent_id)?;
        let resource = Resource::Profile {
            user_id: agent.id,
            role: agent.role,
            agency_id: agent.agency_id,
        };
        self.grant(&actor, Workflow::Recharges, Action::DirectRecharge, &resource)?;

        if !amount.is_positive() {
            return Err(WorkflowError::Validation("recharge amount must be positive".to_string()));
        }
        if agent_id == actor.id() {
            return Err(WorkflowError::Validation("cannot recharge oneself".to_string()));
        }
        if !agent.is_active() {
            return Err(WorkflowError::Validation(format!("agent {agent_id} is suspended")));
        }

        let mut uow = UnitOfWork::new();
        uow.change_profile(actor.id(), ProfileChange::Debit(amount))
            .change_profile(agent_id, ProfileChange::Credit(amount));

        let audit = TransitionEvent::new(
            actor.id(),
            "direct_recharge",
            EntityKind::Profile,
            agent_id,
            Some(agent.status.as_str()),
            agent.status.as_str(),
            Utc::now(),
        );
        self.commit(uow, audit)?;

        Ok(DirectRecharge {
            chef: self.load_profile(actor.id())?,
            agent: self.load_profile(agent_id)?,
            amount,
        })
    }

    fn load_recharge(&self, id: RechargeId) -> Result<RechargeRequest, WorkflowError> {
        self.store()
            .recharge(id)?
            .ok_or_else(|| WorkflowError::not_found(format!("recharge request {id}")))
    }
}
