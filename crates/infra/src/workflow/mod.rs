//! Workflow services: the action endpoints of every workflow.
//!
//! Each action follows the same pipeline:
//!
//! ```text
//! actor id
//!   ↓
//! 1. Resolve the actor from its stored profile (suspended → PermissionDenied)
//!   ↓
//! 2. Load the entity snapshot and authorize → Grant
//!   ↓
//! 3. Aggregate::execute (pure decision + evolution)
//!   ↓
//! 4. Commit one UnitOfWork: guarded entity write + balance changes
//!   ↓
//! 5. Publish the TransitionEvent (failure never rolls back the commit)
//! ```

pub mod accounts;
pub mod catalog;
pub mod proofs;
pub mod recharges;
pub mod requests;
pub mod stats;
pub mod transactions;

use std::sync::Arc;

use agencyops_auth::{Action, Actor, Grant, Resource, Workflow, authorize};
use agencyops_core::{AgencyId, UserId};
use agencyops_directory::Profile;
use agencyops_events::{EventBus, TransitionEvent};

use crate::config::EngineConfig;
use crate::error::WorkflowError;
use crate::ports::{AgencyAccessList, FeePolicy, FlatFeePolicy, InMemoryAgencyAccess, InMemoryProofStorage, ProofStorage};
use crate::store::{EntityStore, UnitOfWork};

/// Entry point of every workflow action.
///
/// Generic over the entity store and the audit bus so tests run against the
/// in-memory implementations and other backends slot in unchanged.
pub struct Engine<S, B> {
    store: S,
    bus: B,
    fees: Arc<dyn FeePolicy>,
    access: Arc<dyn AgencyAccessList>,
    proofs: Arc<dyn ProofStorage>,
    config: EngineConfig,
}

impl<S, B> Engine<S, B> {
    /// Engine with a flat fee policy from `config` and in-memory collaborators.
    pub fn new(store: S, bus: B, config: EngineConfig) -> Self {
        Self {
            store,
            bus,
            fees: Arc::new(FlatFeePolicy::new(config.default_fee)),
            access: Arc::new(InMemoryAgencyAccess::new()),
            proofs: Arc::new(InMemoryProofStorage::default()),
            config,
        }
    }

    pub fn with_fee_policy(mut self, fees: Arc<dyn FeePolicy>) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_access_list(mut self, access: Arc<dyn AgencyAccessList>) -> Self {
        self.access = access;
        self
    }

    pub fn with_proof_storage(mut self, proofs: Arc<dyn ProofStorage>) -> Self {
        self.proofs = proofs;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn proofs(&self) -> &dyn ProofStorage {
        self.proofs.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl<S, B> Engine<S, B>
where
    S: EntityStore,
    B: EventBus<TransitionEvent>,
{
    /// Resolve the acting user from the store.
    ///
    /// Role, agency and permissions come from the stored profile, never from
    /// the caller, so a suspension takes effect on the next action.
    pub fn actor(&self, user_id: UserId) -> Result<Actor, WorkflowError> {
        let profile = self
            .store
            .profile(user_id)?
            .ok_or_else(|| WorkflowError::PermissionDenied(format!("unknown user {user_id}")))?;
        Ok(profile.to_actor()?)
    }

    pub(crate) fn load_profile(&self, user_id: UserId) -> Result<Profile, WorkflowError> {
        self.store
            .profile(user_id)?
            .ok_or_else(|| WorkflowError::not_found(format!("profile {user_id}")))
    }

    pub(crate) fn grant(
        &self,
        actor: &Actor,
        workflow: Workflow,
        action: Action,
        resource: &Resource,
    ) -> Result<Grant, WorkflowError> {
        authorize(actor, workflow, action, resource).map_err(|err| {
            tracing::warn!(actor = %actor.id(), error = %err, "action refused");
            WorkflowError::from(err)
        })
    }

    /// Commit `uow`, then publish the audit record of the transition.
    pub(crate) fn commit(&self, uow: UnitOfWork, transition: TransitionEvent) -> Result<(), WorkflowError> {
        self.store.commit(uow)?;

        tracing::info!(
            actor = %transition.actor,
            action = %transition.action,
            entity_type = %transition.entity_type,
            entity_id = %transition.entity_id,
            before = transition.before_status.as_deref().unwrap_or("-"),
            after = %transition.after_status,
            "transition committed"
        );

        self.bus.publish(transition).map_err(|err| {
            tracing::error!(error = %err, "failed to publish transition after commit");
            WorkflowError::Publish(err.to_string())
        })
    }
}

/// Log a refused action at the level its kind deserves.
pub(crate) fn log_refusal(action: &'static str, err: &WorkflowError) {
    match err {
        WorkflowError::Config(_) | WorkflowError::Store(_) => {
            tracing::error!(action, code = err.code(), error = %err, "action failed");
        }
        WorkflowError::Publish(_) => {}
        _ => tracing::warn!(action, code = err.code(), error = %err, "action refused"),
    }
}

/// The agency an agent submits for; other roles never submit.
pub(crate) fn submitting_agency(actor: &Actor, what: &str) -> Result<AgencyId, WorkflowError> {
    match *actor {
        Actor::Agent {
            agency_id: Some(agency_id),
            ..
        } => Ok(agency_id),
        Actor::Agent { agency_id: None, .. } => {
            Err(WorkflowError::Validation("agent is not attached to an agency".to_string()))
        }
        _ => Err(WorkflowError::PermissionDenied(format!("{} may not {what}", actor.role()))),
    }
}
