use chrono::Utc;

use agencyops_auth::{Action, Resource, Workflow};
use agencyops_catalog::{OperationType, OperationTypeStatus};
use agencyops_core::{AgencyId, EntityKind, ExpectedVersion, OperationTypeId, UserId};
use agencyops_directory::{Agency, Profile};
use agencyops_events::{EventBus, TransitionEvent};

use crate::error::WorkflowError;
use crate::store::{EntityStore, Guard, UnitOfWork};
use crate::workflow::{Engine, log_refusal};

fn op_status(op: &OperationType) -> &'static str {
    match op.status {
        OperationTypeStatus::Active => "active",
        OperationTypeStatus::Inactive => "inactive",
        OperationTypeStatus::Archived => "archived",
    }
}

impl<S, B> Engine<S, B>
where
    S: EntityStore,
    B: EventBus<TransitionEvent>,
{
    /// Add an operation type to the catalog after validating its schema and
    /// commission config.
    #[tracing::instrument(skip(self, op_type), fields(op_type = %op_type.id))]
    pub fn register_operation_type(&self, actor_id: UserId, op_type: OperationType) -> Result<OperationType, WorkflowError> {
        self.try_register_operation_type(actor_id, op_type)
            .inspect_err(|err| log_refusal("register_operation_type", err))
    }

    fn try_register_operation_type(&self, actor_id: UserId, op_type: OperationType) -> Result<OperationType, WorkflowError> {
        let actor = self.actor(actor_id)?;
        self.grant(&actor, Workflow::Catalog, Action::Manage, &Resource::None)?;
        op_type.validate()?;

        let mut uow = UnitOfWork::new();
        uow.put_operation_type(op_type.clone(), Guard::Absent);
        let audit = TransitionEvent::new(
            actor_id,
            "register",
            EntityKind::OperationType,
            &op_type.id,
            None,
            op_status(&op_type),
            Utc::now(),
        );
        self.commit(uow, audit)?;
        Ok(op_type)
    }

    /// Toggle an operation type's lifecycle status; nothing else is editable
    /// once transactions may reference it.
    #[tracing::instrument(skip(self))]
    pub fn set_operation_type_status(
        &self,
        actor_id: UserId,
        id: &OperationTypeId,
        status: OperationTypeStatus,
    ) -> Result<OperationType, WorkflowError> {
        self.try_set_operation_type_status(actor_id, id, status)
            .inspect_err(|err| log_refusal("set_operation_type_status", err))
    }

    fn try_set_operation_type_status(
        &self,
        actor_id: UserId,
        id: &OperationTypeId,
        status: OperationTypeStatus,
    ) -> Result<OperationType, WorkflowError> {
        let actor = self.actor(actor_id)?;
        self.grant(&actor, Workflow::Catalog, Action::Manage, &Resource::None)?;
        let current = self
            .store()
            .operation_type(id)?
            .ok_or_else(|| WorkflowError::not_found(format!("operation type {id}")))?;

        let mut updated = current.clone();
        updated.status = status;
        updated.validate()?;

        let mut uow = UnitOfWork::new();
        uow.put_operation_type(updated.clone(), Guard::Version(ExpectedVersion::Any));
        let audit = TransitionEvent::new(
            actor_id,
            "set_status",
            EntityKind::OperationType,
            id,
            Some(op_status(&current)),
            op_status(&updated),
            Utc::now(),
        );
        self.commit(uow, audit)?;
        Ok(updated)
    }

    /// Replace the list of operation types an agency may submit.
    #[tracing::instrument(skip(self, op_type_ids))]
    pub fn set_agency_access(
        &self,
        actor_id: UserId,
        agency_id: AgencyId,
        op_type_ids: Vec<OperationTypeId>,
    ) -> Result<Vec<OperationTypeId>, WorkflowError> {
        let actor = self.actor(actor_id)?;
        if !actor.is_admin_general() {
            let err = WorkflowError::PermissionDenied(format!("{} may not edit agency access", actor.role()));
            log_refusal("set_agency_access", &err);
            return Err(err);
        }
        if self.store().agency(agency_id)?.is_none() {
            return Err(WorkflowError::not_found(format!("agency {agency_id}")));
        }
        for id in &op_type_ids {
            if self.store().operation_type(id)?.is_none() {
                return Err(WorkflowError::Validation(format!("unknown operation type '{id}'")));
            }
        }

        self.access.set(agency_id, op_type_ids)?;
        tracing::info!(actor = %actor_id, agency = %agency_id, "agency access replaced");
        Ok(self.access.enabled_for(agency_id)?)
    }

    /// Active operation types the agent's agency may submit.
    pub fn available_operation_types(&self, actor_id: UserId) -> Result<Vec<OperationType>, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let Some(agency_id) = actor.agency_id() else {
            return Ok(Vec::new());
        };
        let enabled = self.access.enabled_for(agency_id)?;
        Ok(self
            .store()
            .operation_types()?
            .into_iter()
            .filter(|op| op.is_active() && enabled.contains(&op.id))
            .collect())
    }

    /// Seed or replace directory rows. Bootstrap only; no authorization.
    pub fn provision(&self, agencies: Vec<Agency>, profiles: Vec<Profile>) -> Result<(), WorkflowError> {
        let mut uow = UnitOfWork::new();
        let upsert = |exists: bool| {
            if exists {
                Guard::Version(ExpectedVersion::Any)
            } else {
                Guard::Absent
            }
        };
        for agency in agencies {
            let exists = self.store().agency(agency.id)?.is_some();
            uow.put_agency(agency, upsert(exists));
        }
        for profile in profiles {
            let exists = self.store().profile(profile.id)?.is_some();
            uow.put_profile(profile, upsert(exists));
        }
        Ok(self.store().commit(uow)?)
    }
}
