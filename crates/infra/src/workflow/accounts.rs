use chrono::Utc;

use agencyops_auth::{Action, Resource, SubAdminPermissions, Workflow};
use agencyops_core::{EntityKind, Money, UserId};
use agencyops_directory::{Profile, ProfileChange, ProfileStatus};
use agencyops_events::{EventBus, TransitionEvent};

use crate::error::WorkflowError;
use crate::store::{EntityStore, UnitOfWork};
use crate::workflow::{Engine, log_refusal};

pub(crate) fn profile_resource(profile: &Profile) -> Resource {
    Resource::Profile {
        user_id: profile.id,
        role: profile.role,
        agency_id: profile.agency_id,
    }
}

impl<S, B> Engine<S, B>
where
    S: EntityStore,
    B: EventBus<TransitionEvent>,
{
    /// Move earned commission into the actor's own operating balance.
    #[tracing::instrument(skip(self))]
    pub fn transfer_commissions(&self, actor_id: UserId, amount: Money) -> Result<Profile, WorkflowError> {
        self.try_transfer_commissions(actor_id, amount)
            .inspect_err(|err| log_refusal("transfer_commissions", err))
    }

    fn try_transfer_commissions(&self, actor_id: UserId, amount: Money) -> Result<Profile, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let me = self.load_profile(actor_id)?;
        self.grant(&actor, Workflow::Accounts, Action::TransferCommissions, &profile_resource(&me))?;

        let mut uow = UnitOfWork::new();
        uow.change_profile(actor_id, ProfileChange::ConvertCommission(amount));
        let audit = TransitionEvent::new(
            actor_id,
            "transfer_commissions",
            EntityKind::Profile,
            actor_id,
            Some(me.status.as_str()),
            me.status.as_str(),
            Utc::now(),
        );
        self.commit(uow, audit)?;

        self.load_profile(actor_id)
    }

    /// Suspend or reactivate a user. Suspension requires a reason.
    #[tracing::instrument(skip(self, reason))]
    pub fn set_user_status(
        &self,
        actor_id: UserId,
        target_id: UserId,
        status: ProfileStatus,
        reason: Option<String>,
    ) -> Result<Profile, WorkflowError> {
        self.try_set_user_status(actor_id, target_id, status, reason)
            .inspect_err(|err| log_refusal("set_user_status", err))
    }

    fn try_set_user_status(
        &self,
        actor_id: UserId,
        target_id: UserId,
        status: ProfileStatus,
        reason: Option<String>,
    ) -> Result<Profile, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let target = self.load_profile(target_id)?;
        self.grant(&actor, Workflow::Accounts, Action::SetStatus, &profile_resource(&target))?;
        if target_id == actor_id {
            return Err(WorkflowError::Validation("users cannot change their own status".to_string()));
        }

        let mut uow = UnitOfWork::new();
        uow.change_profile(target_id, ProfileChange::SetStatus { status, reason });
        let audit = TransitionEvent::new(
            actor_id,
            "set_status",
            EntityKind::Profile,
            target_id,
            Some(target.status.as_str()),
            status.as_str(),
            Utc::now(),
        );
        self.commit(uow, audit)?;

        self.load_profile(target_id)
    }

    /// Replace a sous_admin's permission flags.
    #[tracing::instrument(skip(self))]
    pub fn set_sub_admin_permissions(
        &self,
        actor_id: UserId,
        target_id: UserId,
        permissions: SubAdminPermissions,
    ) -> Result<Profile, WorkflowError> {
        self.try_set_sub_admin_permissions(actor_id, target_id, permissions)
            .inspect_err(|err| log_refusal("set_sub_admin_permissions", err))
    }

    fn try_set_sub_admin_permissions(
        &self,
        actor_id: UserId,
        target_id: UserId,
        permissions: SubAdminPermissions,
    ) -> Result<Profile, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let target = self.load_profile(target_id)?;
        self.grant(&actor, Workflow::Accounts, Action::SetPermissions, &profile_resource(&target))?;

        let mut uow = UnitOfWork::new();
        uow.change_profile(target_id, ProfileChange::SetPermissions(permissions));
        let audit = TransitionEvent::new(
            actor_id,
            "set_permissions",
            EntityKind::Profile,
            target_id,
            Some(target.status.as_str()),
            target.status.as_str(),
            Utc::now(),
        );
        self.commit(uow, audit)?;

        self.load_profile(target_id)
    }

    /// The caller's own profile, balances included.
    pub fn whoami(&self, actor_id: UserId) -> Result<Profile, WorkflowError> {
        self.actor(actor_id)?;
        self.load_profile(actor_id)
    }
}
