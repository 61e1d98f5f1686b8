//! Dashboard figures, scoped to what the viewer's role may see.
//!
//! Every figure is recomputed from the stored rows on each call; "this month"
//! is the current UTC calendar month.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;

use agencyops_auth::{Action, Resource, Role, SubAdminPermissions, Workflow};
use agencyops_catalog::OperationTypeStatus;
use agencyops_core::{AgencyId, Money, UserId};
use agencyops_directory::{Profile, ProfileStatus};
use agencyops_events::{EventBus, TransitionEvent};
use agencyops_transactions::{Transaction, TransactionStatus};

use crate::error::WorkflowError;
use crate::store::{Assignee, EntityStore, ListFilter};
use crate::workflow::accounts::profile_resource;
use crate::workflow::{Engine, log_refusal};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentDashboard {
    pub solde: Money,
    pub commissions_dues: Money,
    pub transactions_this_month: usize,
    pub pending_transactions: usize,
    /// Commission carried by this month's submissions that were not rejected.
    pub estimated_commissions_this_month: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChefDashboard {
    pub solde: Money,
    pub commissions_dues: Money,
    pub active_agents: usize,
    /// Principal of the agency's transactions validated this month.
    pub agency_volume_this_month: Money,
    pub agency_commissions_this_month: Money,
    pub pending_recharges: usize,
}

/// Queue sizes; a count is `None` when the sub-admin lacks the flag for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SousAdminDashboard {
    pub assigned_transactions: Option<usize>,
    pub unassigned_transactions: Option<usize>,
    pub assigned_requests: Option<usize>,
    pub unassigned_requests: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalDashboard {
    /// Open transactions, claimed or not.
    pub pending_validations: usize,
    pub pending_recharges: usize,
    pub open_requests: usize,
    pub validated_transactions: usize,
    pub rejected_transactions: usize,
    pub total_volume: Money,
    pub volume_this_month: Money,
    pub active_users: usize,
    pub agencies: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogDashboard {
    pub active_operation_types: usize,
    pub inactive_operation_types: usize,
    pub archived_operation_types: usize,
}

/// The dashboard of one user, shaped by that user's role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Dashboard {
    Agent(AgentDashboard),
    ChefAgence(ChefDashboard),
    SousAdmin(SousAdminDashboard),
    AdminGeneral(GlobalDashboard),
    Developpeur(CatalogDashboard),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgencyStats {
    pub id: AgencyId,
    pub name: String,
    pub chef_id: Option<UserId>,
    pub chef_name: Option<String>,
    pub agent_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubAdminStats {
    pub id: UserId,
    pub name: String,
    pub status: ProfileStatus,
    pub suspension_reason: Option<String>,
    pub permissions: SubAdminPermissions,
    /// Open transactions and support requests currently held.
    pub assigned_tasks: usize,
}

/// Midnight UTC on the first day of the month containing `at`.
pub fn month_start(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(at.year(), at.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(at)
}

fn total(amounts: impl IntoIterator<Item = Money>) -> Result<Money, WorkflowError> {
    Ok(amounts
        .into_iter()
        .try_fold(Money::ZERO, |acc, amount| acc.checked_add(amount))?)
}

fn validated_since(tx: &Transaction, since: DateTime<Utc>) -> bool {
    tx.status() == TransactionStatus::Validated && tx.processed_at().is_some_and(|at| at >= since)
}

impl<S, B> Engine<S, B>
where
    S: EntityStore,
    B: EventBus<TransitionEvent>,
{
    /// Dashboard of `user_id`: one's own, or an agent's for their chef.
    #[tracing::instrument(skip(self))]
    pub fn dashboard(&self, actor_id: UserId, user_id: UserId) -> Result<Dashboard, WorkflowError> {
        self.try_dashboard(actor_id, user_id)
            .inspect_err(|err| log_refusal("dashboard", err))
    }

    fn try_dashboard(&self, actor_id: UserId, user_id: UserId) -> Result<Dashboard, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let profile = self.load_profile(user_id)?;
        self.grant(&actor, Workflow::Dashboards, Action::Read, &profile_resource(&profile))?;

        let since = month_start(Utc::now());
        Ok(match profile.role {
            Role::Agent => Dashboard::Agent(self.agent_dashboard(&profile, since)?),
            Role::ChefAgence => Dashboard::ChefAgence(self.chef_dashboard(&profile, since)?),
            Role::SousAdmin => Dashboard::SousAdmin(self.sous_admin_dashboard(&profile)?),
            Role::AdminGeneral => Dashboard::AdminGeneral(self.global_figures(since)?),
            Role::Developpeur => Dashboard::Developpeur(self.catalog_dashboard()?),
        })
    }

    /// Network-wide figures.
    #[tracing::instrument(skip(self))]
    pub fn global_dashboard(&self, actor_id: UserId) -> Result<GlobalDashboard, WorkflowError> {
        self.try_global_dashboard(actor_id)
            .inspect_err(|err| log_refusal("global_dashboard", err))
    }

    fn try_global_dashboard(&self, actor_id: UserId) -> Result<GlobalDashboard, WorkflowError> {
        let actor = self.actor(actor_id)?;
        self.grant(&actor, Workflow::Dashboards, Action::ViewStats, &Resource::None)?;
        self.global_figures(month_start(Utc::now()))
    }

    /// Every agency with its chef's name and agent headcount.
    #[tracing::instrument(skip(self))]
    pub fn agency_list_with_stats(&self, actor_id: UserId) -> Result<Vec<AgencyStats>, WorkflowError> {
        self.try_agency_list_with_stats(actor_id)
            .inspect_err(|err| log_refusal("agency_list_with_stats", err))
    }

    fn try_agency_list_with_stats(&self, actor_id: UserId) -> Result<Vec<AgencyStats>, WorkflowError> {
        let actor = self.actor(actor_id)?;
        self.grant(&actor, Workflow::Dashboards, Action::ViewStats, &Resource::None)?;

        let profiles = self.store().profiles()?;
        let agencies = self.store().agencies()?;
        Ok(agencies
            .into_iter()
            .map(|agency| {
                let chef_name = agency
                    .chef_id
                    .and_then(|chef| profiles.iter().find(|p| p.id == chef))
                    .map(|chef| chef.name.clone());
                let agent_count = profiles
                    .iter()
                    .filter(|p| p.role == Role::Agent && p.agency_id == Some(agency.id))
                    .count();
                AgencyStats {
                    id: agency.id,
                    name: agency.name,
                    chef_id: agency.chef_id,
                    chef_name,
                    agent_count,
                }
            })
            .collect())
    }

    /// Every sub-admin with their permission flags and current workload.
    #[tracing::instrument(skip(self))]
    pub fn sub_admin_list_with_stats(&self, actor_id: UserId) -> Result<Vec<SubAdminStats>, WorkflowError> {
        self.try_sub_admin_list_with_stats(actor_id)
            .inspect_err(|err| log_refusal("sub_admin_list_with_stats", err))
    }

    fn try_sub_admin_list_with_stats(&self, actor_id: UserId) -> Result<Vec<SubAdminStats>, WorkflowError> {
        let actor = self.actor(actor_id)?;
        self.grant(&actor, Workflow::Dashboards, Action::ViewStats, &Resource::None)?;

        let open_transactions = self.store().transactions(&ListFilter::open())?;
        let open_requests = self.store().support_requests(&ListFilter::open())?;
        Ok(self
            .store()
            .profiles()?
            .into_iter()
            .filter(|p| p.role == Role::SousAdmin)
            .map(|p| {
                let held = open_transactions
                    .iter()
                    .filter(|tx| tx.assigned_to() == Some(p.id))
                    .count()
                    + open_requests
                        .iter()
                        .filter(|req| req.assigned_to() == Some(p.id))
                        .count();
                SubAdminStats {
                    id: p.id,
                    name: p.name,
                    status: p.status,
                    suspension_reason: p.suspension_reason,
                    permissions: p.permissions.unwrap_or_else(SubAdminPermissions::none),
                    assigned_tasks: held,
                }
            })
            .collect())
    }

    fn agent_dashboard(&self, agent: &Profile, since: DateTime<Utc>) -> Result<AgentDashboard, WorkflowError> {
        let mine = self.store().transactions(&ListFilter::default().owned_by(agent.id))?;
        let this_month: Vec<&Transaction> = mine.iter().filter(|tx| tx.created_at() >= since).collect();

        Ok(AgentDashboard {
            solde: agent.solde,
            commissions_dues: agent.commissions_dues,
            transactions_this_month: this_month.len(),
            pending_transactions: mine.iter().filter(|tx| tx.is_open()).count(),
            estimated_commissions_this_month: total(
                this_month
                    .iter()
                    .filter(|tx| tx.status() != TransactionStatus::Rejected)
                    .map(|tx| tx.commission_generee()),
            )?,
        })
    }

    fn chef_dashboard(&self, chef: &Profile, since: DateTime<Utc>) -> Result<ChefDashboard, WorkflowError> {
        let (active_agents, validated) = match chef.agency_id {
            Some(agency_id) => {
                let active_agents = self
                    .store()
                    .profiles()?
                    .iter()
                    .filter(|p| p.role == Role::Agent && p.agency_id == Some(agency_id) && p.is_active())
                    .count();
                let validated: Vec<Transaction> = self
                    .store()
                    .transactions(&ListFilter::default().in_agency(agency_id))?
                    .into_iter()
                    .filter(|tx| validated_since(tx, since))
                    .collect();
                (active_agents, validated)
            }
            None => (0, Vec::new()),
        };
        let pending_recharges = self.store().recharges(&ListFilter::open().decided_by(chef.id))?.len();

        Ok(ChefDashboard {
            solde: chef.solde,
            commissions_dues: chef.commissions_dues,
            active_agents,
            agency_volume_this_month: total(validated.iter().map(|tx| tx.montant_principal()))?,
            agency_commissions_this_month: total(validated.iter().map(|tx| tx.commission_generee()))?,
            pending_recharges,
        })
    }

    fn sous_admin_dashboard(&self, sub: &Profile) -> Result<SousAdminDashboard, WorkflowError> {
        let flags = sub.permissions.unwrap_or_else(SubAdminPermissions::none);

        let (assigned_transactions, unassigned_transactions) = if flags.can_validate_transactions {
            let open = self.store().transactions(&ListFilter::open())?;
            (
                Some(open.iter().filter(|tx| tx.assigned_to() == Some(sub.id)).count()),
                Some(open.iter().filter(|tx| tx.assigned_to().is_none()).count()),
            )
        } else {
            (None, None)
        };
        let (assigned_requests, unassigned_requests) = if flags.can_manage_requests {
            let mine = ListFilter::open().assigned(Assignee::Is(sub.id));
            let free = ListFilter::open().assigned(Assignee::Unassigned);
            (
                Some(self.store().support_requests(&mine)?.len()),
                Some(self.store().support_requests(&free)?.len()),
            )
        } else {
            (None, None)
        };

        Ok(SousAdminDashboard {
            assigned_transactions,
            unassigned_transactions,
            assigned_requests,
            unassigned_requests,
        })
    }

    fn global_figures(&self, since: DateTime<Utc>) -> Result<GlobalDashboard, WorkflowError> {
        let transactions = self.store().transactions(&ListFilter::default())?;
        let validated: Vec<&Transaction> = transactions
            .iter()
            .filter(|tx| tx.status() == TransactionStatus::Validated)
            .collect();

        Ok(GlobalDashboard {
            pending_validations: transactions.iter().filter(|tx| tx.is_open()).count(),
            pending_recharges: self.store().recharges(&ListFilter::open())?.len(),
            open_requests: self.store().support_requests(&ListFilter::open())?.len(),
            validated_transactions: validated.len(),
            rejected_transactions: transactions
                .iter()
                .filter(|tx| tx.status() == TransactionStatus::Rejected)
                .count(),
            total_volume: total(validated.iter().map(|tx| tx.montant_principal()))?,
            volume_this_month: total(
                validated
                    .iter()
                    .filter(|tx| validated_since(tx, since))
                    .map(|tx| tx.montant_principal()),
            )?,
            active_users: self.store().profiles()?.iter().filter(|p| p.is_active()).count(),
            agencies: self.store().agencies()?.len(),
        })
    }

    fn catalog_dashboard(&self) -> Result<CatalogDashboard, WorkflowError> {
        let catalog = self.store().operation_types()?;
        let count = |status: OperationTypeStatus| catalog.iter().filter(|op| op.status == status).count();
        Ok(CatalogDashboard {
            active_operation_types: count(OperationTypeStatus::Active),
            inactive_operation_types: count(OperationTypeStatus::Inactive),
            archived_operation_types: count(OperationTypeStatus::Archived),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_starts_at_midnight_on_the_first() {
        let at = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap();
        assert_eq!(month_start(at), Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        let first = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(month_start(first), first);
    }

    #[test]
    fn dashboards_are_tagged_with_the_role() {
        let dash = Dashboard::SousAdmin(SousAdminDashboard {
            assigned_transactions: Some(2),
            unassigned_transactions: Some(5),
            assigned_requests: None,
            unassigned_requests: None,
        });
        let json = serde_json::to_value(&dash).unwrap();
        assert_eq!(json["role"], "sous_admin");
        assert_eq!(json["unassigned_transactions"], 5);
        assert!(json["assigned_requests"].is_null());
    }
}
