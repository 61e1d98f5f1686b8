use serde::Serialize;
use thiserror::Error;

use agencyops_core::{AgencyId, UserId};

use crate::{Actor, Role};

/// Workflow an action belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Workflow {
    Transactions,
    Recharges,
    SupportRequests,
    Accounts,
    Catalog,
    Dashboards,
}

/// Verb checked against the capability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Submit,
    Read,
    Claim,
    Release,
    Reassign,
    Validate,
    Reject,
    Approve,
    Resolve,
    ViewQueue,
    ViewAllOpen,
    DirectRecharge,
    TransferCommissions,
    SetStatus,
    SetPermissions,
    Manage,
    /// Network-wide figures and the agency and sub-admin rosters.
    ViewStats,
}

/// The slice of an entity that authorization rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// No specific entity (creation, queue listing).
    None,
    Transaction {
        agent_id: UserId,
        agency_id: Option<AgencyId>,
        assigned_to: Option<UserId>,
    },
    Recharge {
        agent_id: UserId,
        chef_agence_id: UserId,
    },
    SupportRequest {
        demandeur_id: UserId,
        assigned_to: Option<UserId>,
    },
    Profile {
        user_id: UserId,
        role: Role,
        agency_id: Option<AgencyId>,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: {role} may not {action:?} on {workflow:?}")]
    Forbidden {
        role: Role,
        workflow: Workflow,
        action: Action,
    },
}

/// Capability token returned by [`authorize`].
///
/// Workflow services pass it (not a role name) into the domain commands; the
/// domain only learns whether the actor may bypass the assignee rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    actor_id: UserId,
    workflow: Workflow,
    action: Action,
    overrides_assignment: bool,
}

impl Grant {
    pub fn actor_id(&self) -> UserId {
        self.actor_id
    }

    pub fn workflow(&self) -> Workflow {
        self.workflow
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// Whether the holder may finalize work assigned to someone else.
    pub fn overrides_assignment(&self) -> bool {
        self.overrides_assignment
    }
}

/// Authorize `actor` for `action` on `resource`, returning a capability token.
///
/// - No IO
/// - No panics
/// - No business logic beyond ownership/assignment (pure policy check)
pub fn authorize(
    actor: &Actor,
    workflow: Workflow,
    action: Action,
    resource: &Resource,
) -> Result<Grant, AuthzError> {
    if can_perform(actor, workflow, action, resource) {
        Ok(Grant {
            actor_id: actor.id(),
            workflow,
            action,
            overrides_assignment: actor.is_admin_general(),
        })
    } else {
        Err(AuthzError::Forbidden {
            role: actor.role(),
            workflow,
            action,
        })
    }
}

/// The capability table.
pub fn can_perform(actor: &Actor, workflow: Workflow, action: Action, resource: &Resource) -> bool {
    match *actor {
        Actor::AdminGeneral { .. } => true,
        Actor::SousAdmin { id, permissions } => {
            sous_admin_may(id, permissions.can_validate_transactions, permissions.can_manage_requests, workflow, action, resource)
        }
        Actor::ChefAgence { id, agency_id } => chef_may(id, agency_id, workflow, action, resource),
        Actor::Agent { id, .. } => agent_may(id, workflow, action, resource),
        Actor::Developpeur { id } => match (workflow, action) {
            (Workflow::Catalog, Action::Manage | Action::Read) => true,
            (Workflow::SupportRequests, Action::Submit) => true,
            (Workflow::SupportRequests, Action::Read) => is_requester(id, resource),
            (Workflow::Dashboards, Action::Read) => is_self(id, resource),
            _ => false,
        },
    }
}

fn sous_admin_may(
    id: UserId,
    validates_transactions: bool,
    manages_requests: bool,
    workflow: Workflow,
    action: Action,
    resource: &Resource,
) -> bool {
    match workflow {
        Workflow::Transactions => {
            validates_transactions
                && match action {
                    Action::Claim | Action::ViewQueue | Action::Read => true,
                    Action::Release | Action::Validate | Action::Reject => is_assignee(id, resource),
                    _ => false,
                }
        }
        Workflow::SupportRequests => match action {
            Action::Submit => true,
            Action::Read => manages_requests || is_requester(id, resource),
            Action::Claim | Action::ViewQueue => manages_requests,
            Action::Release | Action::Resolve => manages_requests && is_assignee(id, resource),
            _ => false,
        },
        Workflow::Dashboards => action == Action::Read && is_self(id, resource),
        Workflow::Recharges | Workflow::Accounts | Workflow::Catalog => false,
    }
}

fn chef_may(
    id: UserId,
    agency_id: Option<AgencyId>,
    workflow: Workflow,
    action: Action,
    resource: &Resource,
) -> bool {
    match (workflow, action) {
        (Workflow::Recharges, Action::Approve | Action::Reject | Action::Read) => {
            matches!(*resource, Resource::Recharge { chef_agence_id, .. } if chef_agence_id == id)
        }
        (Workflow::Recharges, Action::DirectRecharge) => is_agent_of(agency_id, resource),
        (Workflow::Recharges, Action::ViewQueue) => true,
        (Workflow::Transactions, Action::Read) => matches!(
            *resource,
            Resource::Transaction { agency_id: Some(a), .. } if Some(a) == agency_id
        ),
        (Workflow::SupportRequests, Action::Submit) => true,
        (Workflow::SupportRequests, Action::Read) => is_requester(id, resource),
        (Workflow::Accounts, Action::TransferCommissions) => is_self(id, resource),
        (Workflow::Accounts, Action::SetStatus) => is_agent_of(agency_id, resource),
        (Workflow::Dashboards, Action::Read) => is_self(id, resource) || is_agent_of(agency_id, resource),
        _ => false,
    }
}

fn agent_may(id: UserId, workflow: Workflow, action: Action, resource: &Resource) -> bool {
    match (workflow, action) {
        (Workflow::Transactions | Workflow::Recharges | Workflow::SupportRequests, Action::Submit) => true,
        (Workflow::Transactions, Action::Read) => {
            matches!(*resource, Resource::Transaction { agent_id, .. } if agent_id == id)
        }
        (Workflow::Recharges, Action::Read) => {
            matches!(*resource, Resource::Recharge { agent_id, .. } if agent_id == id)
        }
        (Workflow::SupportRequests, Action::Read) => is_requester(id, resource),
        (Workflow::Accounts, Action::TransferCommissions) => is_self(id, resource),
        (Workflow::Dashboards, Action::Read) => is_self(id, resource),
        _ => false,
    }
}

fn is_assignee(id: UserId, resource: &Resource) -> bool {
    match *resource {
        Resource::Transaction { assigned_to, .. } | Resource::SupportRequest { assigned_to, .. } => {
            assigned_to == Some(id)
        }
        _ => false,
    }
}

fn is_requester(id: UserId, resource: &Resource) -> bool {
    matches!(*resource, Resource::SupportRequest { demandeur_id, .. } if demandeur_id == id)
}

fn is_self(id: UserId, resource: &Resource) -> bool {
    matches!(*resource, Resource::Profile { user_id, .. } if user_id == id)
}

fn is_agent_of(agency_id: Option<AgencyId>, resource: &Resource) -> bool {
    match (agency_id, *resource) {
        (
            Some(mine),
            Resource::Profile {
                role: Role::Agent,
                agency_id: Some(theirs),
                ..
            },
        ) => mine == theirs,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SubAdminPermissions;

    fn sous_admin(validates: bool, manages: bool) -> Actor {
        Actor::SousAdmin {
            id: UserId::new(),
            permissions: SubAdminPermissions {
                can_validate_transactions: validates,
                can_manage_requests: manages,
            },
        }
    }

    fn transaction(agent_id: UserId, assigned_to: Option<UserId>) -> Resource {
        Resource::Transaction {
            agent_id,
            agency_id: Some(AgencyId::new()),
            assigned_to,
        }
    }

    #[test]
    fn admin_general_may_do_anything_and_overrides_assignment() {
        let admin = Actor::AdminGeneral { id: UserId::new() };
        let res = transaction(UserId::new(), Some(UserId::new()));
        let grant = authorize(&admin, Workflow::Transactions, Action::Validate, &res).unwrap();
        assert!(grant.overrides_assignment());
        assert!(can_perform(&admin, Workflow::Transactions, Action::ViewAllOpen, &Resource::None));
    }

    #[test]
    fn sous_admin_is_gated_by_flags() {
        let validator = sous_admin(true, false);
        let helpdesk = sous_admin(false, true);
        let none = Resource::None;

        assert!(can_perform(&validator, Workflow::Transactions, Action::Claim, &none));
        assert!(!can_perform(&validator, Workflow::SupportRequests, Action::Claim, &none));
        assert!(can_perform(&helpdesk, Workflow::SupportRequests, Action::Claim, &none));
        assert!(!can_perform(&helpdesk, Workflow::Transactions, Action::Claim, &none));
    }

    #[test]
    fn sous_admin_finalizes_only_own_assignments_and_never_sees_all_open() {
        let actor = sous_admin(true, true);
        let mine = transaction(UserId::new(), Some(actor.id()));
        let theirs = transaction(UserId::new(), Some(UserId::new()));

        let grant = authorize(&actor, Workflow::Transactions, Action::Validate, &mine).unwrap();
        assert!(!grant.overrides_assignment());
        assert!(!can_perform(&actor, Workflow::Transactions, Action::Validate, &theirs));
        assert!(!can_perform(&actor, Workflow::Transactions, Action::ViewAllOpen, &Resource::None));
        assert!(!can_perform(&actor, Workflow::Transactions, Action::Reassign, &mine));
    }

    #[test]
    fn sous_admin_never_creates_transactions_or_recharges() {
        let actor = sous_admin(true, true);
        assert!(!can_perform(&actor, Workflow::Transactions, Action::Submit, &Resource::None));
        assert!(!can_perform(&actor, Workflow::Recharges, Action::Submit, &Resource::None));
    }

    #[test]
    fn chef_decides_only_recharges_addressed_to_them() {
        let chef_id = UserId::new();
        let chef = Actor::ChefAgence {
            id: chef_id,
            agency_id: Some(AgencyId::new()),
        };
        let mine = Resource::Recharge {
            agent_id: UserId::new(),
            chef_agence_id: chef_id,
        };
        let other = Resource::Recharge {
            agent_id: UserId::new(),
            chef_agence_id: UserId::new(),
        };

        assert!(can_perform(&chef, Workflow::Recharges, Action::Approve, &mine));
        assert!(!can_perform(&chef, Workflow::Recharges, Action::Reject, &other));
        assert!(!can_perform(&chef, Workflow::Transactions, Action::Validate, &Resource::None));
    }

    #[test]
    fn chef_manages_only_agents_of_own_agency() {
        let agency = AgencyId::new();
        let chef = Actor::ChefAgence {
            id: UserId::new(),
            agency_id: Some(agency),
        };
        let own_agent = Resource::Profile {
            user_id: UserId::new(),
            role: Role::Agent,
            agency_id: Some(agency),
        };
        let foreign_agent = Resource::Profile {
            user_id: UserId::new(),
            role: Role::Agent,
            agency_id: Some(AgencyId::new()),
        };

        assert!(can_perform(&chef, Workflow::Accounts, Action::SetStatus, &own_agent));
        assert!(can_perform(&chef, Workflow::Recharges, Action::DirectRecharge, &own_agent));
        assert!(!can_perform(&chef, Workflow::Accounts, Action::SetStatus, &foreign_agent));
    }

    #[test]
    fn agent_reads_only_own_records() {
        let id = UserId::new();
        let agent = Actor::Agent {
            id,
            agency_id: Some(AgencyId::new()),
        };

        assert!(can_perform(&agent, Workflow::Transactions, Action::Submit, &Resource::None));
        assert!(can_perform(&agent, Workflow::Transactions, Action::Read, &transaction(id, None)));
        assert!(!can_perform(&agent, Workflow::Transactions, Action::Read, &transaction(UserId::new(), None)));
        assert!(!can_perform(&agent, Workflow::Transactions, Action::Claim, &Resource::None));
    }

    #[test]
    fn dashboards_are_own_or_own_agency_and_network_stats_are_admin_only() {
        let agency = AgencyId::new();
        let chef_id = UserId::new();
        let chef = Actor::ChefAgence {
            id: chef_id,
            agency_id: Some(agency),
        };
        let agent_id = UserId::new();
        let agent = Actor::Agent {
            id: agent_id,
            agency_id: Some(agency),
        };
        let agent_profile = Resource::Profile {
            user_id: agent_id,
            role: Role::Agent,
            agency_id: Some(agency),
        };
        let chef_profile = Resource::Profile {
            user_id: chef_id,
            role: Role::ChefAgence,
            agency_id: Some(agency),
        };
        let validator = sous_admin(true, false);
        let validator_profile = Resource::Profile {
            user_id: validator.id(),
            role: Role::SousAdmin,
            agency_id: None,
        };

        assert!(can_perform(&agent, Workflow::Dashboards, Action::Read, &agent_profile));
        assert!(!can_perform(&agent, Workflow::Dashboards, Action::Read, &chef_profile));
        assert!(can_perform(&chef, Workflow::Dashboards, Action::Read, &chef_profile));
        assert!(can_perform(&chef, Workflow::Dashboards, Action::Read, &agent_profile));
        assert!(can_perform(&validator, Workflow::Dashboards, Action::Read, &validator_profile));
        assert!(!can_perform(&validator, Workflow::Dashboards, Action::Read, &agent_profile));

        for actor in [&agent, &chef, &validator] {
            assert!(!can_perform(actor, Workflow::Dashboards, Action::ViewStats, &Resource::None));
        }
        let admin = Actor::AdminGeneral { id: UserId::new() };
        assert!(can_perform(&admin, Workflow::Dashboards, Action::ViewStats, &Resource::None));
    }

    #[test]
    fn forbidden_error_names_role_and_action() {
        let dev = Actor::Developpeur { id: UserId::new() };
        let err = authorize(&dev, Workflow::Transactions, Action::Claim, &Resource::None).unwrap_err();
        assert_eq!(
            err,
            AuthzError::Forbidden {
                role: Role::Developpeur,
                workflow: Workflow::Transactions,
                action: Action::Claim,
            }
        );
    }
}
