use serde::{Deserialize, Serialize};

use agencyops_core::{AgencyId, UserId};

use crate::{Role, SubAdminPermissions};

/// A resolved, active actor.
///
/// Each role carries exactly the context its rules need; authorization matches
/// on the variant instead of comparing role names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Actor {
    Agent {
        id: UserId,
        agency_id: Option<AgencyId>,
    },
    ChefAgence {
        id: UserId,
        agency_id: Option<AgencyId>,
    },
    AdminGeneral {
        id: UserId,
    },
    SousAdmin {
        id: UserId,
        permissions: SubAdminPermissions,
    },
    Developpeur {
        id: UserId,
    },
}

impl Actor {
    pub fn id(&self) -> UserId {
        match *self {
            Actor::Agent { id, .. }
            | Actor::ChefAgence { id, .. }
            | Actor::AdminGeneral { id }
            | Actor::SousAdmin { id, .. }
            | Actor::Developpeur { id } => id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Actor::Agent { .. } => Role::Agent,
            Actor::ChefAgence { .. } => Role::ChefAgence,
            Actor::AdminGeneral { .. } => Role::AdminGeneral,
            Actor::SousAdmin { .. } => Role::SousAdmin,
            Actor::Developpeur { .. } => Role::Developpeur,
        }
    }

    pub fn agency_id(&self) -> Option<AgencyId> {
        match *self {
            Actor::Agent { agency_id, .. } | Actor::ChefAgence { agency_id, .. } => agency_id,
            _ => None,
        }
    }

    pub fn is_admin_general(&self) -> bool {
        matches!(self, Actor::AdminGeneral { .. })
    }
}
