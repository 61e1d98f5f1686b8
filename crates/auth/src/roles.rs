use core::str::FromStr;

use serde::{Deserialize, Serialize};

use agencyops_core::DomainError;

/// Organizational role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Agent,
    ChefAgence,
    AdminGeneral,
    SousAdmin,
    Developpeur,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Agent => "agent",
            Role::ChefAgence => "chef_agence",
            Role::AdminGeneral => "admin_general",
            Role::SousAdmin => "sous_admin",
            Role::Developpeur => "developpeur",
        }
    }

    /// Roles that hold an operating balance.
    pub fn holds_balance(&self) -> bool {
        matches!(self, Role::Agent | Role::ChefAgence)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agent" => Ok(Role::Agent),
            "chef_agence" => Ok(Role::ChefAgence),
            "admin_general" => Ok(Role::AdminGeneral),
            "sous_admin" => Ok(Role::SousAdmin),
            "developpeur" => Ok(Role::Developpeur),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}
