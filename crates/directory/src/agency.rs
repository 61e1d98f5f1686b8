use serde::{Deserialize, Serialize};

use agencyops_core::{AgencyId, Entity, EntityKind, UserId};

/// An agency of the network. `chef_id` routes its agents' recharge requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agency {
    pub id: AgencyId,
    pub name: String,
    pub chef_id: Option<UserId>,
}

impl Agency {
    pub fn new(id: AgencyId, name: impl Into<String>, chef_id: Option<UserId>) -> Self {
        Self {
            id,
            name: name.into(),
            chef_id,
        }
    }
}

impl Entity for Agency {
    type Id = AgencyId;

    const KIND: EntityKind = EntityKind::Agency;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
