//! Entity trait: identity + continuity across state changes.

use serde::{Deserialize, Serialize};

/// Kind of persisted entity, used to key store rows and audit events.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    OperationType,
    Transaction,
    RechargeRequest,
    SupportRequest,
    Agency,
    Profile,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::OperationType => "operation_type",
            EntityKind::Transaction => "transaction",
            EntityKind::RechargeRequest => "recharge_request",
            EntityKind::SupportRequest => "support_request",
            EntityKind::Agency => "agency",
            EntityKind::Profile => "profile",
        }
    }
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    const KIND: EntityKind;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
