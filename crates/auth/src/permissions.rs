use serde::{Deserialize, Serialize};

/// Partial rights granted to a `sous_admin` by the general administrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubAdminPermissions {
    pub can_validate_transactions: bool,
    pub can_manage_requests: bool,
}

impl SubAdminPermissions {
    pub fn all() -> Self {
        Self {
            can_validate_transactions: true,
            can_manage_requests: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}
