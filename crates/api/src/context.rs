use agencyops_core::UserId;

/// Authenticated caller for a request.
///
/// Only the user id comes from the token; the engine re-reads role, agency
/// and status from the stored profile on every action.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ActorContext {
    user_id: UserId,
}

impl ActorContext {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}
