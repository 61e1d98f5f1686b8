use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use agencyops_core::{EntityKind, UserId};

use crate::Event;

/// Audit record of one successful workflow transition.
///
/// Built by the workflow services from the state before and after a commit;
/// published only once the store accepted the write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub event_id: Uuid,
    pub actor: UserId,
    /// Workflow action name (`claim`, `validate`, `approve`...).
    pub action: String,
    /// Name of the domain event behind the transition, e.g.
    /// `transactions.transaction.validated`; `<entity_type>.<action>` when the
    /// transition has no aggregate of its own.
    pub event_type: String,
    pub event_version: u32,
    pub entity_type: EntityKind,
    pub entity_id: String,
    /// `None` when the transition created the entity.
    pub before_status: Option<String>,
    pub after_status: String,
    pub occurred_at: DateTime<Utc>,
}

impl TransitionEvent {
    pub fn new(
        actor: UserId,
        action: impl Into<String>,
        entity_type: EntityKind,
        entity_id: impl ToString,
        before_status: Option<&str>,
        after_status: &str,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        let action = action.into();
        Self {
            event_id: Uuid::now_v7(),
            actor,
            event_type: format!("{entity_type}.{action}"),
            event_version: 1,
            action,
            entity_type,
            entity_id: entity_id.to_string(),
            before_status: before_status.map(str::to_owned),
            after_status: after_status.to_owned(),
            occurred_at,
        }
    }

    /// Name the transition after the aggregate event that caused it.
    pub fn caused_by<E: Event>(mut self, event: &E) -> Self {
        self.event_type = event.event_type().to_owned();
        self.event_version = event.version();
        self.occurred_at = event.occurred_at();
        self
    }

    /// Whether the transition changed the status (reassignments may not).
    pub fn changed_status(&self) -> bool {
        self.before_status.as_deref() != Some(self.after_status.as_str())
    }
}

impl Event for TransitionEvent {
    fn event_type(&self) -> &'static str {
        "workflow.transition"
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
