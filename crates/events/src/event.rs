use chrono::{DateTime, Utc};

/// A fact emitted by a workflow aggregate or by the audit trail.
///
/// Events never change once emitted; `version` tracks the payload schema.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name, e.g. `recharges.recharge.approved`.
    fn event_type(&self) -> &'static str;

    fn version(&self) -> u32;

    /// Business time of the transition.
    fn occurred_at(&self) -> DateTime<Utc>;
}
