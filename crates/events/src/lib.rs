//! `agencyops-events` — domain events, audit transitions and the event bus.
//!
//! Workflow aggregates emit their own typed events; every committed
//! transition is additionally summarized as a [`TransitionEvent`] and
//! published for the external audit and notification collaborators.

pub mod bus;
pub mod event;
pub mod in_memory_bus;
pub mod transition;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use transition::TransitionEvent;
