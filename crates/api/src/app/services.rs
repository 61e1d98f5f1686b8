use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use agencyops_events::{EventBus, InMemoryEventBus, Subscription, TransitionEvent};
use agencyops_infra::{Engine, EngineConfig, InMemoryEntityStore};

pub type AppEngine = Engine<Arc<InMemoryEntityStore>, Arc<InMemoryEventBus<TransitionEvent>>>;

/// Shared state behind every handler.
pub struct AppServices {
    engine: AppEngine,
    realtime_tx: broadcast::Sender<TransitionEvent>,
}

impl AppServices {
    pub fn engine(&self) -> &AppEngine {
        &self.engine
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<TransitionEvent> {
        &self.realtime_tx
    }
}

/// Wire the in-memory store and bus into an engine, with the audit bridge
/// forwarding committed transitions to the log and to SSE subscribers.
pub fn build_services(config: EngineConfig) -> AppServices {
    let store = Arc::new(InMemoryEntityStore::new());
    let bus: Arc<InMemoryEventBus<TransitionEvent>> = Arc::new(InMemoryEventBus::new());

    // Realtime channel (SSE): lossy broadcast.
    let (realtime_tx, _realtime_rx) = broadcast::channel::<TransitionEvent>(256);
    spawn_audit_bridge(bus.subscribe(), realtime_tx.clone());

    AppServices {
        engine: Engine::new(store, bus, config),
        realtime_tx,
    }
}

fn spawn_audit_bridge(subscription: Subscription<TransitionEvent>, tx: broadcast::Sender<TransitionEvent>) {
    let spawned = std::thread::Builder::new()
        .name("audit-bridge".to_string())
        .spawn(move || {
            while let Ok(event) = subscription.recv() {
                tracing::info!(
                    target: "audit",
                    event_type = %event.event_type,
                    actor = %event.actor,
                    action = %event.action,
                    entity_type = %event.entity_type,
                    entity_id = %event.entity_id,
                    before = event.before_status.as_deref().unwrap_or("-"),
                    after = %event.after_status,
                    status_changed = event.changed_status(),
                    "transition"
                );
                // No SSE subscriber is not an error.
                let _ = tx.send(event);
            }
        });

    if let Err(err) = spawned {
        tracing::error!(error = %err, "failed to start audit bridge; transitions will not be streamed");
    }
}

pub fn audit_sse_stream(
    services: Arc<AppServices>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(event.event_type.clone()).data(data)))
        }
        // Lagged receivers skip what they missed.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
