//! Shared handles for the dispatcher and scheduler: store, clock, shutdown
//! signal, and the event channel.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, SystemClock};
use crate::events::AssistantEvent;
use crate::store::Store;

#[derive(Clone)]
pub struct AssistantContext {
    pub store: Store,
    pub clock: Arc<dyn Clock>,
    pub shutdown: CancellationToken,
    events: broadcast::Sender<AssistantEvent>,
}

impl AssistantContext {
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            store,
            clock,
            shutdown: CancellationToken::new(),
            events,
        }
    }

    /// Context on the local wall clock.
    pub fn with_system_clock(store: Store) -> Self {
        Self::new(store, Arc::new(SystemClock))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AssistantEvent> {
        self.events.subscribe()
    }

    /// Fire-and-forget; having no subscribers is fine.
    pub fn broadcast(&self, event: AssistantEvent) {
        let _ = self.events.send(event);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
