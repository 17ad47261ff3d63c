//! Events emitted by the message consumer for subscribers.

use std::sync::{Arc, RwLock};

use keel_ledger::Block;

/// Node-level events that observers can subscribe to via the [`EventBus`].
#[derive(Clone, Debug)]
pub enum NodeEvent {
    /// The best block changed to this block.
    NewBestBlock(Block),
    /// A message was processed and the inbound queue is now empty.
    QueueEmpty,
}

type Listener = Arc<dyn Fn(&NodeEvent) + Send + Sync>;

/// Synchronous fan-out event bus for node events.
///
/// Listeners are invoked inline on the emitting thread (the consumer task);
/// keep handlers fast to avoid stalling message processing. Listeners may be
/// added at any time, including from inside another listener.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&NodeEvent) + Send + Sync + 'static) {
        self.listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Arc::new(listener));
    }

    pub fn emit(&self, event: &NodeEvent) {
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
