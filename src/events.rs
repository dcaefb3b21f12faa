//! Broadcast bus for domain events emitted while indexing.
//!
//! Many writers, many readers. Each subscriber gets a bounded buffer;
//! publishing never blocks, and events for a slow or gone subscriber are
//! dropped rather than stalling the pipeline.

use serde_json::Value;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Mutex;
use tracing::trace;

/// Buffered events per subscriber before drops start.
const SUBSCRIBER_BUFFER: usize = 256;

#[derive(Debug, Clone)]
pub struct Event {
    pub topic: String,
    pub data: Value,
}

#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<SyncSender<Event>>>,
}

impl EventBus {
    pub fn new() -> EventBus {
        EventBus::default()
    }

    /// Register a subscriber. Dropping the receiver unsubscribes it.
    pub fn subscribe(&self) -> Receiver<Event> {
        let (tx, rx) = sync_channel(SUBSCRIBER_BUFFER);
        self.subscribers.lock().expect("event bus poisoned").push(tx);
        rx
    }

    /// Broadcast an event to all current subscribers.
    pub fn publish(&self, topic: &str, data: Value) {
        let event = Event {
            topic: topic.to_string(),
            data,
        };

        let mut subscribers = self.subscribers.lock().expect("event bus poisoned");
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!(topic = %event.topic, "subscriber buffer full, event dropped");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}
