use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use super::listener::{Callback, Listener};
use super::DeliveryEvent;

/// Running totals of delivery outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub sent: u64,
    pub dropped: u64,
    pub failed: u64,
}

impl DeliveryStats {
    pub fn total(&self) -> u64 {
        self.sent + self.dropped + self.failed
    }
}

#[derive(Default)]
struct Counters {
    sent: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

/// Record of listeners notified of every delivery outcome, plus outcome counters.
///
/// Cloning shares listeners and counters.
#[derive(Clone, Default)]
pub struct DeliveryReporter {
    listeners: Arc<DashMap<Uuid, Callback<DeliveryEvent>>>,
    counters: Arc<Counters>,
}

impl DeliveryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` and returns the id assigned to it.
    pub fn register_listener(&self, listener: &mut Listener<DeliveryEvent>) -> Uuid {
        let listener_id = Uuid::new_v4();
        listener.set_id(listener_id);
        self.listeners.insert(listener_id, listener.get_callback());
        listener_id
    }

    /// Unregisters a listener. Returns false if no listener had that id.
    pub fn unregister_listener(&self, listener_id: Uuid) -> bool {
        self.listeners.remove(&listener_id).is_some()
    }

    pub fn unregister_all(&self) {
        self.listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Counts the event and calls each registered listener with it.
    pub fn notify_listeners(&self, event: DeliveryEvent) {
        let counter = match event {
            DeliveryEvent::Sent { .. } => &self.counters.sent,
            DeliveryEvent::Dropped { .. } => &self.counters.dropped,
            DeliveryEvent::Failed { .. } => &self.counters.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if self.listeners.is_empty() {
            return;
        }
        // Snapshot so callbacks can (un)register without deadlocking the map.
        let listeners: Vec<(Uuid, Callback<DeliveryEvent>)> = self
            .listeners
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        let event = Arc::new(event);
        for (id, callback) in listeners {
            callback(id, event.clone());
        }
    }

    pub fn stats(&self) -> DeliveryStats {
        DeliveryStats {
            sent: self.counters.sent.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}
