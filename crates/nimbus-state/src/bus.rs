//! Same-context change broadcast
//!
//! Platform storage notifications only reach *other* execution
//! contexts, so a context needs its own channel to tell sibling
//! controllers about writes it performed itself. Both producers land on
//! this bus and are handled uniformly; [`Origin`] records which side
//! raised the event.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// Channel identifier for same-context broadcasts, distinct from the
/// platform-level storage notification.
pub const CHANGE_CHANNEL: &str = "nimbus-storage-change";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Raised by a controller's own write path in this context.
    Local,
    /// Ingested from a platform notification for a mutation performed
    /// in another execution context.
    External,
}

/// Notification that a key's stored value changed.
///
/// `new_value` carries the serialized form; `None` means the entry was
/// removed and observers should fall back to their own initial values.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub key: String,
    pub new_value: Option<String>,
    pub origin: Origin,
}

type Handler = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;
type HandlerMap = Arc<Mutex<HashMap<Uuid, Handler>>>;

/// In-process publish/subscribe signal for [`ChangeEvent`]s.
pub struct StorageBus {
    handlers: HandlerMap,
}

impl StorageBus {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a handler for every event published on this bus.
    /// Delivery stops when the returned guard is dropped.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.handlers.lock().insert(id, Arc::new(handler));
        Subscription {
            id,
            handlers: Arc::downgrade(&self.handlers),
        }
    }

    /// Deliver `event` to every live subscriber on the calling thread.
    pub fn publish(&self, event: &ChangeEvent) {
        tracing::debug!(
            channel = CHANGE_CHANNEL,
            key = %event.key,
            origin = ?event.origin,
            removed = event.new_value.is_none(),
            "Publishing change event"
        );

        // Snapshot so handlers may subscribe or publish reentrantly
        let handlers: Vec<Handler> = self.handlers.lock().values().cloned().collect();
        for handler in handlers {
            handler(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().len()
    }
}

impl Clone for StorageBus {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
        }
    }
}

impl Default for StorageBus {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for a bus subscription.
pub struct Subscription {
    id: Uuid,
    handlers: Weak<Mutex<HashMap<Uuid, Handler>>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handlers) = self.handlers.upgrade() {
            handlers.lock().remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn change(key: &str, new_value: Option<&str>) -> ChangeEvent {
        ChangeEvent {
            key: key.to_string(),
            new_value: new_value.map(str::to_string),
            origin: Origin::Local,
        }
    }

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let bus = StorageBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_a = Arc::clone(&seen);
        let _a = bus.subscribe(move |_| {
            seen_a.fetch_add(1, Ordering::SeqCst);
        });
        let seen_b = Arc::clone(&seen);
        let _b = bus.subscribe(move |_| {
            seen_b.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&change("k", Some("v")));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_dropping_subscription_stops_delivery() {
        let bus = StorageBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_cb = Arc::clone(&seen);
        let sub = bus.subscribe(move |_| {
            seen_cb.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&change("k", Some("v")));
        drop(sub);
        bus.publish(&change("k", Some("w")));

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_handlers_receive_payload() {
        let bus = StorageBus::new();
        let removed = Arc::new(AtomicUsize::new(0));

        let removed_cb = Arc::clone(&removed);
        let _sub = bus.subscribe(move |event| {
            assert_eq!(event.key, "k");
            if event.new_value.is_none() {
                removed_cb.fetch_add(1, Ordering::SeqCst);
            }
        });

        bus.publish(&change("k", Some("v")));
        bus.publish(&change("k", None));
        assert_eq!(removed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reentrant_subscribe_does_not_deadlock() {
        let bus = StorageBus::new();
        let bus_cb = bus.clone();
        let late: Arc<Mutex<Vec<Subscription>>> = Arc::new(Mutex::new(Vec::new()));

        let late_cb = Arc::clone(&late);
        let _sub = bus.subscribe(move |_| {
            let guard = bus_cb.subscribe(|_| {});
            late_cb.lock().push(guard);
        });

        bus.publish(&change("k", Some("v")));
        assert_eq!(bus.subscriber_count(), 2);
    }
}
