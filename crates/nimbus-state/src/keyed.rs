//! Per-key synchronization controller

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use uuid::Uuid;

use nimbus_storage::StorageArea;

use crate::bus::{ChangeEvent, Origin, StorageBus, Subscription};
use crate::codec;

type WatchFn = Arc<dyn Fn() + Send + Sync>;
type WatcherMap = Arc<Mutex<HashMap<Uuid, WatchFn>>>;

/// Per-key synchronization controller.
///
/// Keeps one in-memory value aligned with the serialized entry in the
/// shared backend and with every other controller watching the same
/// key. Local mutations are visible to `get()` synchronously and write
/// through to the backend; changes made elsewhere arrive as
/// [`ChangeEvent`]s and are folded back in. Nothing here fails outward:
/// when the backend is unavailable the controller runs memory-only.
pub struct KeyedStore<T> {
    inner: Arc<Inner<T>>,
    /// Keeps the bus handler alive for the controller's lifetime.
    bus_sub: Arc<Subscription>,
}

struct Inner<T> {
    key: String,
    initial: Option<T>,
    storage: Arc<dyn StorageArea>,
    bus: StorageBus,
    current: RwLock<Option<T>>,
    watchers: WatcherMap,
}

impl<T> KeyedStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Create a controller for `key`, reading any prior backend entry.
    ///
    /// A usable stored value wins over `initial`. Creation itself never
    /// writes to the backend; only `set` and `reset` do.
    pub fn new(
        key: impl Into<String>,
        initial: Option<T>,
        storage: Arc<dyn StorageArea>,
        bus: StorageBus,
    ) -> Self {
        let key = key.into();
        let current = read_back(&key, initial.as_ref(), storage.as_ref());

        let inner = Arc::new(Inner {
            key,
            initial,
            storage,
            bus: bus.clone(),
            current: RwLock::new(current),
            watchers: Arc::new(Mutex::new(HashMap::new())),
        });

        let handler = Arc::downgrade(&inner);
        let bus_sub = bus.subscribe(move |event| {
            if let Some(inner) = handler.upgrade() {
                inner.apply(event);
            }
        });

        Self {
            inner,
            bus_sub: Arc::new(bus_sub),
        }
    }

    /// The key this controller synchronizes.
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Current value. Reflects local mutations synchronously.
    pub fn get(&self) -> Option<T> {
        self.inner.current.read().clone()
    }

    /// True when the current value is present and meaningful: not JSON
    /// null and not an empty string. `0` and `false` count as values.
    pub fn has_value(&self) -> bool {
        let current = self.inner.current.read();
        let Some(value) = current.as_ref() else {
            return false;
        };
        match codec::canonical(value) {
            Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            _ => true,
        }
    }

    /// Set the value.
    ///
    /// Memory is updated and watchers run before any backend work, so
    /// the new value is visible to `get()` even when persistence is
    /// unavailable or the value cannot be serialized. A successful
    /// write is broadcast so sibling controllers converge.
    pub fn set(&self, value: T) {
        let serialized = codec::encode(&value);
        *self.inner.current.write() = Some(value);
        self.inner.notify_watchers();

        if !self.inner.storage.is_available() {
            return;
        }

        let Some(serialized) = serialized else {
            tracing::warn!(key = %self.inner.key, "Value not serializable, backend left unchanged");
            return;
        };

        // An empty entry reads back as absent; don't write one
        if serialized.is_empty() {
            return;
        }

        if let Err(e) = self.inner.storage.set_item(&self.inner.key, &serialized) {
            tracing::error!(key = %self.inner.key, error = %e, "Failed to write value");
            return;
        }

        self.inner.bus.publish(&ChangeEvent {
            key: self.inner.key.clone(),
            new_value: Some(serialized),
            origin: Origin::Local,
        });
    }

    /// Restore the initial value and drop the backend entry.
    ///
    /// Observers are told the entry was removed and fall back to their
    /// own initial values rather than copying a missing one verbatim.
    pub fn reset(&self) {
        *self.inner.current.write() = self.inner.initial.clone();
        self.inner.notify_watchers();

        if !self.inner.storage.is_available() {
            return;
        }

        if let Err(e) = self.inner.storage.remove_item(&self.inner.key) {
            tracing::error!(key = %self.inner.key, error = %e, "Failed to remove entry");
            return;
        }

        self.inner.bus.publish(&ChangeEvent {
            key: self.inner.key.clone(),
            new_value: None,
            origin: Origin::Local,
        });
    }

    /// Run `callback` after every committed change to the in-memory
    /// value, whether from a local mutation or an applied incoming
    /// notification. Delivery stops when the guard is dropped.
    pub fn watch<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.inner.watchers.lock().insert(id, Arc::new(callback));
        WatchGuard {
            id,
            watchers: Arc::downgrade(&self.inner.watchers),
        }
    }
}

/// Initial read: the backend is authoritative over the caller-supplied
/// default whenever a prior usable value exists. An empty raw string
/// counts as no entry.
fn read_back<T>(key: &str, initial: Option<&T>, storage: &dyn StorageArea) -> Option<T>
where
    T: DeserializeOwned + Clone,
{
    if !storage.is_available() {
        return initial.cloned();
    }

    match storage.get_item(key) {
        Ok(Some(raw)) if !raw.is_empty() => codec::decode(&raw)
            .and_then(|v| serde_json::from_value(v).ok())
            .or_else(|| initial.cloned()),
        Ok(_) => initial.cloned(),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Failed to read stored value");
            initial.cloned()
        }
    }
}

impl<T> Inner<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Fold an incoming notification into local state. The outcome
    /// depends only on the current value and the event payload, not on
    /// which producer raised it.
    fn apply(&self, event: &ChangeEvent) {
        if event.key != self.key {
            return;
        }

        let candidate: Option<T> = match event.new_value.as_deref().and_then(codec::decode) {
            Some(value) => serde_json::from_value(value)
                .ok()
                .or_else(|| self.initial.clone()),
            None => self.initial.clone(),
        };

        {
            let mut current = self.current.write();
            if same_shape(current.as_ref(), candidate.as_ref()) {
                return;
            }
            tracing::debug!(key = %self.key, origin = ?event.origin, "Applying change notification");
            *current = candidate;
        }

        self.notify_watchers();
    }

    fn notify_watchers(&self) {
        // Snapshot so a watcher may mutate the store or drop its guard
        let watchers: Vec<WatchFn> = self.watchers.lock().values().cloned().collect();
        for watcher in watchers {
            watcher();
        }
    }
}

/// Structural comparison on the serialized shape, so map key order does
/// not count as a change.
fn same_shape<T: Serialize>(a: Option<&T>, b: Option<&T>) -> bool {
    a.and_then(|v| codec::canonical(v)) == b.and_then(|v| codec::canonical(v))
}

impl<T> Clone for KeyedStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            bus_sub: Arc::clone(&self.bus_sub),
        }
    }
}

/// RAII guard for a watch registration.
pub struct WatchGuard {
    id: Uuid,
    watchers: Weak<Mutex<HashMap<Uuid, WatchFn>>>,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        if let Some(watchers) = self.watchers.upgrade() {
            watchers.lock().remove(&self.id);
        }
    }
}
