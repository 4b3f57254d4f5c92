//! Execution context wiring
//!
//! One backend handle plus one broadcast bus. Controllers created from
//! the same context hear each other's writes synchronously; mutations
//! performed in *other* contexts sharing the backend arrive through
//! [`StorageContext::ingest_external`], the hook a platform event loop
//! calls when it observes a storage notification.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use nimbus_storage::{MemoryStorage, StorageArea};

use crate::bus::{ChangeEvent, Origin, StorageBus};
use crate::keyed::KeyedStore;

pub struct StorageContext {
    storage: Arc<dyn StorageArea>,
    bus: StorageBus,
}

impl StorageContext {
    pub fn new(storage: Arc<dyn StorageArea>) -> Self {
        Self {
            storage,
            bus: StorageBus::new(),
        }
    }

    /// Context over a fresh in-memory backend.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Controller for `key` with no initial value.
    pub fn keyed<T>(&self, key: impl Into<String>) -> KeyedStore<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        KeyedStore::new(key, None, Arc::clone(&self.storage), self.bus.clone())
    }

    /// Controller for `key` falling back to `initial` when the backend
    /// holds no prior entry.
    pub fn keyed_with<T>(&self, key: impl Into<String>, initial: T) -> KeyedStore<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        KeyedStore::new(key, Some(initial), Arc::clone(&self.storage), self.bus.clone())
    }

    /// Feed a platform-level change notification into this context.
    ///
    /// The platform delivers these for mutations performed in other
    /// execution contexts sharing the backend; `new_value` of `None`
    /// means the entry was removed there.
    pub fn ingest_external(&self, key: impl Into<String>, new_value: Option<String>) {
        self.bus.publish(&ChangeEvent {
            key: key.into(),
            new_value,
            origin: Origin::External,
        });
    }

    pub fn storage(&self) -> Arc<dyn StorageArea> {
        Arc::clone(&self.storage)
    }

    pub fn bus(&self) -> &StorageBus {
        &self.bus
    }
}

impl Clone for StorageContext {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            bus: self.bus.clone(),
        }
    }
}
