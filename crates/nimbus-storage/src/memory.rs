//! In-memory backend
//!
//! Shared hash map used as the test double and as the memory-only
//! fallback when no durable backend can be opened. Supports a total
//! byte quota and a disable switch to simulate blocked or sandboxed
//! storage.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::area::StorageArea;
use crate::error::StorageError;
use crate::Result;

pub struct MemoryStorage {
    inner: Arc<Inner>,
}

struct Inner {
    entries: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
    enabled: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::build(None, true)
    }

    /// Backend with a total byte quota across all keys and values.
    pub fn with_quota(quota: usize) -> Self {
        Self::build(Some(quota), true)
    }

    /// Backend that rejects every operation, like storage blocked by a
    /// sandboxed context.
    pub fn disabled() -> Self {
        Self::build(None, false)
    }

    fn build(quota: Option<usize>, enabled: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: RwLock::new(HashMap::new()),
                quota,
                enabled: AtomicBool::new(enabled),
            }),
        }
    }

    /// Flip availability at runtime (simulates a mid-life outage).
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_enabled(&self) -> Result<()> {
        if self.inner.enabled.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Disabled)
        }
    }
}

impl StorageArea for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.check_enabled()?;
        Ok(self.inner.entries.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.check_enabled()?;
        let mut entries = self.inner.entries.write();

        if let Some(quota) = self.inner.quota {
            let replaced = entries.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
            let used: usize = entries.iter().map(|(k, v)| k.len() + v.len()).sum();
            if used - replaced + key.len() + value.len() > quota {
                return Err(StorageError::QuotaExceeded { quota });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.check_enabled()?;
        self.inner.entries.write().remove(key);
        Ok(())
    }
}

impl Clone for MemoryStorage {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}
