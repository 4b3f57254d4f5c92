//! Backend contract and availability probe

use crate::Result;

/// Private key used by the availability probe. Written and deleted in
/// one cycle, never left behind.
const PROBE_KEY: &str = "__nimbus_probe__";

/// String-only key-value backend shared across execution contexts.
///
/// Mirrors the platform storage contract: synchronous, string-valued,
/// finite quota. Operations fail with [`crate::StorageError`] when the
/// backend is disabled or out of space; callers on the hot path are
/// expected to check [`StorageArea::is_available`] first and degrade to
/// memory-only behavior.
pub trait StorageArea: Send + Sync {
    /// Read the raw string stored at `key`, if any.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` at `key`, replacing any previous entry.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Delete the entry at `key`. Deleting a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// Probe the backend with a write+delete cycle under a private key.
    ///
    /// Returns `false` when the backend is disabled or the cycle fails
    /// (quota exhausted, database gone). Leaves no residue either way.
    fn is_available(&self) -> bool {
        self.set_item(PROBE_KEY, PROBE_KEY)
            .and_then(|_| self.remove_item(PROBE_KEY))
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;

    #[test]
    fn test_probe_reports_available() {
        let storage = MemoryStorage::new();
        assert!(storage.is_available());
    }

    #[test]
    fn test_probe_reports_disabled() {
        let storage = MemoryStorage::disabled();
        assert!(!storage.is_available());
    }

    #[test]
    fn test_probe_leaves_no_residue() {
        let storage = MemoryStorage::new();
        assert!(storage.is_available());
        assert!(storage.is_empty());

        storage.set_item("kept", "value").unwrap();
        assert!(storage.is_available());
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_probe_fails_when_quota_exhausted() {
        let storage = MemoryStorage::with_quota(10);
        storage.set_item("k", "0123456").unwrap();
        assert!(!storage.is_available());
        // The failed probe must not have written anything
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("0123456"));
        assert_eq!(storage.len(), 1);
    }
}
