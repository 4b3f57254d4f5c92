//! Shell state container
//!
//! Owns the durable backend and the process-wide storage context that
//! every window's controllers are created from.

use std::sync::Arc;

use nimbus_state::StorageContext;
use nimbus_storage::{MemoryStorage, SqliteStorage};

use crate::config::Config;
use crate::Result;

pub struct Shell {
    config: Config,
    context: StorageContext,
}

impl Shell {
    /// Open the configured backend and build the storage context.
    ///
    /// When the database cannot be opened and the config allows it, the
    /// shell degrades to a memory-only context instead of failing; the
    /// controllers keep working, values just stop surviving restarts.
    pub fn new(config: Config) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let context = match SqliteStorage::open(&config.database_path) {
            Ok(storage) => StorageContext::new(Arc::new(storage)),
            Err(e) if config.memory_fallback => {
                tracing::error!(
                    path = %config.database_path.display(),
                    error = %e,
                    "Falling back to memory-only storage"
                );
                StorageContext::new(Arc::new(MemoryStorage::new()))
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(path = %config.database_path.display(), "Shell storage ready");

        Ok(Self { config, context })
    }

    /// Shell over an in-memory backend (tests, ephemeral profiles).
    pub fn in_memory() -> Self {
        Self {
            config: Config::default(),
            context: StorageContext::in_memory(),
        }
    }

    pub fn context(&self) -> &StorageContext {
        &self.context
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_state::KeyedStore;

    #[test]
    fn test_in_memory_shell_round_trips() {
        let shell = Shell::in_memory();

        let theme = shell.context().keyed_with("theme", "dark".to_string());
        theme.set("light".to_string());

        let again: KeyedStore<String> = shell.context().keyed("theme");
        assert_eq!(again.get(), Some("light".to_string()));
    }

    #[test]
    fn test_controllers_from_one_shell_share_a_context() {
        let shell = Shell::in_memory();

        let a = shell.context().keyed_with("zoom", 100u32);
        let b = shell.context().keyed_with("zoom", 100u32);

        a.set(150);
        assert_eq!(b.get(), Some(150));
    }
}
