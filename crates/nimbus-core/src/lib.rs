//! NIMBUS Core
//!
//! Central wiring for the shell's keyed persistence: opens the
//! configured backend, owns the process-wide storage context, and
//! re-exports the storage and state layers.

mod config;
mod error;
mod shell;

pub use config::Config;
pub use error::CoreError;
pub use shell::Shell;

pub use nimbus_state::{
    ChangeEvent, KeyedStore, Origin, StorageBus, StorageContext, Subscription, WatchGuard,
    CHANGE_CHANNEL,
};
pub use nimbus_storage::{MemoryStorage, SqliteStorage, StorageArea, StorageError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
