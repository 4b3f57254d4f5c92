//! NIMBUS Storage Layer
//!
//! String-only key-value backends shared by every execution context.
//! Controllers never talk to a backend type directly; everything goes
//! through the [`StorageArea`] trait so tests can substitute
//! [`MemoryStorage`] for the durable [`SqliteStorage`].

mod area;
mod error;
mod memory;
mod sqlite;

pub use area::StorageArea;
pub use error::StorageError;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

pub type Result<T> = std::result::Result<T, StorageError>;
