//! NIMBUS Keyed State
//!
//! Reactive per-key persistence over the shared storage backend.
//! A [`KeyedStore`] keeps one in-memory value synchronized with the
//! backend entry for its key and with every other controller watching
//! that key, whether it lives in the same execution context (via
//! [`StorageBus`]) or in another one (via platform change notifications
//! ingested through [`StorageContext`]).

mod bus;
pub mod codec;
mod context;
mod keyed;

pub use bus::{ChangeEvent, Origin, StorageBus, Subscription, CHANGE_CHANNEL};
pub use context::StorageContext;
pub use keyed::{KeyedStore, WatchGuard};
