//! Storage error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage is disabled")]
    Disabled,

    #[error("Quota of {quota} bytes exceeded")]
    QuotaExceeded { quota: usize },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}
