//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] nimbus_storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
