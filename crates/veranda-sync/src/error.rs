//! Error types for the sync engine.

use thiserror::Error;
use veranda_store::StoreError;

/// A result type using `SyncError`.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur in the sync engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A backup document could not be parsed or has the wrong shape.
    #[error("invalid backup document: {0}")]
    InvalidBackup(String),

    /// A local storage operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
