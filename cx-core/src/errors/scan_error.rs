//! Errors from tree walking and incremental freshness checks.

use super::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("walk failed under '{root}': {message}")]
    WalkFailed { root: String, message: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
