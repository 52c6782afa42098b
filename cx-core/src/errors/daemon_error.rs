//! Daemon and socket-client errors.

use super::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("daemon already running with pid {pid}")]
    AlreadyRunning { pid: u32 },

    #[error("timeout: {what}")]
    Timeout { what: String },

    #[error("protocol error: {message}")]
    Protocol { message: String },

    #[error("daemon unavailable: {message}")]
    Unavailable { message: String },

    /// An error the daemon itself reported in a response; surfaced
    /// unchanged, never subject to fallback.
    #[error("{message}")]
    Remote { message: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
