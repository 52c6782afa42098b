//! # cx-storage
//!
//! SQLite persistence layer for the cx code graph.
//! WAL mode, write-serialized + read-pooled, versioned snapshots with
//! diff/log/history/time-travel, FTS5 search, embedding store, staging.

pub mod connection;
pub mod migrations;
pub mod queries;
pub mod search;
pub mod staging;
pub mod store;
pub mod versioning;

pub use connection::DatabaseManager;
pub use store::Store;

use cx_core::errors::StorageError;

/// Helper to convert a rusqlite (or other displayable) error into a
/// `StorageError::Sqlite`.
pub(crate) fn sq(e: impl std::fmt::Display) -> StorageError {
    StorageError::Sqlite {
        message: e.to_string(),
    }
}
