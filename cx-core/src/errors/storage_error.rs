//! Storage-layer errors for SQLite operations and ref resolution.

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    Sqlite { message: String },

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("invalid ref '{reference}': {reason}")]
    InvalidRef { reference: String, reason: String },

    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("migration failed at version {version}: {message}")]
    MigrationFailed { version: u32, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Wrap a rusqlite (or other displayable) error.
    pub fn sqlite(e: impl std::fmt::Display) -> Self {
        Self::Sqlite {
            message: e.to_string(),
        }
    }

    /// Typed lookup miss.
    pub fn not_found(what: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            id: id.into(),
        }
    }
}
