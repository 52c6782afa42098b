//! Raw SQL operations, one module per table family. All functions take a
//! `&Connection`; transaction scope is the caller's responsibility.

pub mod coverage;
pub mod dependencies;
pub mod embeddings;
pub mod entities;
pub mod file_index;
pub mod metrics;
pub mod test_map;

/// Helper trait to make `query_row` return `Option` on not-found.
pub(crate) trait OptionalRow<T> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalRow<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
