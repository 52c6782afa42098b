//! Connection management: one write connection behind a mutex, a small
//! round-robin read pool. WAL mode so readers never block the writer.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::debug;

use cx_core::errors::StorageError;

use crate::migrations;
use crate::sq;

const READ_POOL_SIZE: usize = 3;

/// Owns all connections to the store database. The single writer is the
/// serialization point; readers observe committed snapshots only.
pub struct DatabaseManager {
    path: Option<PathBuf>,
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    next_reader: AtomicUsize,
}

impl DatabaseManager {
    /// Open (creating if necessary) the database file and run migrations.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let writer = Connection::open(path).map_err(sq)?;
        apply_write_pragmas(&writer)?;
        migrations::run_migrations(&writer)?;

        let mut readers = Vec::with_capacity(READ_POOL_SIZE);
        for _ in 0..READ_POOL_SIZE {
            let conn = Connection::open(path).map_err(sq)?;
            apply_read_pragmas(&conn)?;
            readers.push(Mutex::new(conn));
        }

        debug!("opened store at {}", path.display());
        Ok(Self {
            path: Some(path.to_path_buf()),
            writer: Mutex::new(writer),
            readers,
            next_reader: AtomicUsize::new(0),
        })
    }

    /// In-memory database for tests. Reads route through the write
    /// connection because each in-memory connection is its own database.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let writer = Connection::open_in_memory().map_err(sq)?;
        migrations::run_migrations(&writer)?;
        Ok(Self {
            path: None,
            writer: Mutex::new(writer),
            readers: Vec::new(),
            next_reader: AtomicUsize::new(0),
        })
    }

    /// Database file path (None for in-memory).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run a read-only closure on a pooled read connection.
    pub fn with_reader<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        if self.readers.is_empty() {
            let conn = self.writer.lock().map_err(|_| sq("writer mutex poisoned"))?;
            return f(&conn);
        }
        let idx = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx]
            .lock()
            .map_err(|_| sq("reader mutex poisoned"))?;
        f(&conn)
    }

    /// Run a closure on the single write connection.
    pub fn with_writer<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let conn = self.writer.lock().map_err(|_| sq("writer mutex poisoned"))?;
        f(&conn)
    }

    /// Run a closure inside an immediate transaction on the write
    /// connection. Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let conn = self.writer.lock().map_err(|_| sq("writer mutex poisoned"))?;
        conn.execute_batch("BEGIN IMMEDIATE").map_err(sq)?;
        match f(&conn) {
            Ok(v) => {
                conn.execute_batch("COMMIT").map_err(sq)?;
                Ok(v)
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// WAL checkpoint, best-effort.
    pub fn checkpoint(&self) -> Result<(), StorageError> {
        self.with_writer(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE)")
                .map_err(sq)
        })
    }
}

fn apply_write_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )
    .map_err(sq)
}

fn apply_read_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "PRAGMA query_only = ON;
         PRAGMA busy_timeout = 5000;",
    )
    .map_err(sq)
}
