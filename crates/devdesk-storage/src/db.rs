//! SQLite connection handling.
//!
//! One `Connection` per process, serialized behind a `Mutex`. Opening a
//! database applies the pragma set and brings the schema up to date, so
//! a `Database` handle is always ready for queries.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use devdesk_core::error::DevDeskError;

use crate::migrations;

/// Handle to the SQLite store shared by every repository.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file at `path` and migrate it.
    pub fn new(path: &Path) -> Result<Self, DevDeskError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| DevDeskError::Storage(format!("Failed to open database: {}", e)))?;

        // WAL keeps readers unblocked while a query cycle writes its log row.
        set_pragma(&conn, "journal_mode", "WAL")?;
        set_pragma(&conn, "synchronous", "NORMAL")?;
        set_pragma(&conn, "foreign_keys", "ON")?;

        info!("Database opened at {}", path.display());
        Self::migrated(conn)
    }

    /// In-memory database for tests. No WAL; the journal pragma is a
    /// no-op without a file.
    pub fn in_memory() -> Result<Self, DevDeskError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DevDeskError::Storage(format!("Failed to open in-memory db: {}", e)))?;
        set_pragma(&conn, "foreign_keys", "ON")?;
        Self::migrated(conn)
    }

    fn migrated(conn: Connection) -> Result<Self, DevDeskError> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Run `f` with exclusive access to the connection.
    ///
    /// Every repository call funnels through here; the lock is held only
    /// for the closure's duration.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DevDeskError>
    where
        F: FnOnce(&Connection) -> Result<T, DevDeskError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DevDeskError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

fn set_pragma(conn: &Connection, name: &str, value: &str) -> Result<(), DevDeskError> {
    conn.pragma_update(None, name, value)
        .map_err(|e| DevDeskError::Storage(format!("Failed to set {}: {}", name, e)))
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}
