//! Database connection management.
//!
//! Wraps a single rusqlite Connection in a Mutex for thread-safe access.
//! Configures WAL mode and recommended PRAGMAs on initialization.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::info;

use intake_core::error::IntakeError;

use crate::migrations;

/// Thread-safe SQLite database wrapper.
///
/// Uses WAL mode for concurrent read/write safety. The connection is
/// wrapped in a Mutex since rusqlite Connection is not Sync.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database at the given path.
    ///
    /// Configures WAL mode, synchronous=NORMAL, foreign keys, and runs
    /// all pending migrations.
    pub fn new(path: &Path) -> Result<Self, IntakeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| IntakeError::Storage(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(|e| IntakeError::Storage(format!("Failed to set pragmas: {}", e)))?;

        info!("Database opened at {}", path.display());

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.with_conn(migrations::run_migrations)?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, IntakeError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| IntakeError::Storage(format!("Failed to open in-memory db: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| IntakeError::Storage(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.with_conn(migrations::run_migrations)?;

        Ok(db)
    }

    /// Execute a closure with a reference to the underlying connection.
    ///
    /// The mutex is held for the duration of the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, IntakeError>
    where
        F: FnOnce(&Connection) -> Result<T, IntakeError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| IntakeError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Execute a closure inside an immediate transaction.
    ///
    /// Commits when the closure returns Ok; any error rolls the whole
    /// transaction back, leaving no partial state. This is the unit used for
    /// every append-event-and-recompute-projection mutation.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T, IntakeError>
    where
        F: FnOnce(&Transaction) -> Result<T, IntakeError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| IntakeError::Storage(format!("Database lock poisoned: {}", e)))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| IntakeError::Storage(format!("Failed to begin transaction: {}", e)))?;
        let result = f(&tx)?;
        tx.commit()
            .map_err(|e| IntakeError::Storage(format!("Failed to commit transaction: {}", e)))?;
        Ok(result)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_database() {
        let db = Database::in_memory().unwrap();
        let count: i64 = db
            .with_conn(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM schema_migrations",
                    [],
                    |row| row.get(0),
                )
                .map_err(|e| IntakeError::Storage(e.to_string()))
            })
            .unwrap();
        assert!(count >= 1);
    }

    #[test]
    fn test_file_database_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("intake.db");
        let _db = Database::new(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_with_tx_rolls_back_on_error() {
        let db = Database::in_memory().unwrap();

        let result: Result<(), IntakeError> = db.with_tx(|tx| {
            tx.execute(
                "INSERT INTO submission (level, created_at) VALUES ('trial', 0)",
                [],
            )
            .map_err(|e| IntakeError::Storage(e.to_string()))?;
            Err(IntakeError::Storage("forced failure".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM submission", [], |row| row.get(0))
                    .map_err(|e| IntakeError::Storage(e.to_string()))
            })
            .unwrap();
        assert_eq!(count, 0);
    }
}
