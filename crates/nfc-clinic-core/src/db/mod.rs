//! Database layer: the Record Store and the Audit Log.
//!
//! Every public operation runs as one self-contained statement, so callers
//! sharing a [`SharedDatabase`] hold the lock only for the duration of a
//! single read or write.

mod schema;
mod patients;
mod audit;

pub use schema::*;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database lock poisoned: {0}")]
    LockPoisoned(String),
}

impl DbError {
    /// Whether the caller supplied bad input (as opposed to storage failing).
    pub fn is_validation(&self) -> bool {
        matches!(self, DbError::Validation(_))
    }
}

impl<T> From<PoisonError<T>> for DbError {
    fn from(e: PoisonError<T>) -> Self {
        DbError::LockPoisoned(e.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// A database handle shared between the interactive thread and background tasks.
pub type SharedDatabase = Arc<Mutex<Database>>;

/// Wrap a database for sharing across threads.
pub fn shared(db: Database) -> SharedDatabase {
    Arc::new(Mutex::new(db))
}

/// Lock a shared database for one operation.
pub fn acquire(db: &SharedDatabase) -> DbResult<MutexGuard<'_, Database>> {
    Ok(db.lock()?)
}

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // Returns the resulting mode as a row, so it cannot go through execute.
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        let db = Self { conn };
        db.initialize()?;
        tracing::debug!(path = %path.as_ref().display(), "opened clinic database");
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Map a stored timestamp column, surfacing parse failures as conversion errors.
fn timestamp_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<chrono::NaiveDateTime> {
    let raw: String = row.get(idx)?;
    crate::models::parse_timestamp(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        // Check that tables exist
        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"patients".to_string()));
        assert!(tables.contains(&"email_logs".to_string()));
        assert!(tables.contains(&"medication_history".to_string()));
    }

    #[test]
    fn test_open_file_reopens_existing_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("healthcare.db");

        {
            let db = Database::open(&path).unwrap();
            db.conn()
                .execute("INSERT INTO patients (uid) VALUES ('1A2B3C4D')", [])
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_acquire_shared() {
        let db = shared(Database::open_in_memory().unwrap());
        let guard = acquire(&db).unwrap();
        assert!(guard.conn().is_autocommit());
    }
}
