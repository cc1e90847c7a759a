pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

/// The process-wide connection to the store. Every statement goes through here.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)?.logged(&path.display().to_string())
    }

    /// Private, throwaway database. Nothing survives the handle.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)?.logged(":memory:")
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn logged(self, location: &str) -> Result<Self> {
        info!("Database opened at {}", location);
        Ok(self)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Runs `f` inside a transaction. Commits on `Ok`; any error (or panic)
    /// drops the transaction, which rolls it back.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

/// True when `err` came from SQLite rejecting a row on a UNIQUE, PRIMARY KEY,
/// FOREIGN KEY or CHECK constraint.
pub fn is_constraint_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<rusqlite::Error>(),
            Some(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_transaction_rolls_back() {
        let db = Database::open_in_memory().unwrap();

        let result: Result<()> = db.with_tx(|conn| {
            conn.execute("INSERT INTO user_list (list_type) VALUES ('block')", [])?;
            anyhow::bail!("abort after first insert");
        });
        assert!(result.is_err());

        let lists: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM user_list", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(lists, 0);
    }

    #[test]
    fn constraint_violations_are_recognised() {
        let db = Database::open_in_memory().unwrap();

        let err = db
            .with_conn(|conn| {
                conn.execute("INSERT INTO user_list (list_type) VALUES ('friends')", [])?;
                Ok(())
            })
            .unwrap_err();
        assert!(is_constraint_violation(&err));
        assert!(!is_constraint_violation(&anyhow::anyhow!("unrelated")));
    }

    #[test]
    fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messenger.db");

        {
            let db = Database::open(&path).unwrap();
            db.create_user("alice", "hash", Some("555-0100")).unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert!(db.user_exists("alice").unwrap());
    }
}
