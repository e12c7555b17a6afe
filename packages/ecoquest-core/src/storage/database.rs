//! # Database
//!
//! SQLite database wrapper.
//!
//! ## Database Operations
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      DATABASE OPERATIONS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │  EcoService     │  Ledger, challenges, actions, communities ...     │
//! │  └────────┬────────┘                                                   │
//! │           │ write(|tx| ...) / read(|conn| ...)                          │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │    Database     │  One connection behind a mutex                    │
//! │  │   (this file)   │  - BEGIN IMMEDIATE per write                      │
//! │  │                 │  - commit on Ok, rollback on Err                  │
//! │  └────────┬────────┘                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │   SQLite DB     │  - In-memory for tests                            │
//! │  │                 │  - File for production                            │
//! │  └─────────────────┘                                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};

use super::schema;
use crate::error::{Error, Result};

/// Database configuration
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    /// Path to the database file; `None` opens an in-memory database
    pub path: Option<String>,
    /// Insert the default challenge, badge and task catalog
    pub seed_catalog: bool,
}

/// The main database handle
///
/// Wraps a single SQLite connection. Writers hold the mutex for the whole
/// transaction, so two awards for the same user always serialize.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create a database
    ///
    /// If path is None, creates an in-memory database (useful for testing).
    pub fn open(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)
                .map_err(|e| Error::DatabaseError(format!("Failed to open database: {}", e)))?,
            None => Connection::open_in_memory().map_err(|e| {
                Error::DatabaseError(format!("Failed to create in-memory database: {}", e))
            })?,
        };

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| Error::DatabaseError(format!("Failed to enable foreign keys: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Open a database from configuration, seeding the catalog if asked.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let db = Self::open(config.path.as_deref())?;
        if config.seed_catalog {
            db.seed_catalog()?;
        }
        Ok(db)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        let version: Option<i32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .ok();

        match version {
            None => {
                conn.execute_batch(schema::CREATE_TABLES)
                    .map_err(|e| Error::DatabaseError(format!("Failed to create tables: {}", e)))?;

                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?)",
                    params![schema::SCHEMA_VERSION],
                )
                .map_err(|e| Error::DatabaseError(format!("Failed to set schema version: {}", e)))?;

                tracing::info!("Database schema created (version {})", schema::SCHEMA_VERSION);
            }
            Some(v) if v > schema::SCHEMA_VERSION => {
                return Err(Error::DatabaseError(format!(
                    "Database schema version {} is newer than supported version {}",
                    v,
                    schema::SCHEMA_VERSION
                )));
            }
            Some(v) => {
                tracing::debug!("Database schema version: {}", v);
            }
        }

        Ok(())
    }

    /// Insert the default catalog (idempotent).
    pub fn seed_catalog(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(schema::SEED_CATALOG)
            .map_err(|e| Error::DatabaseError(format!("Failed to seed catalog: {}", e)))?;
        tracing::info!("Catalog seeded");
        Ok(())
    }

    /// Run `f` inside an immediate write transaction.
    ///
    /// Commits when `f` returns `Ok`; any `Err` drops the transaction,
    /// which rolls every statement back.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Run a read-only closure against the connection.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_creation() {
        let db = Database::open(None).unwrap();
        let version: i32 = db
            .read(|conn| {
                Ok(conn.query_row("SELECT version FROM schema_version", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(version, schema::SCHEMA_VERSION);
    }

    #[test]
    fn test_seed_catalog_is_idempotent() {
        let db = Database::open(None).unwrap();
        db.seed_catalog().unwrap();
        db.seed_catalog().unwrap();
        let (challenges, badges, tasks): (i64, i64, i64) = db
            .read(|conn| {
                Ok(conn.query_row(
                    "SELECT (SELECT COUNT(*) FROM challenges), (SELECT COUNT(*) FROM badges), (SELECT COUNT(*) FROM tasks)",
                    [],
                    |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
                )?)
            })
            .unwrap();
        assert_eq!(challenges, 5);
        assert_eq!(badges, 14);
        assert_eq!(tasks, 4);
    }

    #[test]
    fn test_write_rolls_back_on_error() {
        let db = Database::open(None).unwrap();
        let result: Result<()> = db.write(|tx| {
            tx.execute(
                "INSERT INTO profiles (id, display_name, created_at, updated_at) VALUES ('u1', 'A', 0, 0)",
                [],
            )?;
            Err(Error::Internal("forced".into()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM profiles", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_reopen_file_database_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ecoquest.db");
        let path = path.to_str().unwrap();

        {
            let db = Database::open(Some(path)).unwrap();
            db.write(|tx| {
                tx.execute(
                    "INSERT INTO profiles (id, display_name, created_at, updated_at) VALUES ('u1', 'A', 0, 0)",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        }

        let db = Database::open(Some(path)).unwrap();
        let count: i64 = db
            .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM profiles", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
    }
}
