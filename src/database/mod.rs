//! Local relational store.
//!
//! Holds the current user directory (read to resolve who last modified a
//! metadata key) and the metadata-key table rebuilt by the decryption
//! pipeline. Only encrypted PGP messages are persisted here; decrypted
//! key material never reaches sqlite.

pub mod metadata_keys;
pub mod models;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

/// Errors from the local relational store.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),
}

/// Result type for database operations
pub type DbResult<T> = std::result::Result<T, DatabaseError>;

/// Main database connection and schema manager
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a database at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Create a new in-memory database for testing
    pub fn in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Direct access to the underlying connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    fn initialize_schema(&self) -> DbResult<()> {
        self.create_users_table()?;
        self.create_metadata_keys_table()?;
        self.create_metadata_private_keys_table()?;
        Ok(())
    }

    fn create_users_table(&self) -> DbResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                armored_public_key TEXT NOT NULL,
                key_fingerprint TEXT NOT NULL,
                disabled INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;
        Ok(())
    }

    fn create_metadata_keys_table(&self) -> DbResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS metadata_keys (
                id TEXT PRIMARY KEY,
                armored_key TEXT NOT NULL,
                fingerprint TEXT NOT NULL,
                modified TEXT NOT NULL,
                expired TEXT,
                deleted TEXT
            )",
            [],
        )?;
        Ok(())
    }

    fn create_metadata_private_keys_table(&self) -> DbResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS metadata_private_keys (
                id TEXT PRIMARY KEY,
                metadata_key_id TEXT NOT NULL REFERENCES metadata_keys(id) ON DELETE CASCADE,
                user_id TEXT NOT NULL,
                pgp_message TEXT NOT NULL,
                created TEXT NOT NULL,
                created_by TEXT,
                modified TEXT NOT NULL,
                modified_by TEXT
            )",
            [],
        )?;
        Ok(())
    }
}
