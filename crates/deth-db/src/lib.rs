//! # deth-db
//!
//! SQLite persistence for the deth daemon, stored at `$DETH_DATA_DIR/deth.db`.
//!
//! ## Schema
//!
//! - WAL mode, foreign keys enforced
//! - Timestamps are Unix seconds
//! - Schema version kept in `PRAGMA user_version`, migrations forward-only
//! - The protocol ledger is one JSON snapshot row tagged with its state
//!   version; committed transactions append to `ledger_events`

pub mod migrations;
pub mod queries;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 2;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("stored state version {found} is newer than supported {supported}")]
    StateVersion { found: u32, supported: u32 },
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the database at `path` and run pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    tracing::debug!(path = %path.display(), "database opened");
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_memory() {
        let conn = open_memory().expect("open in-memory db");
        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("get user_version");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = open_memory().expect("open");
        let fk: i32 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .expect("get foreign_keys");
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_reopen_file() {
        let dir = std::env::temp_dir().join(format!("deth-db-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join("deth.db");
        {
            let conn = open(&path).expect("create");
            queries::settings::set(&conn, "genesis_at", "7").expect("set");
        }
        let conn = open(&path).expect("reopen");
        assert_eq!(queries::settings::get(&conn, "genesis_at").expect("get"), "7");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
