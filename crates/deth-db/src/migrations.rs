//! Schema migrations.
//!
//! A fresh database gets the v1 schema and then walks every later migration,
//! so new and upgraded databases take the same path.

use rusqlite::Connection;

use crate::{schema, DbError, Result, SCHEMA_VERSION};

/// Run all pending migrations.
pub fn run(conn: &Connection) -> Result<()> {
    let mut current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if current > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "database version {current} is newer than supported {SCHEMA_VERSION}"
        )));
    }

    if current == 0 {
        tracing::info!(version = 1, "initializing database schema");
        conn.execute_batch(schema::SCHEMA_V1)?;
        insert_default_settings(conn)?;
        conn.pragma_update(None, "user_version", 1u32)?;
        current = 1;
    }

    for version in (current + 1)..=SCHEMA_VERSION {
        tracing::info!(version, "running migration");
        run_migration(conn, version)?;
        conn.pragma_update(None, "user_version", version)?;
    }
    Ok(())
}

fn insert_default_settings(conn: &Connection) -> Result<()> {
    let defaults = [("genesis_at", "0"), ("dev_mode", "false")];
    let mut stmt = conn.prepare("INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)")?;
    for (key, value) in &defaults {
        stmt.execute(rusqlite::params![key, value])?;
    }
    Ok(())
}

fn run_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        2 => {
            conn.execute_batch(schema::MIGRATION_V2)?;
            Ok(())
        }
        _ => Err(DbError::Migration(format!("unknown migration version: {version}"))),
    }
}
