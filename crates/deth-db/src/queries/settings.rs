//! Key/value settings.

use rusqlite::{Connection, OptionalExtension};

use crate::{DbError, Result};

/// Value of `key`.
pub fn get(conn: &Connection, key: &str) -> Result<String> {
    conn.query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| row.get(0))
        .optional()?
        .ok_or_else(|| DbError::NotFound(format!("setting '{key}'")))
}

/// Insert or replace `key`.
pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

/// `key` parsed as a boolean, `default` when unset.
pub fn get_bool(conn: &Connection, key: &str, default: bool) -> Result<bool> {
    match get(conn, key) {
        Ok(v) => Ok(matches!(v.as_str(), "true" | "1")),
        Err(DbError::NotFound(_)) => Ok(default),
        Err(e) => Err(e),
    }
}

/// `key` parsed as a `u64`, `default` when unset.
pub fn get_u64(conn: &Connection, key: &str, default: u64) -> Result<u64> {
    match get(conn, key) {
        Ok(v) => v
            .parse()
            .map_err(|e: std::num::ParseIntError| DbError::Serialization(format!("setting '{key}': {e}"))),
        Err(DbError::NotFound(_)) => Ok(default),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    #[test]
    fn test_defaults_present() {
        let conn = db();
        assert_eq!(get_u64(&conn, "genesis_at", 99).expect("get"), 0);
        assert!(!get_bool(&conn, "dev_mode", true).expect("get"));
    }

    #[test]
    fn test_set_overwrites() {
        let conn = db();
        set(&conn, "dev_mode", "true").expect("set");
        set(&conn, "dev_mode", "1").expect("set again");
        assert!(get_bool(&conn, "dev_mode", false).expect("get"));
    }

    #[test]
    fn test_missing_key() {
        let conn = db();
        assert!(matches!(get(&conn, "nope"), Err(DbError::NotFound(_))));
        assert_eq!(get_u64(&conn, "nope", 5).expect("default"), 5);
    }

    #[test]
    fn test_bad_number() {
        let conn = db();
        set(&conn, "genesis_at", "soon").expect("set");
        assert!(matches!(
            get_u64(&conn, "genesis_at", 0),
            Err(DbError::Serialization(_))
        ));
    }
}
