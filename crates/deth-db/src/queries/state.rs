//! The protocol snapshot.
//!
//! One row holds the whole ledger as JSON. [`commit`] replaces it and
//! journals the transaction's events in a single SQLite transaction.

use rusqlite::{Connection, OptionalExtension};

use deth_pool::{Protocol, STATE_VERSION};
use deth_types::{Address, LedgerEvent, Timestamp};

use crate::queries::events;
use crate::{DbError, Result};

pub(crate) fn to_sql_time(ts: Timestamp) -> Result<i64> {
    i64::try_from(ts).map_err(|e| DbError::Serialization(format!("timestamp {ts}: {e}")))
}

/// Load the stored ledger, `None` before genesis.
pub fn load(conn: &Connection) -> Result<Option<Protocol>> {
    let row: Option<(u32, String)> = conn
        .query_row(
            "SELECT state_version, state FROM protocol_state WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((version, json)) = row else {
        return Ok(None);
    };
    if version > STATE_VERSION {
        return Err(DbError::StateVersion {
            found: version,
            supported: STATE_VERSION,
        });
    }
    let protocol: Protocol = serde_json::from_str(&json)?;
    protocol.check_version().map_err(|_| DbError::StateVersion {
        found: protocol.version(),
        supported: STATE_VERSION,
    })?;
    Ok(Some(protocol))
}

/// Replace the stored ledger.
pub fn save(conn: &Connection, protocol: &Protocol, now: Timestamp) -> Result<()> {
    let json = serde_json::to_string(protocol)?;
    conn.execute(
        "INSERT INTO protocol_state (id, state_version, state, updated_at) VALUES (1, ?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET
             state_version = excluded.state_version,
             state = excluded.state,
             updated_at = excluded.updated_at",
        rusqlite::params![protocol.version(), json, to_sql_time(now)?],
    )?;
    Ok(())
}

/// Persist a committed transaction: new snapshot plus its events.
///
/// Returns the journal id of the transaction.
pub fn commit(
    conn: &mut Connection,
    protocol: &Protocol,
    method: &str,
    sender: &Address,
    timestamp: Timestamp,
    journal: &[LedgerEvent],
) -> Result<i64> {
    let tx = conn.transaction()?;
    save(&tx, protocol, timestamp)?;
    let tx_id = events::record(&tx, method, sender, timestamp, journal)?;
    tx.commit()?;
    tracing::debug!(method, tx_id, events = journal.len(), "transaction persisted");
    Ok(tx_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deth_pool::ProtocolConfig;
    use deth_types::{TxContext, ONE_ETHER};

    const NOW: Timestamp = 1_700_000_000;

    fn genesis() -> Protocol {
        Protocol::genesis(&ProtocolConfig::default(), NOW).expect("genesis")
    }

    #[test]
    fn test_empty_before_genesis() {
        let conn = crate::open_memory().expect("open");
        assert!(load(&conn).expect("load").is_none());
    }

    #[test]
    fn test_commit_and_reload() {
        let mut conn = crate::open_memory().expect("open");
        let mut protocol = genesis();
        let alice = Address::derive("alice");
        protocol.fund_native(&alice, 5 * ONE_ETHER).expect("fund");
        let ctx = TxContext::new(alice, NOW + 1).with_value(2 * ONE_ETHER);
        let receipt = protocol.submit(&ctx, &alice).expect("submit");

        let tx_id = commit(&mut conn, &protocol, "pool_submit", &alice, NOW + 1, &receipt.events)
            .expect("commit");
        assert!(tx_id > 0);

        let loaded = load(&conn).expect("load").expect("present");
        assert_eq!(loaded, protocol);
        assert_eq!(loaded.token().balance_of(&alice), 2 * ONE_ETHER);
    }

    #[test]
    fn test_newer_state_version_rejected() {
        let conn = crate::open_memory().expect("open");
        save(&conn, &genesis(), NOW).expect("save");
        conn.execute(
            "UPDATE protocol_state SET state_version = ?1",
            [STATE_VERSION + 1],
        )
        .expect("bump");
        assert!(matches!(load(&conn), Err(DbError::StateVersion { .. })));
    }
}
