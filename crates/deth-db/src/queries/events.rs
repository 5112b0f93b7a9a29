//! Ledger event journal.

use rusqlite::{Connection, Row};
use serde::Serialize;

use deth_types::{Address, LedgerEvent, Timestamp};

use crate::queries::state::to_sql_time;
use crate::{DbError, Result};

/// A journaled event with its transaction metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredEvent {
    pub seq: i64,
    pub tx_id: i64,
    pub method: String,
    pub sender: Address,
    pub timestamp: Timestamp,
    pub event: LedgerEvent,
}

/// Journal one transaction and its events. Returns the transaction id.
pub fn record(
    conn: &Connection,
    method: &str,
    sender: &Address,
    timestamp: Timestamp,
    events: &[LedgerEvent],
) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions (method, sender, timestamp) VALUES (?1, ?2, ?3)",
        rusqlite::params![method, sender.to_string(), to_sql_time(timestamp)?],
    )?;
    let tx_id = conn.last_insert_rowid();

    let mut stmt = conn.prepare("INSERT INTO ledger_events (tx_id, name, payload) VALUES (?1, ?2, ?3)")?;
    for event in events {
        let payload = serde_json::to_string(event)?;
        stmt.execute(rusqlite::params![tx_id, event.name(), payload])?;
    }
    Ok(tx_id)
}

const SELECT: &str = "SELECT e.seq, e.tx_id, t.method, t.sender, t.timestamp, e.payload
     FROM ledger_events e JOIN transactions t ON t.tx_id = e.tx_id";

type RawEvent = (i64, i64, String, String, i64, String);

fn raw(row: &Row<'_>) -> rusqlite::Result<RawEvent> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn decode((seq, tx_id, method, sender, timestamp, payload): RawEvent) -> Result<StoredEvent> {
    Ok(StoredEvent {
        seq,
        tx_id,
        method,
        sender: sender
            .parse()
            .map_err(|e| DbError::Serialization(format!("sender of event {seq}: {e}")))?,
        timestamp: u64::try_from(timestamp)
            .map_err(|e| DbError::Serialization(format!("timestamp of event {seq}: {e}")))?,
        event: serde_json::from_str(&payload)?,
    })
}

/// Events with `seq > after`, oldest first, at most `limit`.
pub fn list(conn: &Connection, after: i64, limit: u32) -> Result<Vec<StoredEvent>> {
    let mut stmt = conn.prepare(&format!("{SELECT} WHERE e.seq > ?1 ORDER BY e.seq LIMIT ?2"))?;
    let rows = stmt.query_map(rusqlite::params![after, limit], raw)?;
    let events = rows.map(|r| decode(r?)).collect::<Result<Vec<_>>>()?;
    Ok(events)
}

/// Like [`list`], restricted to events named `name`.
pub fn list_by_name(conn: &Connection, name: &str, after: i64, limit: u32) -> Result<Vec<StoredEvent>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT} WHERE e.name = ?1 AND e.seq > ?2 ORDER BY e.seq LIMIT ?3"
    ))?;
    let rows = stmt.query_map(rusqlite::params![name, after, limit], raw)?;
    let events = rows.map(|r| decode(r?)).collect::<Result<Vec<_>>>()?;
    Ok(events)
}

/// Highest journaled sequence number, 0 when empty.
pub fn latest_seq(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COALESCE(MAX(seq), 0) FROM ledger_events", [], |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deth_types::Component;

    fn db() -> Connection {
        crate::open_memory().expect("open")
    }

    fn pause(paused: bool) -> LedgerEvent {
        LedgerEvent::PauseChanged {
            component: Component::Pool,
            paused,
        }
    }

    #[test]
    fn test_record_and_list() {
        let conn = db();
        let sender = Address::derive("guardian");
        let submitted = LedgerEvent::Withdrawn {
            sender,
            receiver: sender,
            amount: u128::MAX,
        };
        let tx = record(&conn, "admin_pause_pool", &sender, 10, &[pause(true), submitted.clone()])
            .expect("record");

        let all = list(&conn, 0, 100).expect("list");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].tx_id, tx);
        assert_eq!(all[0].event, pause(true));
        assert_eq!(all[1].event, submitted);
        assert_eq!(all[1].sender, sender);
        assert_eq!(all[1].timestamp, 10);
        assert_eq!(latest_seq(&conn).expect("seq"), all[1].seq);
    }

    #[test]
    fn test_cursor_and_filter() {
        let conn = db();
        let sender = Address::derive("owner");
        record(&conn, "a", &sender, 1, &[pause(true)]).expect("record");
        record(&conn, "b", &sender, 2, &[pause(false)]).expect("record");
        record(&conn, "c", &sender, 3, &[]).expect("empty tx");

        let first = list(&conn, 0, 1).expect("page");
        assert_eq!(first.len(), 1);
        let rest = list(&conn, first[0].seq, 10).expect("rest");
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].method, "b");

        let named = list_by_name(&conn, "PauseChanged", 0, 10).expect("filter");
        assert_eq!(named.len(), 2);
        assert!(list_by_name(&conn, "Claimed", 0, 10).expect("filter").is_empty());
    }
}
