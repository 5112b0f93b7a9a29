//! SQL schema definitions.

/// Schema v1: settings and the protocol snapshot.
pub const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS protocol_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    state_version INTEGER NOT NULL,
    state TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;

/// Schema v2: ledger event journal.
pub const MIGRATION_V2: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    tx_id INTEGER PRIMARY KEY AUTOINCREMENT,
    method TEXT NOT NULL,
    sender TEXT NOT NULL,
    timestamp INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS ledger_events (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    tx_id INTEGER NOT NULL REFERENCES transactions(tx_id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    payload TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ledger_events_tx ON ledger_events(tx_id);
CREATE INDEX IF NOT EXISTS idx_ledger_events_name ON ledger_events(name);
"#;
