//! Daemon-wide state: the ledger, its database and the event bus.

use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::Connection;
use tokio::sync::{broadcast, Mutex};
use tracing::info;

use deth_db::queries::{settings, state as stored};
use deth_pool::Protocol;
use deth_types::Timestamp;

use crate::config::DaemonConfig;
use crate::events::EventBus;

/// The ledger and the connection it is persisted through. Held under one
/// lock so a call and its persistence are serialized together.
pub struct Ledger {
    pub protocol: Protocol,
    pub db: Connection,
}

/// Shared daemon state.
pub struct DaemonState {
    /// Ledger and database.
    pub ledger: Mutex<Ledger>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Committed ledger events.
    pub event_bus: EventBus,
    /// Shutdown signal.
    pub shutdown_tx: broadcast::Sender<()>,
}

/// Wall-clock Unix seconds.
pub fn now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl DaemonState {
    /// Load the stored ledger or create it from `config.protocol`.
    pub fn open(config: DaemonConfig, db: Connection, now: Timestamp) -> anyhow::Result<Self> {
        let protocol = match stored::load(&db)? {
            Some(protocol) => {
                info!(
                    version = protocol.version(),
                    deth_supply = protocol.token().total_supply(),
                    "ledger loaded"
                );
                protocol
            }
            None => {
                let protocol = Protocol::genesis(&config.protocol, now)?;
                stored::save(&db, &protocol, now)?;
                settings::set(&db, "genesis_at", &now.to_string())?;
                info!(genesis_at = now, "ledger created");
                protocol
            }
        };
        settings::set(&db, "dev_mode", &config.advanced.dev_commands.to_string())?;

        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            ledger: Mutex::new(Ledger { protocol, db }),
            event_bus: EventBus::new(config.rpc.event_buffer),
            config,
            shutdown_tx,
        })
    }
}
