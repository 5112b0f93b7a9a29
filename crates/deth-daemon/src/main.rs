//! deth-daemon: hosts the deth ledger.
//!
//! Single process on a Tokio runtime. Clients talk newline-delimited
//! JSON-RPC 2.0 over a Unix socket in the data directory; every committed
//! call is persisted to SQLite and its events broadcast to subscribers.

mod commands;
mod config;
mod events;
mod rpc;
mod state;

use std::sync::Arc;

use tracing::{error, info};

use crate::config::DaemonConfig;
use crate::rpc::RpcServer;
use crate::state::DaemonState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = DaemonConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("deth={}", config.advanced.log_level).parse()?),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "deth daemon starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let db = deth_db::open(&data_dir.join("deth.db"))?;
    let socket_path = config.socket_path();
    let state = Arc::new(DaemonState::open(config, db, state::now())?);
    if state.config.advanced.dev_commands {
        info!("dev commands enabled");
    }

    let server = RpcServer::new(state.clone(), socket_path.clone());
    let mut shutdown_rx = state.shutdown_tx.subscribe();
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(error = %e, "RPC server error");
            }
        }
        _ = shutdown_rx.recv() => {
            info!("shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c received, shutting down");
        }
    }

    let _ = std::fs::remove_file(&socket_path);
    info!("daemon stopped");
    Ok(())
}
