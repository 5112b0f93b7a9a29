//! Dev-mode helpers. Rejected unless `advanced.dev_commands` is set.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use deth_db::queries::state as stored;

use super::{address, timestamp, wei, wei_json, Result};
use crate::rpc::RpcError;
use crate::state::DaemonState;

/// Credit `amount` of native ETH to `account`.
pub async fn fund_native(state: &Arc<DaemonState>, params: &Value) -> Result {
    if !state.config.advanced.dev_commands {
        return Err(RpcError::dev_disabled());
    }
    let account = address(params, "account")?;
    let amount = wei(params, "amount")?;
    let now = timestamp(state, params)?;

    let mut ledger = state.ledger.lock().await;
    let before = ledger.protocol.clone();
    ledger
        .protocol
        .fund_native(&account, amount)
        .map_err(|e| RpcError::from_pool(&e))?;
    if let Err(e) = stored::save(&ledger.db, &ledger.protocol, now) {
        ledger.protocol = before;
        return Err(RpcError::storage(&e.to_string()));
    }
    warn!(%account, amount, "native balance funded by dev command");
    Ok(wei_json(ledger.protocol.native().balance_of(&account)))
}
