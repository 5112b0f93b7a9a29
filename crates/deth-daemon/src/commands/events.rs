//! `get_events`: page through the persisted event log.

use std::sync::Arc;

use serde_json::{json, Value};

use deth_db::queries::events as stored;

use super::{opt_u64, to_json, Result};
use crate::rpc::RpcError;
use crate::state::DaemonState;

const DEFAULT_PAGE: u64 = 100;
const MAX_PAGE: u64 = 1000;

/// Events with `seq > after`, oldest first. `name` filters on the event
/// name as journaled, e.g. `WithdrawQueued`.
pub async fn get_events(state: &Arc<DaemonState>, params: &Value) -> Result {
    let after = i64::try_from(opt_u64(params, "after")?.unwrap_or(0))
        .map_err(|_| RpcError::invalid_params("after out of range"))?;
    let limit = opt_u64(params, "limit")?.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE) as u32;
    let name = params.get("name").and_then(Value::as_str).map(str::to_owned);

    let ledger = state.ledger.lock().await;
    let events = match &name {
        Some(name) => stored::list_by_name(&ledger.db, name, after, limit),
        None => stored::list(&ledger.db, after, limit),
    }
    .map_err(|e| RpcError::storage(&e.to_string()))?;
    let latest = stored::latest_seq(&ledger.db).map_err(|e| RpcError::storage(&e.to_string()))?;

    Ok(json!({
        "events": to_json(&events)?,
        "latest_seq": latest,
    }))
}
