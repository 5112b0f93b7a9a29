//! RPC command handlers, one submodule per method prefix.
//!
//! Mutating handlers run through [`transact`]: the ledger call, its
//! persistence and the event broadcast happen under one lock. Amounts are
//! decimal strings of wei; JSON numbers are accepted when they fit `u64`.

pub mod admin;
pub mod dev;
pub mod events;
pub mod oracle;
pub mod pool;
pub mod strategy;
pub mod token;
pub mod vault;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use deth_db::queries::state as stored;
use deth_pool::{Protocol, Receipt};
use deth_types::{Address, Timestamp, TxContext, Wei};

use crate::events::Event;
use crate::rpc::RpcError;
use crate::state::DaemonState;

pub type Result = std::result::Result<Value, RpcError>;

type Param<T> = std::result::Result<T, RpcError>;

fn field<'a>(params: &'a Value, key: &str) -> Option<&'a Value> {
    params.get(key).filter(|v| !v.is_null())
}

/// Required address parameter.
pub fn address(params: &Value, key: &str) -> Param<Address> {
    opt_address(params, key)?.ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

/// Optional address parameter.
pub fn opt_address(params: &Value, key: &str) -> Param<Option<Address>> {
    field(params, key)
        .map(|v| {
            v.as_str()
                .ok_or_else(|| RpcError::invalid_params(&format!("{key} must be a string")))?
                .parse::<Address>()
                .map_err(|e| RpcError::invalid_params(&format!("{key}: {e}")))
        })
        .transpose()
}

/// Required wei amount.
pub fn wei(params: &Value, key: &str) -> Param<Wei> {
    opt_wei(params, key)?.ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

/// Optional wei amount.
pub fn opt_wei(params: &Value, key: &str) -> Param<Option<Wei>> {
    field(params, key)
        .map(|v| match v {
            Value::String(s) => s
                .parse::<Wei>()
                .map_err(|e| RpcError::invalid_params(&format!("{key}: {e}"))),
            Value::Number(n) => n
                .as_u64()
                .map(Wei::from)
                .ok_or_else(|| RpcError::invalid_params(&format!("{key} must be a non-negative integer"))),
            _ => Err(RpcError::invalid_params(&format!("{key} must be a decimal string"))),
        })
        .transpose()
}

/// Required `u64`.
pub fn u64_param(params: &Value, key: &str) -> Param<u64> {
    opt_u64(params, key)?.ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

/// Optional `u64`, as a number or a decimal string.
pub fn opt_u64(params: &Value, key: &str) -> Param<Option<u64>> {
    field(params, key)
        .map(|v| match v {
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| RpcError::invalid_params(&format!("{key} must be a non-negative integer"))),
            Value::String(s) => s
                .parse::<u64>()
                .map_err(|e| RpcError::invalid_params(&format!("{key}: {e}"))),
            _ => Err(RpcError::invalid_params(&format!("{key} must be an integer"))),
        })
        .transpose()
}

/// Required parameter decoded through serde, e.g. an enum name.
pub fn typed<T: DeserializeOwned>(params: &Value, key: &str) -> Param<T> {
    let value = field(params, key).ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))?;
    serde_json::from_value(value.clone()).map_err(|e| RpcError::invalid_params(&format!("{key}: {e}")))
}

/// Wei as a JSON decimal string.
pub fn wei_json(amount: Wei) -> Value {
    Value::String(amount.to_string())
}

/// Map a component error onto its RPC error.
pub fn ledger_err(err: impl Into<deth_pool::PoolError>) -> RpcError {
    RpcError::from_pool(&err.into())
}

/// Serialize a handler result.
pub fn to_json<T: serde::Serialize>(value: &T) -> Result {
    serde_json::to_value(value).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Block time of the call: wall clock, or `timestamp` when dev commands
/// are enabled.
pub fn timestamp(state: &DaemonState, params: &Value) -> Param<Timestamp> {
    match opt_u64(params, "timestamp")? {
        Some(_) if !state.config.advanced.dev_commands => Err(RpcError::dev_disabled()),
        Some(ts) => Ok(ts),
        None => Ok(crate::state::now()),
    }
}

/// Sender, attached value and block time of a mutating call.
pub fn context(state: &DaemonState, params: &Value) -> Param<TxContext> {
    let sender = address(params, "sender")?;
    let value = opt_wei(params, "value")?.unwrap_or(0);
    Ok(TxContext::new(sender, timestamp(state, params)?).with_value(value))
}

/// Run a ledger transaction, persist it and broadcast its events.
pub async fn transact<F>(state: &Arc<DaemonState>, params: &Value, method: &str, op: F) -> Result
where
    F: FnOnce(&mut Protocol, &TxContext) -> deth_pool::Result<Receipt<Value>>,
{
    let ctx = context(state, params)?;
    let mut guard = state.ledger.lock().await;
    let ledger = &mut *guard;
    let before = ledger.protocol.clone();

    let receipt = op(&mut ledger.protocol, &ctx).map_err(|e| {
        debug!(method, sender = %ctx.sender, error = %e, "call rejected");
        RpcError::from_pool(&e)
    })?;

    let tx_id = match stored::commit(&mut ledger.db, &ledger.protocol, method, &ctx.sender, ctx.timestamp, &receipt.events) {
        Ok(tx_id) => tx_id,
        Err(e) => {
            ledger.protocol = before;
            error!(method, error = %e, "failed to persist transaction");
            return Err(RpcError::storage(&e.to_string()));
        }
    };
    drop(guard);

    for event in &receipt.events {
        state.event_bus.emit(Event {
            tx_id,
            method: method.to_string(),
            sender: ctx.sender,
            timestamp: ctx.timestamp,
            event: event.clone(),
        });
    }

    Ok(serde_json::json!({
        "tx_id": tx_id,
        "result": receipt.value,
        "events": receipt.events,
    }))
}

/// Run a read-only query against the ledger at the call's time.
pub async fn read<F>(state: &Arc<DaemonState>, params: &Value, query: F) -> Result
where
    F: FnOnce(&Protocol, Timestamp) -> Result,
{
    let now = timestamp(state, params)?;
    let ledger = state.ledger.lock().await;
    query(&ledger.protocol, now)
}
