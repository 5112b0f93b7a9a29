//! JSON-RPC 2.0 server over a Unix socket.
//!
//! One request per line, one response per line. After `subscribe_events`
//! the connection also receives `ledger_event` notifications.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use deth_oracle::OracleError;
use deth_pool::PoolError;
use deth_token::TokenError;
use deth_types::{AccessError, MathError};
use deth_vault::VaultError;

use crate::commands;
use crate::events::{Event, EventFilter};
use crate::state::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// Must be "2.0".
    pub jsonrpc: String,
    /// Request id, echoed back.
    #[serde(default)]
    pub id: Value,
    /// Method name.
    pub method: String,
    /// Named parameters.
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcResponse {
    /// A success response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// An error response.
    pub fn error(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    fn new(code: i32, message: &str, detail: Option<String>) -> Self {
        Self {
            code,
            message: message.to_string(),
            data: detail.map(|d| serde_json::json!({ "detail": d })),
        }
    }

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self::new(-32700, "PARSE_ERROR", None)
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self::new(-32600, "INVALID_REQUEST", None)
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "METHOD_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({ "method": method })),
        }
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self::new(-32602, "INVALID_PARAMS", Some(detail.to_string()))
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self::new(-32603, "INTERNAL_ERROR", Some(detail.to_string()))
    }

    /// Dev command while dev commands are disabled (-32050).
    pub fn dev_disabled() -> Self {
        Self::new(-32050, "DEV_COMMANDS_DISABLED", None)
    }

    /// Database failure (-32060).
    pub fn storage(detail: &str) -> Self {
        Self::new(-32060, "STORAGE_ERROR", Some(detail.to_string()))
    }

    /// A rejected ledger operation.
    pub fn from_pool(err: &PoolError) -> Self {
        let (code, message) = classify(err);
        Self::new(code, message, Some(err.to_string()))
    }
}

fn classify_access(err: &AccessError) -> (i32, &'static str) {
    match err {
        AccessError::Paused => (-32025, "PAUSED"),
        AccessError::NotOwner(_) | AccessError::NotPendingOwner(_) | AccessError::MissingRole { .. } => {
            (-32021, "UNAUTHORIZED")
        }
        AccessError::ZeroAddress => (-32020, "INVALID_INPUT"),
        AccessError::AlreadyMember { .. }
        | AccessError::NotMember { .. }
        | AccessError::SameValue
        | AccessError::NotPaused => (-32022, "STATE_CONFLICT"),
    }
}

fn classify_math(_: &MathError) -> (i32, &'static str) {
    (-32026, "ARITHMETIC")
}

fn classify_token(err: &TokenError) -> (i32, &'static str) {
    use TokenError as E;
    match err {
        E::ZeroAmount | E::ZeroAddress => (-32020, "INVALID_INPUT"),
        E::InsufficientBalance { .. } | E::InsufficientAllowance { .. } => (-32024, "INSUFFICIENT_FUNDS"),
        E::NotMinter(_) => (-32021, "UNAUTHORIZED"),
        E::MinterCapExceeded { .. } => (-32023, "LIMIT_EXCEEDED"),
        E::CapBelowMinted { .. } | E::SameValue => (-32022, "STATE_CONFLICT"),
        E::Access(e) => classify_access(e),
        E::Math(e) => classify_math(e),
    }
}

fn classify_vault(err: &VaultError) -> (i32, &'static str) {
    use VaultError as E;
    match err {
        E::ZeroAmount | E::ZeroShares { .. } | E::ZeroAssets { .. } | E::ZeroDuration => {
            (-32020, "INVALID_INPUT")
        }
        E::RewardExceedsAvailable { .. } => (-32023, "LIMIT_EXCEEDED"),
        E::SameValue => (-32022, "STATE_CONFLICT"),
        E::Shares(e) | E::Underlying(e) => classify_token(e),
        E::Access(e) => classify_access(e),
        E::Math(e) => classify_math(e),
    }
}

fn classify_oracle(err: &OracleError) -> (i32, &'static str) {
    match err {
        OracleError::ZeroValidatorCount
        | OracleError::EpochMismatch { .. }
        | OracleError::EpochNotAdvanced { .. }
        | OracleError::EpochInFuture { .. } => (-32020, "INVALID_INPUT"),
        OracleError::ValidatorLimitExceeded { .. } | OracleError::InterestRateExceeded { .. } => {
            (-32023, "LIMIT_EXCEEDED")
        }
        OracleError::SupplyFailed(_) => (-32027, "REWARD_SUPPLY_FAILED"),
        OracleError::SameValue => (-32022, "STATE_CONFLICT"),
        OracleError::Access(e) => classify_access(e),
        OracleError::Math(e) => classify_math(e),
    }
}

/// Stable code and name for a ledger error.
pub fn classify(err: &PoolError) -> (i32, &'static str) {
    match err {
        PoolError::ZeroAmount
        | PoolError::ZeroAddress
        | PoolError::NotPayable
        | PoolError::InvalidRatio(_)
        | PoolError::UnknownStrategy(_) => (-32020, "INVALID_INPUT"),
        PoolError::NotRewardOracle(_) | PoolError::NotStrategist(_) => (-32021, "UNAUTHORIZED"),
        PoolError::SameValue
        | PoolError::AdapterExists(_)
        | PoolError::StrategyAlreadyAdded(_)
        | PoolError::StrategyCoreMismatch { .. }
        | PoolError::UnsupportedStateVersion { .. } => (-32022, "STATE_CONFLICT"),
        PoolError::BelowThreshold { .. } | PoolError::LimitExceeded { .. } => (-32023, "LIMIT_EXCEEDED"),
        PoolError::InsufficientReserve { .. } | PoolError::InsufficientEth { .. } => {
            (-32024, "INSUFFICIENT_FUNDS")
        }
        PoolError::NoClaimAmount => (-32028, "NO_CLAIM_AMOUNT"),
        PoolError::Token(e) => classify_token(e),
        PoolError::Vault(e) => classify_vault(e),
        PoolError::Oracle(e) => classify_oracle(e),
        PoolError::Access(e) => classify_access(e),
        PoolError::Math(e) => classify_math(e),
    }
}

/// The socket server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Accept connections until the task is dropped.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Stale socket from an unclean shutdown.
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!(socket = %self.socket_path.display(), "JSON-RPC server listening");

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!(error = %e, "connection error");
                        }
                    });
                }
                Err(e) => error!(error = %e, "accept error"),
            }
        }
    }
}

async fn write_line<W: AsyncWriteExt + Unpin, T: Serialize>(writer: &mut W, message: &T) -> anyhow::Result<()> {
    let mut json = serde_json::to_string(message)?;
    json.push('\n');
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

fn notification(event: &Event) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "method": "ledger_event",
        "params": event,
    })
}

enum Incoming {
    Line(Option<String>),
    Event(Result<Event, broadcast::error::RecvError>),
}

async fn handle_connection(state: Arc<DaemonState>, stream: tokio::net::UnixStream) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut subscription: Option<(broadcast::Receiver<Event>, EventFilter)> = None;

    loop {
        let incoming = match subscription.as_mut() {
            None => Incoming::Line(lines.next_line().await?),
            Some((rx, _)) => tokio::select! {
                line = lines.next_line() => Incoming::Line(line?),
                received = rx.recv() => Incoming::Event(received),
            },
        };

        let line = match incoming {
            Incoming::Line(Some(line)) => line,
            Incoming::Line(None) => break,
            Incoming::Event(Ok(event)) => {
                if subscription.as_ref().is_some_and(|(_, filter)| filter.matches(&event)) {
                    write_line(&mut writer, &notification(&event)).await?;
                }
                continue;
            }
            Incoming::Event(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                warn!(skipped, "event subscriber lagging");
                continue;
            }
            Incoming::Event(Err(broadcast::error::RecvError::Closed)) => {
                subscription = None;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) if request.jsonrpc != "2.0" => RpcResponse::error(request.id, RpcError::invalid_request()),
            Ok(request) if request.method == "subscribe_events" => {
                match serde_json::from_value::<EventFilter>(normalize(request.params)) {
                    Ok(filter) => {
                        subscription = Some((state.event_bus.subscribe(), filter));
                        RpcResponse::success(request.id, serde_json::json!({ "subscribed": true }))
                    }
                    Err(e) => RpcResponse::error(request.id, RpcError::invalid_params(&e.to_string())),
                }
            }
            Ok(request) if request.method == "unsubscribe_events" => {
                let was = subscription.take().is_some();
                RpcResponse::success(request.id, serde_json::json!({ "unsubscribed": was }))
            }
            Ok(request) => dispatch_request(&state, request).await,
            Err(_) => RpcResponse::error(Value::Null, RpcError::parse_error()),
        };
        write_line(&mut writer, &response).await?;
    }
    Ok(())
}

fn normalize(params: Value) -> Value {
    if params.is_null() {
        serde_json::json!({})
    } else {
        params
    }
}

/// Route one request to its command handler.
pub async fn dispatch_request(state: &Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();
    let params = normalize(request.params);
    debug!(method, "dispatching");

    let result = match method {
        // Pool
        "pool_submit" => commands::pool::submit(state, &params).await,
        "pool_submit_and_stake" => commands::pool::submit_and_stake(state, &params).await,
        "pool_withdraw" => commands::pool::withdraw(state, &params).await,
        "pool_redeem_and_withdraw" => commands::pool::redeem_and_withdraw(state, &params).await,
        "pool_redeem_underlying_and_withdraw" => {
            commands::pool::redeem_underlying_and_withdraw(state, &params).await
        }
        "pool_claim" => commands::pool::claim(state, &params).await,
        "pool_claim_for" => commands::pool::claim_for(state, &params).await,
        "pool_claim_queue_ids" => commands::pool::claim_queue_ids(state, &params).await,
        "pool_status" => commands::pool::status(state, &params).await,
        "pool_user_queue" => commands::pool::user_queue(state, &params).await,

        // Vault
        "vault_deposit" => commands::vault::deposit(state, &params).await,
        "vault_mint" => commands::vault::mint(state, &params).await,
        "vault_withdraw" => commands::vault::withdraw(state, &params).await,
        "vault_redeem" => commands::vault::redeem(state, &params).await,
        "vault_transfer" => commands::vault::transfer(state, &params).await,
        "vault_approve" => commands::vault::approve(state, &params).await,
        "vault_status" => commands::vault::status(state, &params).await,
        "vault_preview" => commands::vault::preview(state, &params).await,
        "vault_balance" => commands::vault::balance(state, &params).await,

        // Token
        "token_balance" => commands::token::balance(state, &params).await,
        "token_transfer" => commands::token::transfer(state, &params).await,
        "token_approve" => commands::token::approve(state, &params).await,
        "token_transfer_from" => commands::token::transfer_from(state, &params).await,
        "token_minter_mint" => commands::token::minter_mint(state, &params).await,
        "token_minter_burn" => commands::token::minter_burn(state, &params).await,
        "eth_balance" => commands::token::eth_balance(state, &params).await,

        // Oracle
        "oracle_submit_epoch_reward" => commands::oracle::submit_epoch_reward(state, &params).await,
        "oracle_status" => commands::oracle::status(state, &params).await,

        // Administration
        "admin_set_reserve_ratio" => commands::admin::set_reserve_ratio(state, &params).await,
        "admin_set_treasury_ratio" => commands::admin::set_treasury_ratio(state, &params).await,
        "admin_set_action_limit" => commands::admin::set_action_limit(state, &params).await,
        "admin_set_action_threshold" => commands::admin::set_action_threshold(state, &params).await,
        "admin_set_treasury" => commands::admin::set_treasury(state, &params).await,
        "admin_set_reward_oracle" => commands::admin::set_reward_oracle(state, &params).await,
        "admin_disable_reward_oracle" => commands::admin::disable_reward_oracle(state, &params).await,
        "admin_speed_up_reward" => commands::admin::speed_up_reward(state, &params).await,
        "admin_set_vault_duration" => commands::admin::set_vault_duration(state, &params).await,
        "admin_set_interest_rate_limit" => commands::admin::set_interest_rate_limit(state, &params).await,
        "admin_set_validator_limit" => commands::admin::set_validator_limit(state, &params).await,
        "admin_set_minter_cap" => commands::admin::set_minter_cap(state, &params).await,
        "admin_pause_pool" => commands::admin::pause_pool(state, &params).await,
        "admin_unpause_pool" => commands::admin::unpause_pool(state, &params).await,
        "admin_pause" => commands::admin::pause(state, &params).await,
        "admin_unpause" => commands::admin::unpause(state, &params).await,
        "admin_grant_role" => commands::admin::grant_role(state, &params).await,
        "admin_revoke_role" => commands::admin::revoke_role(state, &params).await,
        "admin_transfer_ownership" => commands::admin::transfer_ownership(state, &params).await,
        "admin_accept_ownership" => commands::admin::accept_ownership(state, &params).await,

        // Strategies
        "strategy_deploy" => commands::strategy::deploy(state, &params).await,
        "strategy_add" => commands::strategy::add(state, &params).await,
        "strategy_remove" => commands::strategy::remove(state, &params).await,
        "strategy_deposit" => commands::strategy::deposit(state, &params).await,
        "strategy_release_reserve" => commands::strategy::release_reserve(state, &params).await,
        "strategy_minting" => commands::strategy::minting(state, &params).await,
        "strategy_receive_earning" => commands::strategy::receive_earning(state, &params).await,

        // Journal
        "get_events" => commands::events::get_events(state, &params).await,

        // Dev-only
        "dev_fund_native" => commands::dev::fund_native(state, &params).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}
