//! `pool_*` handlers: submit, withdraw and claim.

use std::sync::Arc;

use serde_json::{json, Value};

use deth_pool::Action;

use super::{address, opt_address, read, to_json, transact, wei, wei_json, Result};
use crate::rpc::RpcError;
use crate::state::DaemonState;

/// `receiver` when given, else the sender.
fn receiver(params: &Value) -> std::result::Result<deth_types::Address, RpcError> {
    match opt_address(params, "receiver")? {
        Some(receiver) => Ok(receiver),
        None => address(params, "sender"),
    }
}

/// Deposit the attached `value` of ETH for dETH.
pub async fn submit(state: &Arc<DaemonState>, params: &Value) -> Result {
    let receiver = receiver(params)?;
    transact(state, params, "pool_submit", |p, ctx| {
        Ok(p.submit(ctx, &receiver)?.map(wei_json))
    })
    .await
}

/// Deposit ETH and stake the minted dETH in the vault.
pub async fn submit_and_stake(state: &Arc<DaemonState>, params: &Value) -> Result {
    let receiver = receiver(params)?;
    transact(state, params, "pool_submit_and_stake", |p, ctx| {
        Ok(p.submit_and_stake(ctx, &receiver)?
            .map(|shares| json!({ "shares": wei_json(shares) })))
    })
    .await
}

/// Burn dETH for ETH, paid now or queued.
pub async fn withdraw(state: &Arc<DaemonState>, params: &Value) -> Result {
    let amount = wei(params, "amount")?;
    let receiver = receiver(params)?;
    transact(state, params, "pool_withdraw", |p, ctx| {
        Ok(p.withdraw(ctx, amount, &receiver)?
            .map(|outcome| json!(outcome)))
    })
    .await
}

/// Redeem sdETH shares and withdraw the dETH.
pub async fn redeem_and_withdraw(state: &Arc<DaemonState>, params: &Value) -> Result {
    let shares = wei(params, "shares")?;
    let receiver = receiver(params)?;
    transact(state, params, "pool_redeem_and_withdraw", |p, ctx| {
        Ok(p.redeem_and_withdraw(ctx, shares, &receiver)?.map(|(assets, outcome)| {
            json!({ "assets": wei_json(assets), "withdrawal": outcome })
        }))
    })
    .await
}

/// Withdraw exactly `assets` dETH out of an sdETH position.
pub async fn redeem_underlying_and_withdraw(state: &Arc<DaemonState>, params: &Value) -> Result {
    let assets = wei(params, "assets")?;
    let receiver = receiver(params)?;
    transact(state, params, "pool_redeem_underlying_and_withdraw", |p, ctx| {
        Ok(p.redeem_underlying_and_withdraw(ctx, assets, &receiver)?
            .map(|(shares, outcome)| json!({ "shares": wei_json(shares), "withdrawal": outcome })))
    })
    .await
}

pub async fn claim(state: &Arc<DaemonState>, params: &Value) -> Result {
    transact(state, params, "pool_claim", |p, ctx| Ok(p.claim(ctx)?.map(wei_json))).await
}

pub async fn claim_for(state: &Arc<DaemonState>, params: &Value) -> Result {
    let receiver = address(params, "receiver")?;
    transact(state, params, "pool_claim_for", |p, ctx| {
        Ok(p.claim_for(ctx, &receiver)?.map(wei_json))
    })
    .await
}

/// Claim the listed entries of the sender; others are skipped.
pub async fn claim_queue_ids(state: &Arc<DaemonState>, params: &Value) -> Result {
    let queue_ids: Vec<u64> = super::typed(params, "queue_ids")?;
    transact(state, params, "pool_claim_queue_ids", |p, ctx| {
        Ok(p.claim_by_queue_ids(ctx, &queue_ids)?.map(wei_json))
    })
    .await
}

pub async fn status(state: &Arc<DaemonState>, params: &Value) -> Result {
    read(state, params, |p, now| to_json(&p.pool_status(now))).await
}

/// Queue entries of `account` with the amount claimable right now.
pub async fn user_queue(state: &Arc<DaemonState>, params: &Value) -> Result {
    let account = address(params, "account")?;
    read(state, params, |p, now| {
        Ok(json!({
            "entries": p.user_queue(&account),
            "claimable": wei_json(p.claimable_amount(&account)),
            "withdraw_remaining": p.daily_remaining(Action::Withdraw, now).map(wei_json),
        }))
    })
    .await
}
