//! `token_*` handlers for dETH, plus native ETH balances.

use std::sync::Arc;

use serde_json::{json, Value};

use super::{address, read, transact, wei, wei_json, Result};
use crate::state::DaemonState;

/// dETH balance of `account`, and its allowance to `spender` when given.
pub async fn balance(state: &Arc<DaemonState>, params: &Value) -> Result {
    let account = address(params, "account")?;
    let spender = super::opt_address(params, "spender")?;
    read(state, params, |p, _| {
        let token = p.token();
        let minter = token.minter_allowance(&account);
        Ok(json!({
            "balance": wei_json(token.balance_of(&account)),
            "total_supply": wei_json(token.total_supply()),
            "allowance": spender.map(|s| wei_json(token.allowance(&account, &s))),
            "minter_cap": wei_json(minter.cap),
            "minter_minted": wei_json(minter.minted),
        }))
    })
    .await
}

pub async fn transfer(state: &Arc<DaemonState>, params: &Value) -> Result {
    let to = address(params, "to")?;
    let amount = wei(params, "amount")?;
    transact(state, params, "token_transfer", |p, ctx| {
        Ok(p.token_transfer(ctx, &to, amount)?.map(|()| Value::Null))
    })
    .await
}

pub async fn approve(state: &Arc<DaemonState>, params: &Value) -> Result {
    let spender = address(params, "spender")?;
    let amount = wei(params, "amount")?;
    transact(state, params, "token_approve", |p, ctx| {
        Ok(p.token_approve(ctx, &spender, amount)?.map(|()| Value::Null))
    })
    .await
}

pub async fn transfer_from(state: &Arc<DaemonState>, params: &Value) -> Result {
    let from = address(params, "from")?;
    let to = address(params, "to")?;
    let amount = wei(params, "amount")?;
    transact(state, params, "token_transfer_from", |p, ctx| {
        Ok(p.token_transfer_from(ctx, &from, &to, amount)?.map(|()| Value::Null))
    })
    .await
}

/// Mint against the sender's minter cap.
pub async fn minter_mint(state: &Arc<DaemonState>, params: &Value) -> Result {
    let to = address(params, "to")?;
    let amount = wei(params, "amount")?;
    transact(state, params, "token_minter_mint", |p, ctx| {
        Ok(p.minter_mint(ctx, &to, amount)?.map(|()| Value::Null))
    })
    .await
}

pub async fn minter_burn(state: &Arc<DaemonState>, params: &Value) -> Result {
    let amount = wei(params, "amount")?;
    transact(state, params, "token_minter_burn", |p, ctx| {
        Ok(p.minter_burn(ctx, amount)?.map(|()| Value::Null))
    })
    .await
}

pub async fn eth_balance(state: &Arc<DaemonState>, params: &Value) -> Result {
    let account = address(params, "account")?;
    read(state, params, |p, _| Ok(wei_json(p.native().balance_of(&account)))).await
}
