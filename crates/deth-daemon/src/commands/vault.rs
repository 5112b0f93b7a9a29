//! `vault_*` handlers for sdETH.

use std::sync::Arc;

use serde_json::{json, Value};

use super::{address, ledger_err, opt_address, read, to_json, transact, wei, wei_json, Result};
use crate::state::DaemonState;

fn owner_or_sender(params: &Value, key: &str) -> std::result::Result<deth_types::Address, crate::rpc::RpcError> {
    match opt_address(params, key)? {
        Some(account) => Ok(account),
        None => address(params, "sender"),
    }
}

pub async fn deposit(state: &Arc<DaemonState>, params: &Value) -> Result {
    let assets = wei(params, "assets")?;
    let receiver = owner_or_sender(params, "receiver")?;
    transact(state, params, "vault_deposit", |p, ctx| {
        Ok(p.vault_deposit(ctx, assets, &receiver)?.map(wei_json))
    })
    .await
}

pub async fn mint(state: &Arc<DaemonState>, params: &Value) -> Result {
    let shares = wei(params, "shares")?;
    let receiver = owner_or_sender(params, "receiver")?;
    transact(state, params, "vault_mint", |p, ctx| {
        Ok(p.vault_mint(ctx, shares, &receiver)?.map(wei_json))
    })
    .await
}

pub async fn withdraw(state: &Arc<DaemonState>, params: &Value) -> Result {
    let assets = wei(params, "assets")?;
    let receiver = owner_or_sender(params, "receiver")?;
    let owner = owner_or_sender(params, "owner")?;
    transact(state, params, "vault_withdraw", |p, ctx| {
        Ok(p.vault_withdraw(ctx, assets, &receiver, &owner)?.map(wei_json))
    })
    .await
}

pub async fn redeem(state: &Arc<DaemonState>, params: &Value) -> Result {
    let shares = wei(params, "shares")?;
    let receiver = owner_or_sender(params, "receiver")?;
    let owner = owner_or_sender(params, "owner")?;
    transact(state, params, "vault_redeem", |p, ctx| {
        Ok(p.vault_redeem(ctx, shares, &receiver, &owner)?.map(wei_json))
    })
    .await
}

/// Share transfer; with `from` set it spends the sender's allowance.
pub async fn transfer(state: &Arc<DaemonState>, params: &Value) -> Result {
    let to = address(params, "to")?;
    let shares = wei(params, "shares")?;
    let from = opt_address(params, "from")?;
    transact(state, params, "vault_transfer", |p, ctx| {
        let receipt = match from {
            Some(owner) => p.vault_transfer_from(ctx, &owner, &to, shares)?,
            None => p.vault_transfer(ctx, &to, shares)?,
        };
        Ok(receipt.map(|()| Value::Null))
    })
    .await
}

pub async fn approve(state: &Arc<DaemonState>, params: &Value) -> Result {
    let spender = address(params, "spender")?;
    let shares = wei(params, "shares")?;
    transact(state, params, "vault_approve", |p, ctx| {
        Ok(p.vault_approve(ctx, &spender, shares)?.map(|()| Value::Null))
    })
    .await
}

pub async fn status(state: &Arc<DaemonState>, params: &Value) -> Result {
    read(state, params, |p, now| to_json(&p.vault_status(now).map_err(ledger_err)?)).await
}

/// ERC-4626 previews for whichever of `assets`/`shares` is given.
pub async fn preview(state: &Arc<DaemonState>, params: &Value) -> Result {
    let assets = super::opt_wei(params, "assets")?;
    let shares = super::opt_wei(params, "shares")?;
    read(state, params, |p, now| {
        let vault = p.vault();
        let mut out = serde_json::Map::new();
        if let Some(assets) = assets {
            out.insert("deposit".into(), wei_json(vault.preview_deposit(assets, now).map_err(ledger_err)?));
            out.insert("withdraw".into(), wei_json(vault.preview_withdraw(assets, now).map_err(ledger_err)?));
        }
        if let Some(shares) = shares {
            out.insert("mint".into(), wei_json(vault.preview_mint(shares, now).map_err(ledger_err)?));
            out.insert("redeem".into(), wei_json(vault.preview_redeem(shares, now).map_err(ledger_err)?));
        }
        Ok(Value::Object(out))
    })
    .await
}

/// Shares of `account` and what they redeem for now.
pub async fn balance(state: &Arc<DaemonState>, params: &Value) -> Result {
    let account = address(params, "account")?;
    read(state, params, |p, now| {
        let vault = p.vault();
        Ok(json!({
            "shares": wei_json(vault.shares_of(&account)),
            "assets": wei_json(vault.convert_to_assets(vault.shares_of(&account), now).map_err(ledger_err)?),
            "max_withdraw": wei_json(vault.max_withdraw(&account, now).map_err(ledger_err)?),
        }))
    })
    .await
}
