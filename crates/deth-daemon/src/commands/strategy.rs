//! `strategy_*` handlers. The sender of `minting` and `receive_earning` is
//! the strategy itself.

use std::sync::Arc;

use serde_json::{json, Value};

use super::{address, transact, wei, Result};
use crate::state::DaemonState;

/// Deploy an adapter at `strategy` controlled by `core` (the pool by default).
pub async fn deploy(state: &Arc<DaemonState>, params: &Value) -> Result {
    let strategy = address(params, "strategy")?;
    let core = {
        let ledger = state.ledger.lock().await;
        match super::opt_address(params, "core")? {
            Some(core) => core,
            None => ledger.protocol.pool().address(),
        }
    };
    transact(state, params, "strategy_deploy", |p, ctx| {
        Ok(p.deploy_strategy(ctx, strategy, core)?
            .map(|()| json!({ "strategy": strategy, "core": core })))
    })
    .await
}

pub async fn add(state: &Arc<DaemonState>, params: &Value) -> Result {
    let strategy = address(params, "strategy")?;
    transact(state, params, "strategy_add", |p, ctx| {
        Ok(p.add_strategy(ctx, strategy)?.map(|()| Value::Null))
    })
    .await
}

pub async fn remove(state: &Arc<DaemonState>, params: &Value) -> Result {
    let strategy = address(params, "strategy")?;
    transact(state, params, "strategy_remove", |p, ctx| {
        Ok(p.remove_strategy(ctx, strategy)?.map(|()| Value::Null))
    })
    .await
}

/// Move reserved ETH from the pool into a strategy.
pub async fn deposit(state: &Arc<DaemonState>, params: &Value) -> Result {
    let strategy = address(params, "strategy")?;
    let amount = wei(params, "amount")?;
    transact(state, params, "strategy_deposit", |p, ctx| {
        Ok(p.deposit_into_strategy(ctx, strategy, amount)?.map(|()| Value::Null))
    })
    .await
}

pub async fn release_reserve(state: &Arc<DaemonState>, params: &Value) -> Result {
    let amount = wei(params, "amount")?;
    transact(state, params, "strategy_release_reserve", |p, ctx| {
        Ok(p.release_strategy_reserve(ctx, amount)?.map(|()| Value::Null))
    })
    .await
}

pub async fn minting(state: &Arc<DaemonState>, params: &Value) -> Result {
    let receiver = address(params, "receiver")?;
    let amount = wei(params, "amount")?;
    transact(state, params, "strategy_minting", |p, ctx| {
        Ok(p.strategy_minting(ctx, &receiver, amount)?.map(|()| Value::Null))
    })
    .await
}

/// Return the attached `value` to the pool as earnings.
pub async fn receive_earning(state: &Arc<DaemonState>, params: &Value) -> Result {
    transact(state, params, "strategy_receive_earning", |p, ctx| {
        Ok(p.receive_strategy_earning(ctx)?.map(|()| Value::Null))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{addr, daemon, fund, owner, params, GENESIS};
    use deth_types::ONE_ETHER;

    fn as_owner(offset: u64, extra: Value) -> Value {
        let mut params = json!({ "sender": owner().to_string(), "timestamp": GENESIS + offset });
        if let (Some(base), Value::Object(extra)) = (params.as_object_mut(), extra) {
            base.extend(extra);
        }
        params
    }

    #[tokio::test]
    async fn test_deploy_add_and_earn() {
        let state = daemon();
        let deployed = deploy(&state, &as_owner(1, json!({ "strategy": addr("lido") }))).await.expect("deploy");
        assert_eq!(deployed["result"]["strategy"], json!(addr("lido")));

        let err = deploy(&state, &as_owner(2, json!({ "strategy": addr("lido") }))).await.expect_err("twice");
        assert_eq!(err.code, -32022);

        add(&state, &as_owner(3, json!({ "strategy": addr("lido") }))).await.expect("add");

        fund(&state, "lido", ONE_ETHER).await;
        let earned = receive_earning(&state, &params("lido", 4, json!({ "value": ONE_ETHER.to_string() })))
            .await
            .expect("earning");
        assert_eq!(earned["events"][0]["type"], json!("strategy_earning_received"));

        let status = crate::commands::pool::status(&state, &params("lido", 5, json!({}))).await.expect("status");
        assert_eq!(status["receive_strategy"], json!(ONE_ETHER.to_string()));
        assert_eq!(status["eth_balance"], json!(ONE_ETHER.to_string()));
    }

    #[tokio::test]
    async fn test_unlisted_strategy_cannot_mint() {
        let state = daemon();
        let err = minting(&state, &params("rogue", 1, json!({ "receiver": addr("rogue"), "amount": "1" })))
            .await
            .expect_err("not listed");
        assert_eq!(err.code, -32021);
    }
}
