//! `admin_*` handlers: ratios, limits, oracle and vault parameters, roles,
//! pausing and ownership. Authorization is enforced by the ledger.

use std::sync::Arc;

use serde_json::Value;

use deth_pool::Action;
use deth_types::{Component, Role};

use super::{address, transact, typed, u64_param, wei, Result};
use crate::state::DaemonState;

fn done(receipt: deth_pool::Receipt<()>) -> deth_pool::Receipt<Value> {
    receipt.map(|()| Value::Null)
}

pub async fn set_reserve_ratio(state: &Arc<DaemonState>, params: &Value) -> Result {
    let ratio = wei(params, "ratio")?;
    transact(state, params, "admin_set_reserve_ratio", |p, ctx| {
        Ok(done(p.set_reserve_ratio(ctx, ratio)?))
    })
    .await
}

pub async fn set_treasury_ratio(state: &Arc<DaemonState>, params: &Value) -> Result {
    let ratio = wei(params, "ratio")?;
    transact(state, params, "admin_set_treasury_ratio", |p, ctx| {
        Ok(done(p.set_treasury_ratio(ctx, ratio)?))
    })
    .await
}

/// Daily limit of `action`; `"0"` removes it.
pub async fn set_action_limit(state: &Arc<DaemonState>, params: &Value) -> Result {
    let action: Action = typed(params, "action")?;
    let limit = wei(params, "limit")?;
    transact(state, params, "admin_set_action_limit", |p, ctx| {
        Ok(done(p.set_action_limit(ctx, action, limit)?))
    })
    .await
}

pub async fn set_action_threshold(state: &Arc<DaemonState>, params: &Value) -> Result {
    let action: Action = typed(params, "action")?;
    let threshold = wei(params, "threshold")?;
    transact(state, params, "admin_set_action_threshold", |p, ctx| {
        Ok(done(p.set_action_threshold(ctx, action, threshold)?))
    })
    .await
}

pub async fn set_treasury(state: &Arc<DaemonState>, params: &Value) -> Result {
    let treasury = address(params, "treasury")?;
    transact(state, params, "admin_set_treasury", |p, ctx| {
        Ok(done(p.set_treasury(ctx, treasury)?))
    })
    .await
}

pub async fn set_reward_oracle(state: &Arc<DaemonState>, params: &Value) -> Result {
    let oracle = address(params, "oracle")?;
    transact(state, params, "admin_set_reward_oracle", |p, ctx| {
        Ok(done(p.set_reward_oracle(ctx, oracle)?))
    })
    .await
}

pub async fn disable_reward_oracle(state: &Arc<DaemonState>, params: &Value) -> Result {
    transact(state, params, "admin_disable_reward_oracle", |p, ctx| {
        Ok(done(p.disable_reward_oracle(ctx)?))
    })
    .await
}

/// Restart the vault's reward stream over `duration` seconds.
pub async fn speed_up_reward(state: &Arc<DaemonState>, params: &Value) -> Result {
    let reward = wei(params, "reward")?;
    let duration = u64_param(params, "duration")?;
    transact(state, params, "admin_speed_up_reward", |p, ctx| {
        Ok(done(p.speed_up_reward(ctx, reward, duration)?))
    })
    .await
}

pub async fn set_vault_duration(state: &Arc<DaemonState>, params: &Value) -> Result {
    let duration = u64_param(params, "duration")?;
    transact(state, params, "admin_set_vault_duration", |p, ctx| {
        Ok(done(p.set_vault_duration(ctx, duration)?))
    })
    .await
}

pub async fn set_interest_rate_limit(state: &Arc<DaemonState>, params: &Value) -> Result {
    let limit = wei(params, "limit")?;
    transact(state, params, "admin_set_interest_rate_limit", |p, ctx| {
        Ok(done(p.set_interest_rate_limit_per_epoch(ctx, limit)?))
    })
    .await
}

pub async fn set_validator_limit(state: &Arc<DaemonState>, params: &Value) -> Result {
    let limit = u64_param(params, "limit")?;
    transact(state, params, "admin_set_validator_limit", |p, ctx| {
        Ok(done(p.set_validator_limit_per_epoch(ctx, limit)?))
    })
    .await
}

pub async fn set_minter_cap(state: &Arc<DaemonState>, params: &Value) -> Result {
    let minter = address(params, "minter")?;
    let cap = wei(params, "cap")?;
    transact(state, params, "admin_set_minter_cap", |p, ctx| {
        Ok(done(p.set_minter_cap(ctx, minter, cap)?))
    })
    .await
}

pub async fn pause_pool(state: &Arc<DaemonState>, params: &Value) -> Result {
    transact(state, params, "admin_pause_pool", |p, ctx| Ok(done(p.pause(ctx, Component::Pool)?))).await
}

pub async fn unpause_pool(state: &Arc<DaemonState>, params: &Value) -> Result {
    transact(state, params, "admin_unpause_pool", |p, ctx| Ok(done(p.unpause(ctx, Component::Pool)?))).await
}

pub async fn pause(state: &Arc<DaemonState>, params: &Value) -> Result {
    let component: Component = typed(params, "component")?;
    transact(state, params, "admin_pause", |p, ctx| Ok(done(p.pause(ctx, component)?))).await
}

pub async fn unpause(state: &Arc<DaemonState>, params: &Value) -> Result {
    let component: Component = typed(params, "component")?;
    transact(state, params, "admin_unpause", |p, ctx| Ok(done(p.unpause(ctx, component)?))).await
}

pub async fn grant_role(state: &Arc<DaemonState>, params: &Value) -> Result {
    let component: Component = typed(params, "component")?;
    let role: Role = typed(params, "role")?;
    let account = address(params, "account")?;
    transact(state, params, "admin_grant_role", |p, ctx| {
        Ok(done(p.grant_role(ctx, component, role, account)?))
    })
    .await
}

pub async fn revoke_role(state: &Arc<DaemonState>, params: &Value) -> Result {
    let component: Component = typed(params, "component")?;
    let role: Role = typed(params, "role")?;
    let account = address(params, "account")?;
    transact(state, params, "admin_revoke_role", |p, ctx| {
        Ok(done(p.revoke_role(ctx, component, role, account)?))
    })
    .await
}

/// First step of the two-step ownership handover.
pub async fn transfer_ownership(state: &Arc<DaemonState>, params: &Value) -> Result {
    let component: Component = typed(params, "component")?;
    let new_owner = address(params, "new_owner")?;
    transact(state, params, "admin_transfer_ownership", |p, ctx| {
        Ok(done(p.transfer_ownership(ctx, component, new_owner)?))
    })
    .await
}

pub async fn accept_ownership(state: &Arc<DaemonState>, params: &Value) -> Result {
    let component: Component = typed(params, "component")?;
    transact(state, params, "admin_accept_ownership", |p, ctx| {
        Ok(done(p.accept_ownership(ctx, component)?))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{addr, daemon, fund, owner, params, GENESIS};
    use deth_types::ONE_ETHER;
    use serde_json::json;

    fn as_owner(offset: u64, extra: Value) -> Value {
        let mut params = json!({ "sender": owner().to_string(), "timestamp": GENESIS + offset });
        if let (Some(base), Value::Object(extra)) = (params.as_object_mut(), extra) {
            base.extend(extra);
        }
        params
    }

    #[tokio::test]
    async fn test_guardian_pauses_pool() {
        let state = daemon();
        fund(&state, "alice", ONE_ETHER).await;

        grant_role(
            &state,
            &as_owner(1, json!({ "component": "pool", "role": "pause_guardian", "account": addr("guard") })),
        )
        .await
        .expect("grant");
        pause_pool(&state, &params("guard", 2, json!({}))).await.expect("pause");

        let err = crate::commands::pool::submit(&state, &params("alice", 3, json!({ "value": "1000" })))
            .await
            .expect_err("paused");
        assert_eq!(err.code, -32025);
        let err = set_reserve_ratio(&state, &as_owner(3, json!({ "ratio": "1000" })))
            .await
            .expect_err("setter paused");
        assert_eq!(err.code, -32025);

        let err = unpause_pool(&state, &params("guard", 4, json!({}))).await.expect_err("owner only");
        assert_eq!(err.code, -32021);
        unpause_pool(&state, &as_owner(5, json!({}))).await.expect("unpause");
    }

    #[tokio::test]
    async fn test_limit_change_emits_config_event() {
        let state = daemon();
        let out = set_action_limit(&state, &as_owner(1, json!({ "action": "submit", "limit": "500" })))
            .await
            .expect("limit");
        assert_eq!(out["events"][0]["type"], json!("config_changed"));

        let err = set_action_limit(&state, &as_owner(2, json!({ "action": "stake", "limit": "5" })))
            .await
            .expect_err("unknown action");
        assert_eq!(err.code, -32602);
    }

    #[tokio::test]
    async fn test_unknown_component_rejected() {
        let state = daemon();
        let err = pause(&state, &as_owner(1, json!({ "component": "bridge" }))).await.expect_err("component");
        assert_eq!(err.code, -32602);
    }
}
