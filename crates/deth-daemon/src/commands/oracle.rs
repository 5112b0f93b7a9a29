//! `oracle_*` handlers.

use std::sync::Arc;

use serde_json::{json, Value};

use deth_oracle::EpochReport;

use super::{read, to_json, transact, u64_param, wei, Result};
use crate::state::DaemonState;

/// Report the reward accrued between two epochs and supply it to the pool.
pub async fn submit_epoch_reward(state: &Arc<DaemonState>, params: &Value) -> Result {
    let report = EpochReport {
        start_epoch_id: u64_param(params, "start_epoch_id")?,
        epoch_id: u64_param(params, "epoch_id")?,
        activated_validator_count: u64_param(params, "activated_validator_count")?,
        reward_increment: wei(params, "reward_increment")?,
    };
    transact(state, params, "oracle_submit_epoch_reward", |p, ctx| {
        Ok(p.submit_epoch_reward(ctx, report)?.map(|split| json!(split)))
    })
    .await
}

pub async fn status(state: &Arc<DaemonState>, params: &Value) -> Result {
    read(state, params, |p, now| to_json(&p.oracle_status(now))).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{daemon, params};

    #[tokio::test]
    async fn test_only_managers_report() {
        let state = daemon();
        let status = status(&state, &params("anyone", 0, json!({}))).await.expect("status");
        let last = status["last_epoch_id"].as_u64().expect("epoch");

        let err = submit_epoch_reward(
            &state,
            &params(
                "mallory",
                0,
                json!({
                    "start_epoch_id": last,
                    "epoch_id": last + 10,
                    "activated_validator_count": 1,
                    "reward_increment": "1",
                }),
            ),
        )
        .await
        .expect_err("not a manager");
        assert_eq!(err.code, -32021);
    }
}
