//! Read-only status snapshots returned to clients.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use deth_types::{Address, Timestamp, Wei};

/// Pool accounting at one instant.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    pub address: Address,
    pub paused: bool,
    #[serde_as(as = "DisplayFromStr")]
    pub eth_balance: Wei,
    #[serde_as(as = "DisplayFromStr")]
    pub strategy_reserve: Wei,
    #[serde_as(as = "DisplayFromStr")]
    pub submitted: Wei,
    #[serde_as(as = "DisplayFromStr")]
    pub total_withdrawn: Wei,
    #[serde_as(as = "DisplayFromStr")]
    pub pending_claim_amount: Wei,
    #[serde_as(as = "DisplayFromStr")]
    pub total_claimed: Wei,
    #[serde_as(as = "DisplayFromStr")]
    pub claimable: Wei,
    pub last_queue_id: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub accumulated: Wei,
    #[serde_as(as = "DisplayFromStr")]
    pub reserve_ratio: Wei,
    #[serde_as(as = "DisplayFromStr")]
    pub treasury_ratio: Wei,
    #[serde_as(as = "DisplayFromStr")]
    pub deposit_strategy: Wei,
    #[serde_as(as = "DisplayFromStr")]
    pub receive_strategy: Wei,
    /// `None` when unlimited.
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub submit_remaining: Option<Wei>,
    /// `None` when unlimited.
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub withdraw_remaining: Option<Wei>,
    #[serde_as(as = "DisplayFromStr")]
    pub deth_total_supply: Wei,
    pub treasury: Address,
    pub reward_oracle: Option<Address>,
    pub strategies: Vec<Address>,
}

/// Vault accounting at one instant.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultStatus {
    pub address: Address,
    pub paused: bool,
    /// Including reward released up to `at`.
    #[serde_as(as = "DisplayFromStr")]
    pub total_assets: Wei,
    #[serde_as(as = "DisplayFromStr")]
    pub total_shares: Wei,
    #[serde_as(as = "DisplayFromStr")]
    pub underlying_balance: Wei,
    #[serde_as(as = "DisplayFromStr")]
    pub reward_rate: Wei,
    pub period_finish: Timestamp,
    pub last_update_time: Timestamp,
    pub duration: u64,
    /// Assets one whole share redeems for.
    #[serde_as(as = "DisplayFromStr")]
    pub share_price: Wei,
    pub at: Timestamp,
}

/// Oracle state at one instant.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleStatus {
    pub address: Address,
    pub paused: bool,
    pub last_epoch_id: u64,
    pub last_activated_validator_count: u64,
    pub current_epoch_id: u64,
    pub zero_epoch_timestamp: Timestamp,
    #[serde_as(as = "DisplayFromStr")]
    pub interest_rate_limit_per_epoch: Wei,
    pub validator_limit_per_epoch: u64,
    pub managers: Vec<Address>,
}
