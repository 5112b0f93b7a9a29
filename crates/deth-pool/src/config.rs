//! Genesis parameters.
//!
//! Read from the `[protocol]` table of the daemon configuration. Wei amounts
//! are decimal strings since TOML integers stop at `i64`.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use deth_types::{Address, Timestamp, Wei, SECONDS_PER_DAY};

/// Parameters a fresh ledger is created with.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Owner of every component.
    #[serde(default = "default_owner")]
    pub owner: Address,
    /// Recipient of the treasury share of rewards.
    #[serde(default = "default_treasury")]
    pub treasury: Address,
    /// Share of each submit reserved for strategies, 1e18-scaled.
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default)]
    pub reserve_ratio: Wei,
    /// Share of each reward minted to the treasury, 1e18-scaled.
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_treasury_ratio")]
    pub treasury_ratio: Wei,
    /// Daily submit limit; 0 = unlimited.
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default)]
    pub submit_limit: Wei,
    /// Daily withdraw limit; 0 = unlimited.
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default)]
    pub withdraw_limit: Wei,
    /// Minimum submit; 0 = none.
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default)]
    pub submit_threshold: Wei,
    /// Minimum withdrawal; 0 = none.
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default)]
    pub withdraw_threshold: Wei,
    /// Reward period of the vault in seconds.
    #[serde(default = "default_vault_duration")]
    pub vault_duration: u64,
    /// Oracle interest ceiling per epoch, 1e18-scaled.
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_interest_rate_limit")]
    pub interest_rate_limit_per_epoch: Wei,
    /// Oracle validator activations per epoch.
    #[serde(default = "default_validator_limit")]
    pub validator_limit_per_epoch: u64,
    /// Start of epoch 0.
    #[serde(default = "default_zero_epoch_timestamp")]
    pub zero_epoch_timestamp: Timestamp,
    /// Accounts allowed to report epoch rewards.
    #[serde(default)]
    pub oracle_managers: Vec<Address>,
    /// Accounts allowed to pause every component.
    #[serde(default)]
    pub pause_guardians: Vec<Address>,
}

/// Well-known addresses of the protocol components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolAddresses {
    /// dETH.
    pub token: Address,
    /// sdETH.
    pub vault: Address,
    /// The core pool.
    pub pool: Address,
    /// The reward oracle.
    pub oracle: Address,
}

impl ProtocolAddresses {
    /// Addresses derived from fixed labels.
    pub fn derived() -> Self {
        Self {
            token: Address::derive("deth.token"),
            vault: Address::derive("deth.vault"),
            pool: Address::derive("deth.pool"),
            oracle: Address::derive("deth.oracle"),
        }
    }
}

fn default_owner() -> Address {
    Address::derive("deth.owner")
}

fn default_treasury() -> Address {
    Address::derive("deth.treasury")
}

fn default_treasury_ratio() -> Wei {
    // 10%
    100_000_000_000_000_000
}

fn default_vault_duration() -> u64 {
    7 * SECONDS_PER_DAY
}

fn default_interest_rate_limit() -> Wei {
    // 0.001% per epoch
    10_000_000_000_000
}

fn default_validator_limit() -> u64 {
    16
}

fn default_zero_epoch_timestamp() -> Timestamp {
    // Beacon chain mainnet genesis.
    1_606_824_023
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            treasury: default_treasury(),
            reserve_ratio: 0,
            treasury_ratio: default_treasury_ratio(),
            submit_limit: 0,
            withdraw_limit: 0,
            submit_threshold: 0,
            withdraw_threshold: 0,
            vault_duration: default_vault_duration(),
            interest_rate_limit_per_epoch: default_interest_rate_limit(),
            validator_limit_per_epoch: default_validator_limit(),
            zero_epoch_timestamp: default_zero_epoch_timestamp(),
            oracle_managers: Vec::new(),
            pause_guardians: Vec::new(),
        }
    }
}
