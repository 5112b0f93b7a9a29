//! Ledger events.
//!
//! Every committed transaction appends one or more events. The daemon
//! journals them to the database and relays them to subscribers; rolled-back
//! transactions emit nothing.
//!
//! Amounts serialize as decimal strings so that clients without 128-bit
//! integers read them losslessly.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::{Address, Role, Wei};

/// The component an administrative event refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// The receipt token (dETH).
    Token,
    /// The reward-streaming vault (sdETH).
    Vault,
    /// The core pool.
    Pool,
    /// The reward oracle.
    Oracle,
}

/// An event emitted by a committed transaction.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// ETH submitted and dETH minted.
    Submitted {
        sender: Address,
        receiver: Address,
        #[serde_as(as = "DisplayFromStr")]
        amount: Wei,
        #[serde_as(as = "DisplayFromStr")]
        reserve_added: Wei,
    },
    /// dETH burned and ETH paid out immediately.
    Withdrawn {
        sender: Address,
        receiver: Address,
        #[serde_as(as = "DisplayFromStr")]
        amount: Wei,
    },
    /// dETH burned and the ETH payout deferred to the claim queue.
    WithdrawQueued {
        sender: Address,
        receiver: Address,
        queue_id: u64,
        #[serde_as(as = "DisplayFromStr")]
        amount: Wei,
        #[serde_as(as = "DisplayFromStr")]
        accumulated: Wei,
    },
    /// Queued withdrawals paid out.
    Claimed {
        receiver: Address,
        queue_ids: Vec<u64>,
        #[serde_as(as = "DisplayFromStr")]
        amount: Wei,
    },
    /// dETH deposited into the vault.
    VaultDeposited {
        caller: Address,
        receiver: Address,
        #[serde_as(as = "DisplayFromStr")]
        assets: Wei,
        #[serde_as(as = "DisplayFromStr")]
        shares: Wei,
    },
    /// Vault shares burned for dETH.
    VaultWithdrawn {
        caller: Address,
        receiver: Address,
        owner: Address,
        #[serde_as(as = "DisplayFromStr")]
        assets: Wei,
        #[serde_as(as = "DisplayFromStr")]
        shares: Wei,
    },
    /// The vault started a new distribution period.
    RewardRateUpdated {
        #[serde_as(as = "DisplayFromStr")]
        reward_rate: Wei,
        period_finish: u64,
        duration: u64,
    },
    /// Oracle reward minted to treasury and vault.
    RewardSupplied {
        #[serde_as(as = "DisplayFromStr")]
        amount: Wei,
        #[serde_as(as = "DisplayFromStr")]
        treasury_amount: Wei,
        #[serde_as(as = "DisplayFromStr")]
        vault_amount: Wei,
    },
    /// The oracle accepted an epoch report.
    EpochRewardSubmitted {
        submitter: Address,
        epoch_id: u64,
        activated_validator_count: u64,
        #[serde_as(as = "DisplayFromStr")]
        reward_increment: Wei,
    },
    /// ETH sent from the strategy reserve to a strategy.
    StrategyDeposited {
        strategy: Address,
        #[serde_as(as = "DisplayFromStr")]
        amount: Wei,
    },
    /// A strategy returned ETH earnings to the pool.
    StrategyEarningReceived {
        strategy: Address,
        #[serde_as(as = "DisplayFromStr")]
        amount: Wei,
    },
    /// A strategy minted dETH.
    StrategyMinted {
        strategy: Address,
        receiver: Address,
        #[serde_as(as = "DisplayFromStr")]
        amount: Wei,
    },
    /// Strategy added to or removed from the allow-list.
    StrategyChanged { strategy: Address, added: bool },
    /// Reserved ETH released back to the free balance.
    StrategyReserveReleased {
        #[serde_as(as = "DisplayFromStr")]
        amount: Wei,
    },
    /// An owner setter changed a parameter.
    ConfigChanged {
        component: Component,
        key: String,
        value: String,
    },
    /// A role was granted or revoked.
    RoleChanged {
        component: Component,
        role: Role,
        account: Address,
        granted: bool,
    },
    /// A component was paused or unpaused.
    PauseChanged { component: Component, paused: bool },
    /// Ownership was nominated or accepted.
    OwnershipChanged {
        component: Component,
        owner: Address,
        accepted: bool,
    },
}

impl LedgerEvent {
    /// Stable event name used for journaling and subscription filters.
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::Submitted { .. } => "Submitted",
            LedgerEvent::Withdrawn { .. } => "Withdrawn",
            LedgerEvent::WithdrawQueued { .. } => "WithdrawQueued",
            LedgerEvent::Claimed { .. } => "Claimed",
            LedgerEvent::VaultDeposited { .. } => "VaultDeposited",
            LedgerEvent::VaultWithdrawn { .. } => "VaultWithdrawn",
            LedgerEvent::RewardRateUpdated { .. } => "RewardRateUpdated",
            LedgerEvent::RewardSupplied { .. } => "RewardSupplied",
            LedgerEvent::EpochRewardSubmitted { .. } => "EpochRewardSubmitted",
            LedgerEvent::StrategyDeposited { .. } => "StrategyDeposited",
            LedgerEvent::StrategyEarningReceived { .. } => "StrategyEarningReceived",
            LedgerEvent::StrategyMinted { .. } => "StrategyMinted",
            LedgerEvent::StrategyChanged { .. } => "StrategyChanged",
            LedgerEvent::StrategyReserveReleased { .. } => "StrategyReserveReleased",
            LedgerEvent::ConfigChanged { .. } => "ConfigChanged",
            LedgerEvent::RoleChanged { .. } => "RoleChanged",
            LedgerEvent::PauseChanged { .. } => "PauseChanged",
            LedgerEvent::OwnershipChanged { .. } => "OwnershipChanged",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ONE_ETHER;

    #[test]
    fn test_amounts_serialize_as_strings() {
        let event = LedgerEvent::Withdrawn {
            sender: Address::derive("alice"),
            receiver: Address::derive("alice"),
            amount: 3 * ONE_ETHER,
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "withdrawn");
        assert_eq!(json["amount"], "3000000000000000000");

        let back: LedgerEvent = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, event);
        assert_eq!(back.name(), "Withdrawn");
    }

    #[test]
    fn test_role_change_round_trip() {
        let event = LedgerEvent::RoleChanged {
            component: Component::Oracle,
            role: Role::Manager,
            account: Address::derive("reporter"),
            granted: true,
        };
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"component\":\"oracle\""));
        assert!(json.contains("\"role\":\"manager\""));
    }
}
