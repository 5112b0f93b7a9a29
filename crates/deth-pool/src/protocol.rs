//! The protocol aggregate.
//!
//! [`Protocol`] owns every ledger (dETH, sdETH, pool, oracle, native ETH and
//! the deployed strategy adapters) and exposes one method per entry point.
//! Each entry point runs as a transaction:
//!
//! 1. snapshot the whole state,
//! 2. move attached native value to the pool (payable calls only),
//! 3. run the operation, collecting [`LedgerEvent`]s,
//! 4. on error restore the snapshot and emit nothing.
//!
//! The serialized form carries [`STATE_VERSION`]; persistence refuses
//! snapshots from a newer build.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use deth_oracle::{EpochReport, OracleLimits, RewardOracle, RewardSink};
use deth_token::RebasingToken;
use deth_types::{
    AccessControl, Address, Component, LedgerEvent, Role, Timestamp, TxContext, Wei, ONE_ETHER,
};
use deth_vault::RewardVault;

use crate::config::{ProtocolAddresses, ProtocolConfig};
use crate::limits::Action;
use crate::native::NativeLedger;
use crate::pool::{CorePool, PoolEnv, RewardSplit, WithdrawOutcome};
use crate::queue::QueueEntry;
use crate::strategy::StrategyAdapter;
use crate::views::{OracleStatus, PoolStatus, VaultStatus};
use crate::{PoolError, Result};

/// Version of the serialized protocol layout.
pub const STATE_VERSION: u32 = 1;

/// Result of a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt<T> {
    /// Operation result.
    pub value: T,
    /// Events in emission order.
    pub events: Vec<LedgerEvent>,
}

impl<T> Receipt<T> {
    /// Transform the result, keeping the events.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Receipt<U> {
        Receipt {
            value: f(self.value),
            events: self.events,
        }
    }
}

/// The complete ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    version: u32,
    token: RebasingToken,
    vault: RewardVault,
    pool: CorePool,
    oracle: RewardOracle,
    native: NativeLedger,
    #[serde(default)]
    strategies: BTreeMap<Address, StrategyAdapter>,
}

/// Routes accepted oracle rewards into the pool.
struct RewardMinter<'a> {
    pool: &'a mut CorePool,
    token: &'a mut RebasingToken,
    split: Option<RewardSplit>,
}

impl RewardSink for RewardMinter<'_> {
    type Error = PoolError;

    fn supply_reward(&mut self, oracle: &Address, amount: Wei, _now: Timestamp) -> Result<()> {
        self.split = Some(self.pool.supply_reward(oracle, amount, self.token)?);
        Ok(())
    }
}

fn config_changed(component: Component, key: &str, value: impl ToString) -> LedgerEvent {
    LedgerEvent::ConfigChanged {
        component,
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn withdraw_event(sender: &Address, receiver: &Address, amount: Wei, outcome: &WithdrawOutcome) -> LedgerEvent {
    match outcome {
        WithdrawOutcome::Paid => LedgerEvent::Withdrawn {
            sender: *sender,
            receiver: *receiver,
            amount,
        },
        WithdrawOutcome::Queued(entry) => LedgerEvent::WithdrawQueued {
            sender: *sender,
            receiver: *receiver,
            queue_id: entry.queue_id,
            amount,
            accumulated: entry.accumulated_threshold,
        },
    }
}

fn action_key(action: Action, suffix: &str) -> String {
    format!("{action}_{suffix}")
}

impl Protocol {
    /// Create and wire a fresh ledger.
    ///
    /// The pool becomes a dETH manager and the oracle the pool's reward
    /// oracle. Configured pause guardians are granted on every component.
    pub fn genesis(config: &ProtocolConfig, now: Timestamp) -> Result<Self> {
        let addrs = ProtocolAddresses::derived();
        let owner = config.owner;
        if owner.is_zero() || config.treasury.is_zero() {
            return Err(PoolError::ZeroAddress);
        }

        let mut token = RebasingToken::new("deth ETH", "dETH", addrs.token, owner);
        token.access_mut().grant(&owner, Role::Manager, addrs.pool)?;

        let mut vault = RewardVault::new(
            "staked deth ETH",
            "sdETH",
            addrs.vault,
            addrs.token,
            owner,
            config.vault_duration,
            now,
        );

        let mut pool = CorePool::new(addrs.pool, owner, addrs.token, addrs.vault, config.treasury);
        pool.set_reward_oracle(&owner, addrs.oracle)?;
        if config.reserve_ratio != pool.reserve_ratio() {
            pool.set_reserve_ratio(&owner, config.reserve_ratio)?;
        }
        if config.treasury_ratio != pool.treasury_ratio() {
            pool.set_treasury_ratio(&owner, config.treasury_ratio)?;
        }
        for (action, limit, threshold) in [
            (Action::Submit, config.submit_limit, config.submit_threshold),
            (Action::Withdraw, config.withdraw_limit, config.withdraw_threshold),
        ] {
            if limit != 0 {
                pool.set_action_limit(&owner, action, limit, now)?;
            }
            if threshold != 0 {
                pool.set_action_threshold(&owner, action, threshold)?;
            }
        }

        let mut oracle = RewardOracle::new(
            addrs.oracle,
            owner,
            config.zero_epoch_timestamp,
            OracleLimits {
                interest_rate_limit_per_epoch: config.interest_rate_limit_per_epoch,
                validator_limit_per_epoch: config.validator_limit_per_epoch,
            },
        );
        for manager in &config.oracle_managers {
            oracle.access_mut().grant(&owner, Role::Manager, *manager)?;
        }
        for guardian in &config.pause_guardians {
            token.access_mut().grant(&owner, Role::PauseGuardian, *guardian)?;
            vault.access_mut().grant(&owner, Role::PauseGuardian, *guardian)?;
            pool.access_mut().grant(&owner, Role::PauseGuardian, *guardian)?;
            oracle.access_mut().grant(&owner, Role::PauseGuardian, *guardian)?;
        }

        info!(
            %owner,
            token = %addrs.token,
            vault = %addrs.vault,
            pool = %addrs.pool,
            oracle = %addrs.oracle,
            "protocol genesis"
        );
        Ok(Self {
            version: STATE_VERSION,
            token,
            vault,
            pool,
            oracle,
            native: NativeLedger::new(),
            strategies: BTreeMap::new(),
        })
    }

    /// Reject state written by a newer layout.
    pub fn check_version(&self) -> Result<()> {
        if self.version > STATE_VERSION {
            return Err(PoolError::UnsupportedStateVersion {
                found: self.version,
                supported: STATE_VERSION,
            });
        }
        Ok(())
    }

    /// Layout version of this state.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// dETH.
    pub fn token(&self) -> &RebasingToken {
        &self.token
    }

    /// sdETH.
    pub fn vault(&self) -> &RewardVault {
        &self.vault
    }

    /// The core pool.
    pub fn pool(&self) -> &CorePool {
        &self.pool
    }

    /// The reward oracle.
    pub fn oracle(&self) -> &RewardOracle {
        &self.oracle
    }

    /// Native ETH balances.
    pub fn native(&self) -> &NativeLedger {
        &self.native
    }

    /// Adapter deployed at `address`.
    pub fn strategy(&self, address: &Address) -> Option<&StrategyAdapter> {
        self.strategies.get(address)
    }

    /// Credit ETH from outside the ledger. Development faucet.
    pub fn fund_native(&mut self, account: &Address, amount: Wei) -> Result<()> {
        self.native.fund(account, amount)?;
        debug!(%account, amount, "native funded");
        Ok(())
    }

    fn transact<T, F>(&mut self, ctx: &TxContext, payable: bool, op: F) -> Result<Receipt<T>>
    where
        F: FnOnce(&mut Self, &mut Vec<LedgerEvent>) -> Result<T>,
    {
        let snapshot = self.clone();
        let stream = *self.vault.stream();
        let mut events = Vec::new();
        match self.execute(ctx, payable, op, &mut events) {
            Ok(value) => {
                let after = *self.vault.stream();
                if after.period_finish != stream.period_finish || after.reward_rate != stream.reward_rate {
                    events.push(LedgerEvent::RewardRateUpdated {
                        reward_rate: after.reward_rate,
                        period_finish: after.period_finish,
                        duration: after.duration,
                    });
                }
                Ok(Receipt { value, events })
            }
            Err(err) => {
                *self = snapshot;
                debug!(sender = %ctx.sender, error = %err, "transaction reverted");
                Err(err)
            }
        }
    }

    fn execute<T, F>(&mut self, ctx: &TxContext, payable: bool, op: F, events: &mut Vec<LedgerEvent>) -> Result<T>
    where
        F: FnOnce(&mut Self, &mut Vec<LedgerEvent>) -> Result<T>,
    {
        if ctx.value > 0 {
            if !payable {
                return Err(PoolError::NotPayable);
            }
            let pool = self.pool.address();
            self.native.transfer(&ctx.sender, &pool, ctx.value)?;
        }
        op(self, events)
    }

    fn split(&mut self) -> (&mut CorePool, PoolEnv<'_>) {
        (
            &mut self.pool,
            PoolEnv {
                token: &mut self.token,
                vault: &mut self.vault,
                native: &mut self.native,
            },
        )
    }

    fn access_mut(&mut self, component: Component) -> &mut AccessControl {
        match component {
            Component::Token => self.token.access_mut(),
            Component::Vault => self.vault.access_mut(),
            Component::Pool => self.pool.access_mut(),
            Component::Oracle => self.oracle.access_mut(),
        }
    }

    // ----- pool: user entry points -----

    /// Deposit the attached ETH and mint dETH to `receiver`.
    pub fn submit(&mut self, ctx: &TxContext, receiver: &Address) -> Result<Receipt<Wei>> {
        self.transact(ctx, true, |p, events| {
            let reserve_added = p
                .pool
                .submit(&ctx.sender, ctx.value, receiver, ctx.timestamp, &mut p.token)?;
            events.push(LedgerEvent::Submitted {
                sender: ctx.sender,
                receiver: *receiver,
                amount: ctx.value,
                reserve_added,
            });
            Ok(ctx.value)
        })
    }

    /// Deposit the attached ETH and stake the minted dETH for `receiver`.
    /// Returns the sdETH shares minted.
    pub fn submit_and_stake(&mut self, ctx: &TxContext, receiver: &Address) -> Result<Receipt<Wei>> {
        self.transact(ctx, true, |p, events| {
            let (pool, mut env) = p.split();
            let (reserve_added, shares) =
                pool.submit_and_stake(&ctx.sender, ctx.value, receiver, ctx.timestamp, &mut env)?;
            events.push(LedgerEvent::Submitted {
                sender: ctx.sender,
                receiver: *receiver,
                amount: ctx.value,
                reserve_added,
            });
            events.push(LedgerEvent::VaultDeposited {
                caller: pool.address(),
                receiver: *receiver,
                assets: ctx.value,
                shares,
            });
            Ok(shares)
        })
    }

    /// Burn `amount` dETH and pay or queue the ETH to `receiver`.
    pub fn withdraw(&mut self, ctx: &TxContext, amount: Wei, receiver: &Address) -> Result<Receipt<WithdrawOutcome>> {
        self.transact(ctx, false, |p, events| {
            let (pool, mut env) = p.split();
            let outcome = pool.withdraw(&ctx.sender, amount, receiver, ctx.timestamp, &mut env)?;
            events.push(withdraw_event(&ctx.sender, receiver, amount, &outcome));
            Ok(outcome)
        })
    }

    /// Redeem `shares` sdETH and withdraw the resulting dETH.
    pub fn redeem_and_withdraw(
        &mut self,
        ctx: &TxContext,
        shares: Wei,
        receiver: &Address,
    ) -> Result<Receipt<(Wei, WithdrawOutcome)>> {
        self.transact(ctx, false, |p, events| {
            let (pool, mut env) = p.split();
            let (assets, outcome) =
                pool.redeem_and_withdraw(&ctx.sender, shares, receiver, ctx.timestamp, &mut env)?;
            events.push(LedgerEvent::VaultWithdrawn {
                caller: ctx.sender,
                receiver: pool.address(),
                owner: ctx.sender,
                assets,
                shares,
            });
            events.push(withdraw_event(&ctx.sender, receiver, assets, &outcome));
            Ok((assets, outcome))
        })
    }

    /// Take exactly `assets` dETH out of the sender's sdETH position and
    /// withdraw them. Returns the shares burned.
    pub fn redeem_underlying_and_withdraw(
        &mut self,
        ctx: &TxContext,
        assets: Wei,
        receiver: &Address,
    ) -> Result<Receipt<(Wei, WithdrawOutcome)>> {
        self.transact(ctx, false, |p, events| {
            let (pool, mut env) = p.split();
            let (shares, outcome) =
                pool.redeem_underlying_and_withdraw(&ctx.sender, assets, receiver, ctx.timestamp, &mut env)?;
            events.push(LedgerEvent::VaultWithdrawn {
                caller: ctx.sender,
                receiver: pool.address(),
                owner: ctx.sender,
                assets,
                shares,
            });
            events.push(withdraw_event(&ctx.sender, receiver, assets, &outcome));
            Ok((shares, outcome))
        })
    }

    /// Claim every eligible entry of the sender.
    pub fn claim(&mut self, ctx: &TxContext) -> Result<Receipt<Wei>> {
        let receiver = ctx.sender;
        self.claim_for(ctx, &receiver)
    }

    /// Claim every eligible entry of `receiver`, paying `receiver`.
    pub fn claim_for(&mut self, ctx: &TxContext, receiver: &Address) -> Result<Receipt<Wei>> {
        self.transact(ctx, false, |p, events| {
            let (queue_ids, amount) = p.pool.claim_for(receiver, &mut p.native)?;
            events.push(LedgerEvent::Claimed {
                receiver: *receiver,
                queue_ids,
                amount,
            });
            Ok(amount)
        })
    }

    /// Claim the listed entries of the sender that are eligible.
    pub fn claim_by_queue_ids(&mut self, ctx: &TxContext, queue_ids: &[u64]) -> Result<Receipt<Wei>> {
        self.transact(ctx, false, |p, events| {
            let (queue_ids, amount) = p.pool.claim_by_queue_ids(&ctx.sender, queue_ids, &mut p.native)?;
            events.push(LedgerEvent::Claimed {
                receiver: ctx.sender,
                queue_ids,
                amount,
            });
            Ok(amount)
        })
    }

    // ----- vault -----

    /// Deposit dETH into the vault. Returns shares minted.
    pub fn vault_deposit(&mut self, ctx: &TxContext, assets: Wei, receiver: &Address) -> Result<Receipt<Wei>> {
        self.transact(ctx, false, |p, events| {
            let shares = p
                .vault
                .deposit(&ctx.sender, assets, receiver, ctx.timestamp, &mut p.token)?;
            events.push(LedgerEvent::VaultDeposited {
                caller: ctx.sender,
                receiver: *receiver,
                assets,
                shares,
            });
            Ok(shares)
        })
    }

    /// Mint exactly `shares` sdETH. Returns assets pulled.
    pub fn vault_mint(&mut self, ctx: &TxContext, shares: Wei, receiver: &Address) -> Result<Receipt<Wei>> {
        self.transact(ctx, false, |p, events| {
            let assets = p
                .vault
                .mint(&ctx.sender, shares, receiver, ctx.timestamp, &mut p.token)?;
            events.push(LedgerEvent::VaultDeposited {
                caller: ctx.sender,
                receiver: *receiver,
                assets,
                shares,
            });
            Ok(assets)
        })
    }

    /// Withdraw exactly `assets` dETH from `owner`'s position. Returns
    /// shares burned.
    pub fn vault_withdraw(
        &mut self,
        ctx: &TxContext,
        assets: Wei,
        receiver: &Address,
        owner: &Address,
    ) -> Result<Receipt<Wei>> {
        self.transact(ctx, false, |p, events| {
            let shares = p
                .vault
                .withdraw(&ctx.sender, assets, receiver, owner, ctx.timestamp, &mut p.token)?;
            events.push(LedgerEvent::VaultWithdrawn {
                caller: ctx.sender,
                receiver: *receiver,
                owner: *owner,
                assets,
                shares,
            });
            Ok(shares)
        })
    }

    /// Redeem `shares` of `owner`. Returns assets paid.
    pub fn vault_redeem(
        &mut self,
        ctx: &TxContext,
        shares: Wei,
        receiver: &Address,
        owner: &Address,
    ) -> Result<Receipt<Wei>> {
        self.transact(ctx, false, |p, events| {
            let assets = p
                .vault
                .redeem(&ctx.sender, shares, receiver, owner, ctx.timestamp, &mut p.token)?;
            events.push(LedgerEvent::VaultWithdrawn {
                caller: ctx.sender,
                receiver: *receiver,
                owner: *owner,
                assets,
                shares,
            });
            Ok(assets)
        })
    }

    /// Transfer sdETH shares.
    pub fn vault_transfer(&mut self, ctx: &TxContext, to: &Address, shares: Wei) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, _| Ok(p.vault.transfer_shares(&ctx.sender, to, shares)?))
    }

    /// Approve an sdETH spender.
    pub fn vault_approve(&mut self, ctx: &TxContext, spender: &Address, shares: Wei) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, _| Ok(p.vault.approve_shares(&ctx.sender, spender, shares)?))
    }

    /// Transfer sdETH shares on behalf of `owner`.
    pub fn vault_transfer_from(
        &mut self,
        ctx: &TxContext,
        owner: &Address,
        to: &Address,
        shares: Wei,
    ) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, _| {
            Ok(p.vault.transfer_shares_from(&ctx.sender, owner, to, shares)?)
        })
    }

    /// Replace the vault's reward distribution. Vault owner only.
    pub fn speed_up_reward(&mut self, ctx: &TxContext, reward: Wei, duration: u64) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, _| {
            Ok(p
                .vault
                .speed_up_reward(&ctx.sender, reward, duration, ctx.timestamp, &p.token)?)
        })
    }

    /// Set the vault's automatic period length. Vault owner only.
    pub fn set_vault_duration(&mut self, ctx: &TxContext, duration: u64) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            p.vault.set_duration(&ctx.sender, duration)?;
            events.push(config_changed(Component::Vault, "duration", duration));
            Ok(())
        })
    }

    // ----- token -----

    /// Transfer dETH.
    pub fn token_transfer(&mut self, ctx: &TxContext, to: &Address, amount: Wei) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, _| Ok(p.token.transfer(&ctx.sender, to, amount)?))
    }

    /// Approve a dETH spender.
    pub fn token_approve(&mut self, ctx: &TxContext, spender: &Address, amount: Wei) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, _| Ok(p.token.approve(&ctx.sender, spender, amount)?))
    }

    /// Transfer dETH on behalf of `from`.
    pub fn token_transfer_from(
        &mut self,
        ctx: &TxContext,
        from: &Address,
        to: &Address,
        amount: Wei,
    ) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, _| {
            Ok(p.token.transfer_from(&ctx.sender, from, to, amount)?)
        })
    }

    /// Set an external minter's cap. Token owner only.
    pub fn set_minter_cap(&mut self, ctx: &TxContext, minter: Address, cap: Wei) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            p.token.set_minter_cap(&ctx.sender, minter, cap)?;
            events.push(config_changed(Component::Token, &format!("minter_cap.{minter}"), cap));
            Ok(())
        })
    }

    /// Mint dETH against the sender's minter cap.
    pub fn minter_mint(&mut self, ctx: &TxContext, to: &Address, amount: Wei) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, _| Ok(p.token.minter_mint(&ctx.sender, to, amount)?))
    }

    /// Burn the sender's dETH, releasing minter cap.
    pub fn minter_burn(&mut self, ctx: &TxContext, amount: Wei) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, _| Ok(p.token.minter_burn(&ctx.sender, amount)?))
    }

    // ----- oracle -----

    /// Submit an epoch reward report. Oracle managers only.
    pub fn submit_epoch_reward(&mut self, ctx: &TxContext, report: EpochReport) -> Result<Receipt<RewardSplit>> {
        self.transact(ctx, false, |p, events| {
            let mut sink = RewardMinter {
                pool: &mut p.pool,
                token: &mut p.token,
                split: None,
            };
            p.oracle
                .submit_epoch_reward(&ctx.sender, report, ctx.timestamp, &mut sink)?;
            let split = sink.split.unwrap_or_default();
            events.push(LedgerEvent::EpochRewardSubmitted {
                submitter: ctx.sender,
                epoch_id: report.epoch_id,
                activated_validator_count: report.activated_validator_count,
                reward_increment: report.reward_increment,
            });
            events.push(LedgerEvent::RewardSupplied {
                amount: report.reward_increment,
                treasury_amount: split.treasury_amount,
                vault_amount: split.vault_amount,
            });
            Ok(split)
        })
    }

    /// Set the oracle's interest ceiling. Oracle owner only.
    pub fn set_interest_rate_limit_per_epoch(&mut self, ctx: &TxContext, limit: Wei) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            p.oracle.set_interest_rate_limit_per_epoch(&ctx.sender, limit)?;
            events.push(config_changed(Component::Oracle, "interest_rate_limit_per_epoch", limit));
            Ok(())
        })
    }

    /// Set the oracle's validator activation limit. Oracle owner only.
    pub fn set_validator_limit_per_epoch(&mut self, ctx: &TxContext, limit: u64) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            p.oracle.set_validator_limit_per_epoch(&ctx.sender, limit)?;
            events.push(config_changed(Component::Oracle, "validator_limit_per_epoch", limit));
            Ok(())
        })
    }

    // ----- pool administration -----

    /// Set the reserve ratio. Pool owner only.
    pub fn set_reserve_ratio(&mut self, ctx: &TxContext, ratio: Wei) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            p.pool.set_reserve_ratio(&ctx.sender, ratio)?;
            events.push(config_changed(Component::Pool, "reserve_ratio", ratio));
            Ok(())
        })
    }

    /// Set the treasury ratio. Pool owner only.
    pub fn set_treasury_ratio(&mut self, ctx: &TxContext, ratio: Wei) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            p.pool.set_treasury_ratio(&ctx.sender, ratio)?;
            events.push(config_changed(Component::Pool, "treasury_ratio", ratio));
            Ok(())
        })
    }

    /// Set a daily action limit. Pool owner only.
    pub fn set_action_limit(&mut self, ctx: &TxContext, action: Action, limit: Wei) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            p.pool
                .set_action_limit(&ctx.sender, action, limit, ctx.timestamp)?;
            events.push(config_changed(Component::Pool, &action_key(action, "limit"), limit));
            Ok(())
        })
    }

    /// Set an action's minimum amount. Pool owner only.
    pub fn set_action_threshold(&mut self, ctx: &TxContext, action: Action, threshold: Wei) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            p.pool.set_action_threshold(&ctx.sender, action, threshold)?;
            events.push(config_changed(Component::Pool, &action_key(action, "threshold"), threshold));
            Ok(())
        })
    }

    /// Set the treasury. Pool owner only.
    pub fn set_treasury(&mut self, ctx: &TxContext, treasury: Address) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            p.pool.set_treasury(&ctx.sender, treasury)?;
            events.push(config_changed(Component::Pool, "treasury", treasury));
            Ok(())
        })
    }

    /// Point the pool at a reward oracle. Pool owner only.
    pub fn set_reward_oracle(&mut self, ctx: &TxContext, oracle: Address) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            p.pool.set_reward_oracle(&ctx.sender, oracle)?;
            events.push(config_changed(Component::Pool, "reward_oracle", oracle));
            Ok(())
        })
    }

    /// Stop accepting oracle rewards. Pool owner only.
    pub fn disable_reward_oracle(&mut self, ctx: &TxContext) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            p.pool.disable_reward_oracle(&ctx.sender)?;
            events.push(config_changed(Component::Pool, "reward_oracle", "none"));
            Ok(())
        })
    }

    // ----- strategies -----

    /// Deploy a strategy adapter at `address` controlled by `core`.
    pub fn deploy_strategy(&mut self, ctx: &TxContext, address: Address, core: Address) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, _| {
            if address.is_zero() || core.is_zero() {
                return Err(PoolError::ZeroAddress);
            }
            if p.strategies.contains_key(&address) {
                return Err(PoolError::AdapterExists(address));
            }
            p.strategies.insert(address, StrategyAdapter::new(address, core));
            debug!(strategy = %address, %core, deployer = %ctx.sender, "strategy adapter deployed");
            Ok(())
        })
    }

    /// Allow-list a deployed strategy. Pool owner only.
    pub fn add_strategy(&mut self, ctx: &TxContext, strategy: Address) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            let adapter = p
                .strategies
                .get(&strategy)
                .ok_or(PoolError::UnknownStrategy(strategy))?;
            p.pool.add_strategy(&ctx.sender, adapter)?;
            events.push(LedgerEvent::StrategyChanged { strategy, added: true });
            Ok(())
        })
    }

    /// Remove a strategy from the allow-list. Pool owner only.
    pub fn remove_strategy(&mut self, ctx: &TxContext, strategy: Address) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            p.pool.remove_strategy(&ctx.sender, strategy)?;
            events.push(LedgerEvent::StrategyChanged {
                strategy,
                added: false,
            });
            Ok(())
        })
    }

    /// Release part of the strategy reserve. Pool owner only.
    pub fn release_strategy_reserve(&mut self, ctx: &TxContext, amount: Wei) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            p.pool.release_strategy_reserve(&ctx.sender, amount)?;
            events.push(LedgerEvent::StrategyReserveReleased { amount });
            Ok(())
        })
    }

    /// Send reserved ETH to a strategy. Pool owner only.
    pub fn deposit_into_strategy(&mut self, ctx: &TxContext, strategy: Address, amount: Wei) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            let adapter = p
                .strategies
                .get_mut(&strategy)
                .ok_or(PoolError::UnknownStrategy(strategy))?;
            p.pool
                .deposit_into_strategy(&ctx.sender, adapter, amount, &mut p.native)?;
            events.push(LedgerEvent::StrategyDeposited { strategy, amount });
            Ok(())
        })
    }

    /// Mint dETH from an allow-listed strategy.
    pub fn strategy_minting(&mut self, ctx: &TxContext, receiver: &Address, amount: Wei) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            p.pool
                .strategy_minting(&ctx.sender, receiver, amount, &mut p.token)?;
            events.push(LedgerEvent::StrategyMinted {
                strategy: ctx.sender,
                receiver: *receiver,
                amount,
            });
            Ok(())
        })
    }

    /// Return the attached ETH to the pool as strategy earnings.
    pub fn receive_strategy_earning(&mut self, ctx: &TxContext) -> Result<Receipt<()>> {
        self.transact(ctx, true, |p, events| {
            p.pool.receive_strategy_earning(&ctx.sender, ctx.value)?;
            events.push(LedgerEvent::StrategyEarningReceived {
                strategy: ctx.sender,
                amount: ctx.value,
            });
            Ok(())
        })
    }

    // ----- roles, pause, ownership -----

    /// Grant `role` on `component`. Component owner only.
    pub fn grant_role(&mut self, ctx: &TxContext, component: Component, role: Role, account: Address) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            p.access_mut(component).grant(&ctx.sender, role, account)?;
            info!(?component, %role, %account, "role granted");
            events.push(LedgerEvent::RoleChanged {
                component,
                role,
                account,
                granted: true,
            });
            Ok(())
        })
    }

    /// Revoke `role` on `component`. Component owner only.
    pub fn revoke_role(&mut self, ctx: &TxContext, component: Component, role: Role, account: Address) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            p.access_mut(component).revoke(&ctx.sender, role, account)?;
            info!(?component, %role, %account, "role revoked");
            events.push(LedgerEvent::RoleChanged {
                component,
                role,
                account,
                granted: false,
            });
            Ok(())
        })
    }

    /// Grant the manager role on `component`.
    pub fn add_manager(&mut self, ctx: &TxContext, component: Component, account: Address) -> Result<Receipt<()>> {
        self.grant_role(ctx, component, Role::Manager, account)
    }

    /// Revoke the manager role on `component`.
    pub fn remove_manager(&mut self, ctx: &TxContext, component: Component, account: Address) -> Result<Receipt<()>> {
        self.revoke_role(ctx, component, Role::Manager, account)
    }

    /// Grant the pause-guardian role on `component`.
    pub fn add_pause_guardian(&mut self, ctx: &TxContext, component: Component, account: Address) -> Result<Receipt<()>> {
        self.grant_role(ctx, component, Role::PauseGuardian, account)
    }

    /// Revoke the pause-guardian role on `component`.
    pub fn remove_pause_guardian(&mut self, ctx: &TxContext, component: Component, account: Address) -> Result<Receipt<()>> {
        self.revoke_role(ctx, component, Role::PauseGuardian, account)
    }

    /// Pause `component`. Pause guardians only.
    pub fn pause(&mut self, ctx: &TxContext, component: Component) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            p.access_mut(component).pause(&ctx.sender)?;
            warn!(?component, guardian = %ctx.sender, "component paused");
            events.push(LedgerEvent::PauseChanged {
                component,
                paused: true,
            });
            Ok(())
        })
    }

    /// Unpause `component`. Component owner only.
    pub fn unpause(&mut self, ctx: &TxContext, component: Component) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            p.access_mut(component).unpause(&ctx.sender)?;
            info!(?component, "component unpaused");
            events.push(LedgerEvent::PauseChanged {
                component,
                paused: false,
            });
            Ok(())
        })
    }

    /// Nominate a new owner of `component`.
    pub fn transfer_ownership(&mut self, ctx: &TxContext, component: Component, new_owner: Address) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            p.access_mut(component)
                .transfer_ownership(&ctx.sender, new_owner)?;
            events.push(LedgerEvent::OwnershipChanged {
                component,
                owner: new_owner,
                accepted: false,
            });
            Ok(())
        })
    }

    /// Accept a pending ownership of `component`.
    pub fn accept_ownership(&mut self, ctx: &TxContext, component: Component) -> Result<Receipt<()>> {
        self.transact(ctx, false, |p, events| {
            let previous = p.access_mut(component).accept_ownership(&ctx.sender)?;
            info!(?component, %previous, owner = %ctx.sender, "ownership accepted");
            events.push(LedgerEvent::OwnershipChanged {
                component,
                owner: ctx.sender,
                accepted: true,
            });
            Ok(())
        })
    }

    // ----- views -----

    /// Pool accounting at `now`.
    pub fn pool_status(&self, now: Timestamp) -> PoolStatus {
        let pool = &self.pool;
        PoolStatus {
            address: pool.address(),
            paused: pool.access().is_paused(),
            eth_balance: self.native.balance_of(&pool.address()),
            strategy_reserve: pool.strategy_reserve(),
            submitted: pool.submitted(),
            total_withdrawn: pool.total_withdrawn(),
            pending_claim_amount: pool.queue().pending(),
            total_claimed: pool.total_claimed(),
            claimable: pool.claimable(&self.native),
            last_queue_id: pool.queue().last_queue_id(),
            accumulated: pool.queue().accumulated(),
            reserve_ratio: pool.reserve_ratio(),
            treasury_ratio: pool.treasury_ratio(),
            deposit_strategy: pool.deposit_strategy(),
            receive_strategy: pool.receive_strategy(),
            submit_remaining: pool.daily_remaining(Action::Submit, now),
            withdraw_remaining: pool.daily_remaining(Action::Withdraw, now),
            deth_total_supply: self.token.total_supply(),
            treasury: pool.treasury(),
            reward_oracle: pool.reward_oracle(),
            strategies: pool.strategists().iter().copied().collect(),
        }
    }

    /// Vault accounting at `now`.
    pub fn vault_status(&self, now: Timestamp) -> Result<VaultStatus> {
        let vault = &self.vault;
        let stream = vault.stream();
        Ok(VaultStatus {
            address: vault.address(),
            paused: vault.access().is_paused(),
            total_assets: vault.total_assets_at(now)?,
            total_shares: vault.total_shares(),
            underlying_balance: self.token.balance_of(&vault.address()),
            reward_rate: stream.reward_rate,
            period_finish: stream.period_finish,
            last_update_time: stream.last_update_time,
            duration: stream.duration,
            share_price: vault.convert_to_assets(ONE_ETHER, now)?,
            at: now,
        })
    }

    /// Oracle state at `now`.
    pub fn oracle_status(&self, now: Timestamp) -> OracleStatus {
        let oracle = &self.oracle;
        let limits = oracle.limits();
        OracleStatus {
            address: oracle.address(),
            paused: oracle.access().is_paused(),
            last_epoch_id: oracle.last_epoch_id(),
            last_activated_validator_count: oracle.last_activated_validator_count(),
            current_epoch_id: oracle.current_epoch_id(now),
            zero_epoch_timestamp: oracle.zero_epoch_timestamp(),
            interest_rate_limit_per_epoch: limits.interest_rate_limit_per_epoch,
            validator_limit_per_epoch: limits.validator_limit_per_epoch,
            managers: oracle.access().members(Role::Manager),
        }
    }

    /// Live queue entries of `account`, oldest first.
    pub fn user_queue(&self, account: &Address) -> Vec<QueueEntry> {
        self.pool.queue().user_entries(account)
    }

    /// Sum of `account`'s entries claimable now.
    pub fn claimable_amount(&self, account: &Address) -> Wei {
        self.pool.claimable_amount(account, &self.native)
    }

    /// Allowance left today for `action`, `None` when unlimited.
    pub fn daily_remaining(&self, action: Action, now: Timestamp) -> Option<Wei> {
        self.pool.daily_remaining(action, now)
    }
}
