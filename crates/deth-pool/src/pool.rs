//! The core pool.
//!
//! ETH accounting of the pool against its native balance:
//!
//! ```text
//! withdrawable(amount) = eth_balance >= pending_claim_amount + strategy_reserve + amount
//! claimable            = eth_balance + total_claimed - strategy_reserve
//! ```
//!
//! A withdrawal that is not immediately payable is queued. Queued entries
//! become claimable in order as ETH arrives. Every operation finishes its
//! bookkeeping before any ETH leaves the pool.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use tracing::{debug, info};

use deth_token::RebasingToken;
use deth_types::{wad_mul, AccessControl, Address, MathError, Timestamp, Wei, WAD};
use deth_vault::RewardVault;

use crate::limits::{Action, ActionLimits};
use crate::native::NativeLedger;
use crate::queue::{ClaimQueue, QueueEntry};
use crate::strategy::Strategy;
use crate::{PoolError, Result};

/// The ledgers a pool operation touches besides the pool itself.
pub struct PoolEnv<'a> {
    /// dETH.
    pub token: &'a mut RebasingToken,
    /// sdETH.
    pub vault: &'a mut RewardVault,
    /// Native ETH.
    pub native: &'a mut NativeLedger,
}

/// How a withdrawal was settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WithdrawOutcome {
    /// ETH was sent to the receiver.
    Paid,
    /// The payout was queued.
    Queued(QueueEntry),
}

/// Split of one oracle reward.
#[serde_as]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RewardSplit {
    /// dETH minted to the treasury.
    #[serde_as(as = "DisplayFromStr")]
    pub treasury_amount: Wei,
    /// dETH minted to the vault.
    #[serde_as(as = "DisplayFromStr")]
    pub vault_amount: Wei,
}

/// Deposit, withdrawal-queue and strategy accounting.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorePool {
    address: Address,
    token: Address,
    vault: Address,
    access: AccessControl,
    treasury: Address,
    reward_oracle: Option<Address>,
    #[serde_as(as = "DisplayFromStr")]
    reserve_ratio: Wei,
    #[serde_as(as = "DisplayFromStr")]
    treasury_ratio: Wei,
    #[serde_as(as = "DisplayFromStr")]
    strategy_reserve: Wei,
    #[serde_as(as = "DisplayFromStr")]
    submitted: Wei,
    #[serde_as(as = "DisplayFromStr")]
    total_withdrawn: Wei,
    #[serde_as(as = "DisplayFromStr")]
    total_claimed: Wei,
    #[serde_as(as = "DisplayFromStr")]
    deposit_strategy: Wei,
    #[serde_as(as = "DisplayFromStr")]
    receive_strategy: Wei,
    limits: ActionLimits,
    queue: ClaimQueue,
    #[serde(default)]
    strategists: BTreeSet<Address>,
}

impl CorePool {
    /// A pool over `token` and `vault` with zero ratios and no limits.
    pub fn new(address: Address, owner: Address, token: Address, vault: Address, treasury: Address) -> Self {
        Self {
            address,
            token,
            vault,
            access: AccessControl::new(owner),
            treasury,
            reward_oracle: None,
            reserve_ratio: 0,
            treasury_ratio: 0,
            strategy_reserve: 0,
            submitted: 0,
            total_withdrawn: 0,
            total_claimed: 0,
            deposit_strategy: 0,
            receive_strategy: 0,
            limits: ActionLimits::default(),
            queue: ClaimQueue::new(),
            strategists: BTreeSet::new(),
        }
    }

    /// The pool's address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Address of dETH.
    pub fn token(&self) -> Address {
        self.token
    }

    /// Address of the vault.
    pub fn vault(&self) -> Address {
        self.vault
    }

    /// Access table.
    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    /// Mutable access table.
    pub fn access_mut(&mut self) -> &mut AccessControl {
        &mut self.access
    }

    /// Treasury receiving its share of rewards.
    pub fn treasury(&self) -> Address {
        self.treasury
    }

    /// The only caller allowed to supply rewards.
    pub fn reward_oracle(&self) -> Option<Address> {
        self.reward_oracle
    }

    /// Share of each submit set aside for strategies, 1e18-scaled.
    pub fn reserve_ratio(&self) -> Wei {
        self.reserve_ratio
    }

    /// Share of each reward minted to the treasury, 1e18-scaled.
    pub fn treasury_ratio(&self) -> Wei {
        self.treasury_ratio
    }

    /// ETH held back for strategy deployment.
    pub fn strategy_reserve(&self) -> Wei {
        self.strategy_reserve
    }

    /// Lifetime ETH submitted.
    pub fn submitted(&self) -> Wei {
        self.submitted
    }

    /// Lifetime ETH paid out immediately.
    pub fn total_withdrawn(&self) -> Wei {
        self.total_withdrawn
    }

    /// Lifetime ETH paid out through claims.
    pub fn total_claimed(&self) -> Wei {
        self.total_claimed
    }

    /// Lifetime ETH sent to strategies.
    pub fn deposit_strategy(&self) -> Wei {
        self.deposit_strategy
    }

    /// Lifetime ETH earnings received from strategies.
    pub fn receive_strategy(&self) -> Wei {
        self.receive_strategy
    }

    /// The action limits.
    pub fn limits(&self) -> &ActionLimits {
        &self.limits
    }

    /// The claim queue.
    pub fn queue(&self) -> &ClaimQueue {
        &self.queue
    }

    /// Allow-listed strategies.
    pub fn strategists(&self) -> &BTreeSet<Address> {
        &self.strategists
    }

    /// Whether `account` is an allow-listed strategy.
    pub fn is_strategist(&self, account: &Address) -> bool {
        self.strategists.contains(account)
    }

    /// ETH the queue may draw on.
    pub fn claimable(&self, native: &NativeLedger) -> Wei {
        native
            .balance_of(&self.address)
            .saturating_add(self.total_claimed)
            .saturating_sub(self.strategy_reserve)
    }

    /// Sum of `receiver`'s entries claimable now.
    pub fn claimable_amount(&self, receiver: &Address, native: &NativeLedger) -> Wei {
        self.queue.eligible_amount(receiver, self.claimable(native))
    }

    /// Allowance left today for `action`, `None` when unlimited.
    pub fn daily_remaining(&self, action: Action, now: Timestamp) -> Option<Wei> {
        self.limits.daily_remaining(action, now)
    }

    fn lifetime(&self, action: Action) -> Wei {
        match action {
            Action::Submit => self.submitted,
            Action::Withdraw => self.total_withdrawn.saturating_add(self.queue.accumulated()),
        }
    }

    /// Mint `value` dETH to `receiver` for ETH already received.
    ///
    /// Returns the amount added to the strategy reserve.
    pub fn submit(
        &mut self,
        sender: &Address,
        value: Wei,
        receiver: &Address,
        now: Timestamp,
        token: &mut RebasingToken,
    ) -> Result<Wei> {
        self.access.ensure_not_paused()?;
        if value == 0 {
            return Err(PoolError::ZeroAmount);
        }
        if receiver.is_zero() {
            return Err(PoolError::ZeroAddress);
        }
        self.limits.check_threshold(Action::Submit, value)?;
        self.limits
            .consume(Action::Submit, value, now, self.submitted)?;

        let reserve_added = wad_mul(value, self.reserve_ratio)?;
        let strategy_reserve = self
            .strategy_reserve
            .checked_add(reserve_added)
            .ok_or(MathError::Overflow)?;
        let submitted = self.submitted.checked_add(value).ok_or(MathError::Overflow)?;
        token.mint(&self.address, receiver, value)?;
        self.strategy_reserve = strategy_reserve;
        self.submitted = submitted;

        info!(%sender, %receiver, value, reserve_added, "submitted");
        Ok(reserve_added)
    }

    /// Submit and deposit the minted dETH into the vault for `receiver`.
    ///
    /// Returns the reserve added and the vault shares minted.
    pub fn submit_and_stake(
        &mut self,
        sender: &Address,
        value: Wei,
        receiver: &Address,
        now: Timestamp,
        env: &mut PoolEnv<'_>,
    ) -> Result<(Wei, Wei)> {
        if receiver.is_zero() {
            return Err(PoolError::ZeroAddress);
        }
        let pool = self.address;
        let reserve_added = self.submit(sender, value, &pool, now, env.token)?;
        env.token.approve(&pool, &env.vault.address(), value)?;
        let shares = env.vault.deposit(&pool, value, receiver, now, env.token)?;
        Ok((reserve_added, shares))
    }

    /// Burn `amount` of the sender's dETH and pay or queue the ETH.
    pub fn withdraw(
        &mut self,
        sender: &Address,
        amount: Wei,
        receiver: &Address,
        now: Timestamp,
        env: &mut PoolEnv<'_>,
    ) -> Result<WithdrawOutcome> {
        self.settle_withdraw(sender, amount, receiver, sender, now, env)
    }

    /// Redeem `shares` of the sender's sdETH and withdraw the dETH paid out.
    pub fn redeem_and_withdraw(
        &mut self,
        sender: &Address,
        shares: Wei,
        receiver: &Address,
        now: Timestamp,
        env: &mut PoolEnv<'_>,
    ) -> Result<(Wei, WithdrawOutcome)> {
        self.access.ensure_not_paused()?;
        let pool = self.address;
        let assets = env.vault.redeem(sender, shares, &pool, sender, now, env.token)?;
        let outcome = self.settle_withdraw(sender, assets, receiver, &pool, now, env)?;
        Ok((assets, outcome))
    }

    /// Withdraw exactly `assets` dETH from the sender's sdETH position and
    /// withdraw them.
    ///
    /// Returns the shares burned.
    pub fn redeem_underlying_and_withdraw(
        &mut self,
        sender: &Address,
        assets: Wei,
        receiver: &Address,
        now: Timestamp,
        env: &mut PoolEnv<'_>,
    ) -> Result<(Wei, WithdrawOutcome)> {
        self.access.ensure_not_paused()?;
        let pool = self.address;
        let shares = env.vault.withdraw(sender, assets, &pool, sender, now, env.token)?;
        let outcome = self.settle_withdraw(sender, assets, receiver, &pool, now, env)?;
        Ok((shares, outcome))
    }

    fn settle_withdraw(
        &mut self,
        sender: &Address,
        amount: Wei,
        receiver: &Address,
        burn_from: &Address,
        now: Timestamp,
        env: &mut PoolEnv<'_>,
    ) -> Result<WithdrawOutcome> {
        self.access.ensure_not_paused()?;
        if amount == 0 {
            return Err(PoolError::ZeroAmount);
        }
        if receiver.is_zero() {
            return Err(PoolError::ZeroAddress);
        }
        self.limits.check_threshold(Action::Withdraw, amount)?;
        let lifetime = self.lifetime(Action::Withdraw);
        self.limits.consume(Action::Withdraw, amount, now, lifetime)?;
        env.token.burn_from(&self.address, burn_from, amount)?;

        let balance = env.native.balance_of(&self.address);
        let required = self
            .queue
            .pending()
            .checked_add(self.strategy_reserve)
            .and_then(|r| r.checked_add(amount))
            .ok_or(MathError::Overflow)?;

        if balance >= required {
            self.total_withdrawn = self
                .total_withdrawn
                .checked_add(amount)
                .ok_or(MathError::Overflow)?;
            env.native.transfer(&self.address, receiver, amount)?;
            info!(%sender, %receiver, amount, "withdrawn");
            Ok(WithdrawOutcome::Paid)
        } else {
            let entry = self.queue.enqueue(*receiver, amount)?;
            info!(
                %sender,
                %receiver,
                amount,
                queue_id = entry.queue_id,
                accumulated = entry.accumulated_threshold,
                "withdrawal queued"
            );
            Ok(WithdrawOutcome::Queued(entry))
        }
    }

    /// Pay every claimable entry of `receiver`.
    pub fn claim_for(&mut self, receiver: &Address, native: &mut NativeLedger) -> Result<(Vec<u64>, Wei)> {
        self.access.ensure_not_paused()?;
        let ids = self.queue.eligible(receiver, self.claimable(native));
        self.pay_claims(receiver, ids, native)
    }

    /// Pay the listed entries of `sender` that are claimable now.
    ///
    /// Ids that are not claimable or not owned by `sender` are skipped.
    pub fn claim_by_queue_ids(
        &mut self,
        sender: &Address,
        queue_ids: &[u64],
        native: &mut NativeLedger,
    ) -> Result<(Vec<u64>, Wei)> {
        self.access.ensure_not_paused()?;
        let eligible: BTreeSet<u64> = self
            .queue
            .eligible(sender, self.claimable(native))
            .into_iter()
            .collect();
        let selected: BTreeSet<u64> = queue_ids
            .iter()
            .copied()
            .filter(|id| eligible.contains(id))
            .collect();
        self.pay_claims(sender, selected.into_iter().collect(), native)
    }

    fn pay_claims(&mut self, receiver: &Address, ids: Vec<u64>, native: &mut NativeLedger) -> Result<(Vec<u64>, Wei)> {
        if ids.is_empty() {
            return Err(PoolError::NoClaimAmount);
        }
        let amount = self.queue.take(&ids)?;
        self.total_claimed = self
            .total_claimed
            .checked_add(amount)
            .ok_or(MathError::Overflow)?;
        native.transfer(&self.address, receiver, amount)?;
        info!(%receiver, amount, entries = ids.len(), "claimed");
        Ok((ids, amount))
    }

    /// Set the reserve ratio. Owner only.
    pub fn set_reserve_ratio(&mut self, caller: &Address, ratio: Wei) -> Result<()> {
        self.access.ensure_owner(caller)?;
        self.access.ensure_not_paused()?;
        if ratio > WAD {
            return Err(PoolError::InvalidRatio(ratio));
        }
        if ratio == self.reserve_ratio {
            return Err(PoolError::SameValue);
        }
        self.reserve_ratio = ratio;
        info!(ratio, "reserve ratio updated");
        Ok(())
    }

    /// Set the treasury ratio. Owner only.
    pub fn set_treasury_ratio(&mut self, caller: &Address, ratio: Wei) -> Result<()> {
        self.access.ensure_owner(caller)?;
        self.access.ensure_not_paused()?;
        if ratio > WAD {
            return Err(PoolError::InvalidRatio(ratio));
        }
        if ratio == self.treasury_ratio {
            return Err(PoolError::SameValue);
        }
        self.treasury_ratio = ratio;
        info!(ratio, "treasury ratio updated");
        Ok(())
    }

    /// Set the daily limit of `action`; zero removes it. Owner only.
    pub fn set_action_limit(&mut self, caller: &Address, action: Action, limit: Wei, now: Timestamp) -> Result<()> {
        self.access.ensure_owner(caller)?;
        self.access.ensure_not_paused()?;
        let lifetime = self.lifetime(action);
        self.limits.set_limit(action, limit, now, lifetime)?;
        info!(%action, limit, "action limit updated");
        Ok(())
    }

    /// Set the minimum amount of `action`; zero removes it. Owner only.
    pub fn set_action_threshold(&mut self, caller: &Address, action: Action, threshold: Wei) -> Result<()> {
        self.access.ensure_owner(caller)?;
        self.access.ensure_not_paused()?;
        self.limits.set_threshold(action, threshold)?;
        info!(%action, threshold, "action threshold updated");
        Ok(())
    }

    /// Set the treasury. Owner only.
    pub fn set_treasury(&mut self, caller: &Address, treasury: Address) -> Result<()> {
        self.access.ensure_owner(caller)?;
        self.access.ensure_not_paused()?;
        if treasury.is_zero() {
            return Err(PoolError::ZeroAddress);
        }
        if treasury == self.treasury {
            return Err(PoolError::SameValue);
        }
        self.treasury = treasury;
        info!(%treasury, "treasury updated");
        Ok(())
    }

    /// Set the reward oracle. Owner only.
    pub fn set_reward_oracle(&mut self, caller: &Address, oracle: Address) -> Result<()> {
        self.access.ensure_owner(caller)?;
        self.access.ensure_not_paused()?;
        if oracle.is_zero() {
            return Err(PoolError::ZeroAddress);
        }
        if self.reward_oracle == Some(oracle) {
            return Err(PoolError::SameValue);
        }
        self.reward_oracle = Some(oracle);
        info!(%oracle, "reward oracle updated");
        Ok(())
    }

    /// Stop accepting rewards from any oracle. Owner only.
    pub fn disable_reward_oracle(&mut self, caller: &Address) -> Result<()> {
        self.access.ensure_owner(caller)?;
        self.access.ensure_not_paused()?;
        if self.reward_oracle.is_none() {
            return Err(PoolError::SameValue);
        }
        self.reward_oracle = None;
        info!("reward oracle disabled");
        Ok(())
    }

    /// Allow-list a strategy controlled by this pool. Owner only.
    pub fn add_strategy<S: Strategy>(&mut self, caller: &Address, strategy: &S) -> Result<()> {
        self.access.ensure_owner(caller)?;
        self.access.ensure_not_paused()?;
        let address = strategy.address();
        if strategy.core() != self.address {
            return Err(PoolError::StrategyCoreMismatch {
                strategy: address,
                core: strategy.core(),
            });
        }
        if !self.strategists.insert(address) {
            return Err(PoolError::StrategyAlreadyAdded(address));
        }
        info!(strategy = %address, "strategy added");
        Ok(())
    }

    /// Remove a strategy from the allow-list. Owner only.
    pub fn remove_strategy(&mut self, caller: &Address, strategy: Address) -> Result<()> {
        self.access.ensure_owner(caller)?;
        self.access.ensure_not_paused()?;
        if !self.strategists.remove(&strategy) {
            return Err(PoolError::NotStrategist(strategy));
        }
        info!(%strategy, "strategy removed");
        Ok(())
    }

    /// Return `amount` of the strategy reserve to the free balance. Owner only.
    pub fn release_strategy_reserve(&mut self, caller: &Address, amount: Wei) -> Result<()> {
        self.access.ensure_owner(caller)?;
        self.access.ensure_not_paused()?;
        if amount == 0 {
            return Err(PoolError::ZeroAmount);
        }
        self.strategy_reserve = self.strategy_reserve.checked_sub(amount).ok_or(
            PoolError::InsufficientReserve {
                requested: amount,
                available: self.strategy_reserve,
            },
        )?;
        info!(amount, remaining = self.strategy_reserve, "strategy reserve released");
        Ok(())
    }

    /// Send `amount` of the strategy reserve to `strategy`. Owner only.
    pub fn deposit_into_strategy<S: Strategy>(
        &mut self,
        caller: &Address,
        strategy: &mut S,
        amount: Wei,
        native: &mut NativeLedger,
    ) -> Result<()> {
        self.access.ensure_owner(caller)?;
        self.access.ensure_not_paused()?;
        let address = strategy.address();
        if !self.is_strategist(&address) {
            return Err(PoolError::NotStrategist(address));
        }
        if amount == 0 {
            return Err(PoolError::ZeroAmount);
        }
        let reserve = self.strategy_reserve.checked_sub(amount).ok_or(
            PoolError::InsufficientReserve {
                requested: amount,
                available: self.strategy_reserve,
            },
        )?;
        let deposited = self
            .deposit_strategy
            .checked_add(amount)
            .ok_or(MathError::Overflow)?;
        self.strategy_reserve = reserve;
        self.deposit_strategy = deposited;

        native.transfer(&self.address, &address, amount)?;
        strategy.receive_eth_from_core(amount);
        info!(strategy = %address, amount, "strategy deposit");
        Ok(())
    }

    /// Mint dETH on behalf of an allow-listed strategy.
    pub fn strategy_minting(
        &mut self,
        caller: &Address,
        receiver: &Address,
        amount: Wei,
        token: &mut RebasingToken,
    ) -> Result<()> {
        self.access.ensure_not_paused()?;
        if !self.is_strategist(caller) {
            return Err(PoolError::NotStrategist(*caller));
        }
        if amount == 0 {
            return Err(PoolError::ZeroAmount);
        }
        token.mint(&self.address, receiver, amount)?;
        info!(strategy = %caller, %receiver, amount, "strategy minted");
        Ok(())
    }

    /// Book ETH earnings a strategy has already sent to the pool.
    pub fn receive_strategy_earning(&mut self, caller: &Address, value: Wei) -> Result<()> {
        self.access.ensure_not_paused()?;
        if !self.is_strategist(caller) {
            return Err(PoolError::NotStrategist(*caller));
        }
        if value == 0 {
            return Err(PoolError::ZeroAmount);
        }
        let reserve = self
            .strategy_reserve
            .checked_add(value)
            .ok_or(MathError::Overflow)?;
        let received = self
            .receive_strategy
            .checked_add(value)
            .ok_or(MathError::Overflow)?;
        self.strategy_reserve = reserve;
        self.receive_strategy = received;
        info!(strategy = %caller, value, "strategy earning received");
        Ok(())
    }

    /// Mint an oracle reward, split between treasury and vault.
    pub fn supply_reward(&mut self, caller: &Address, amount: Wei, token: &mut RebasingToken) -> Result<RewardSplit> {
        self.access.ensure_not_paused()?;
        if self.reward_oracle != Some(*caller) {
            return Err(PoolError::NotRewardOracle(*caller));
        }
        if amount == 0 {
            return Err(PoolError::ZeroAmount);
        }
        let treasury_amount = wad_mul(amount, self.treasury_ratio)?;
        let vault_amount = amount - treasury_amount;
        if treasury_amount > 0 {
            token.mint(&self.address, &self.treasury, treasury_amount)?;
        }
        if vault_amount > 0 {
            token.mint(&self.address, &self.vault, vault_amount)?;
        }
        debug!(treasury = %self.treasury, vault = %self.vault, "reward minted");
        info!(amount, treasury_amount, vault_amount, "reward supplied");
        Ok(RewardSplit {
            treasury_amount,
            vault_amount,
        })
    }
}
