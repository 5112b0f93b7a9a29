//! The sdETH vault.
//!
//! Every mutating entry point accrues the reward stream before converting
//! between shares and assets, so conversions always price against the
//! up-to-date `total_assets`. Rounding always favors the vault:
//!
//! | Operation  | Computed        | Rounding |
//! |------------|-----------------|----------|
//! | `deposit`  | shares minted   | down     |
//! | `mint`     | assets pulled   | up       |
//! | `withdraw` | shares burned   | up       |
//! | `redeem`   | assets paid     | down     |
//!
//! `total_assets <= underlying.balance_of(vault)` holds after every call.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use deth_token::TokenLedger;
use deth_types::{AccessControl, Address, MathError, Rounding, Timestamp, Wei};

use crate::conversion::{convert_to_assets, convert_to_shares};
use crate::stream::RewardStream;
use crate::{Result, UnderlyingAsset, VaultError};

/// ERC-4626-style reward-streaming vault over dETH.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardVault {
    name: String,
    symbol: String,
    address: Address,
    asset: Address,
    shares: TokenLedger,
    total_assets: Wei,
    stream: RewardStream,
    access: AccessControl,
}

impl RewardVault {
    /// Create an empty vault over `asset`.
    pub fn new(
        name: &str,
        symbol: &str,
        address: Address,
        asset: Address,
        owner: Address,
        duration: u64,
        now: Timestamp,
    ) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            address,
            asset,
            shares: TokenLedger::new(),
            total_assets: 0,
            stream: RewardStream::new(duration, now),
            access: AccessControl::new(owner),
        }
    }

    /// Share token name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Share token symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The vault's own address (holder of the underlying).
    pub fn address(&self) -> Address {
        self.address
    }

    /// Address of the underlying token.
    pub fn asset(&self) -> Address {
        self.asset
    }

    /// Access table.
    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    /// Mutable access table, for role and ownership administration.
    pub fn access_mut(&mut self) -> &mut AccessControl {
        &mut self.access
    }

    /// Reward stream state.
    pub fn stream(&self) -> &RewardStream {
        &self.stream
    }

    /// Accounted assets as of the last accrual.
    pub fn stored_total_assets(&self) -> Wei {
        self.total_assets
    }

    /// Accounted assets including reward released up to `now`.
    pub fn total_assets_at(&self, now: Timestamp) -> Result<Wei> {
        let pending = self.stream.pending(now)?;
        Ok(self
            .total_assets
            .checked_add(pending)
            .ok_or(MathError::Overflow)?)
    }

    /// Outstanding shares.
    pub fn total_shares(&self) -> Wei {
        self.shares.total_supply()
    }

    /// Share balance of `account`.
    pub fn shares_of(&self, account: &Address) -> Wei {
        self.shares.balance_of(account)
    }

    /// Share allowance of `spender` over `owner`.
    pub fn share_allowance(&self, owner: &Address, spender: &Address) -> Wei {
        self.shares.allowance(owner, spender)
    }

    /// Shares `assets` is worth at `now`, rounded down.
    pub fn convert_to_shares(&self, assets: Wei, now: Timestamp) -> Result<Wei> {
        self.to_shares_at(assets, now, Rounding::Down)
    }

    /// Assets `shares` are worth at `now`, rounded down.
    pub fn convert_to_assets(&self, shares: Wei, now: Timestamp) -> Result<Wei> {
        self.to_assets_at(shares, now, Rounding::Down)
    }

    /// Shares a deposit of `assets` would mint at `now`.
    pub fn preview_deposit(&self, assets: Wei, now: Timestamp) -> Result<Wei> {
        self.to_shares_at(assets, now, Rounding::Down)
    }

    /// Assets a mint of `shares` would pull at `now`.
    pub fn preview_mint(&self, shares: Wei, now: Timestamp) -> Result<Wei> {
        self.to_assets_at(shares, now, Rounding::Up)
    }

    /// Shares a withdrawal of `assets` would burn at `now`.
    pub fn preview_withdraw(&self, assets: Wei, now: Timestamp) -> Result<Wei> {
        self.to_shares_at(assets, now, Rounding::Up)
    }

    /// Assets a redemption of `shares` would pay at `now`.
    pub fn preview_redeem(&self, shares: Wei, now: Timestamp) -> Result<Wei> {
        self.to_assets_at(shares, now, Rounding::Down)
    }

    /// Most assets `owner` can withdraw at `now`.
    pub fn max_withdraw(&self, owner: &Address, now: Timestamp) -> Result<Wei> {
        self.to_assets_at(self.shares_of(owner), now, Rounding::Down)
    }

    /// Most shares `owner` can redeem.
    pub fn max_redeem(&self, owner: &Address) -> Wei {
        self.shares_of(owner)
    }

    /// Release streamed reward up to `now`, rolling into a new period if the
    /// current one has finished.
    pub fn accrue<U: UnderlyingAsset>(&mut self, now: Timestamp, underlying: &U) -> Result<()> {
        let balance = underlying.balance_of(&self.address);
        let accrual = self.stream.accrue(now, self.total_assets, balance)?;
        self.total_assets = accrual.total_assets;
        if accrual.released > 0 {
            debug!(
                released = accrual.released,
                total_assets = self.total_assets,
                "vault reward released"
            );
        }
        Ok(())
    }

    /// Deposit `assets` from the caller and mint shares to `receiver`.
    ///
    /// The caller must have approved the vault for `assets`.
    pub fn deposit<U: UnderlyingAsset>(
        &mut self,
        caller: &Address,
        assets: Wei,
        receiver: &Address,
        now: Timestamp,
        underlying: &mut U,
    ) -> Result<Wei> {
        self.access.ensure_not_paused()?;
        if assets == 0 {
            return Err(VaultError::ZeroAmount);
        }
        self.accrue(now, underlying)?;

        let shares = self.to_shares(assets, Rounding::Down)?;
        if shares == 0 {
            return Err(VaultError::ZeroShares { assets });
        }
        self.pull(caller, assets, underlying)?;
        self.issue(receiver, assets, shares)?;

        info!(%caller, %receiver, assets, shares, "vault deposit");
        Ok(shares)
    }

    /// Mint exactly `shares` to `receiver`, pulling the required assets from
    /// the caller.
    pub fn mint<U: UnderlyingAsset>(
        &mut self,
        caller: &Address,
        shares: Wei,
        receiver: &Address,
        now: Timestamp,
        underlying: &mut U,
    ) -> Result<Wei> {
        self.access.ensure_not_paused()?;
        if shares == 0 {
            return Err(VaultError::ZeroAmount);
        }
        self.accrue(now, underlying)?;

        let assets = self.to_assets(shares, Rounding::Up)?;
        self.pull(caller, assets, underlying)?;
        self.issue(receiver, assets, shares)?;

        info!(%caller, %receiver, assets, shares, "vault mint");
        Ok(assets)
    }

    /// Burn `owner`'s shares to pay exactly `assets` to `receiver`.
    ///
    /// A caller other than `owner` spends its share allowance.
    pub fn withdraw<U: UnderlyingAsset>(
        &mut self,
        caller: &Address,
        assets: Wei,
        receiver: &Address,
        owner: &Address,
        now: Timestamp,
        underlying: &mut U,
    ) -> Result<Wei> {
        self.access.ensure_not_paused()?;
        if assets == 0 {
            return Err(VaultError::ZeroAmount);
        }
        self.accrue(now, underlying)?;

        let shares = self.to_shares(assets, Rounding::Up)?;
        self.retire(caller, owner, assets, shares)?;
        underlying.transfer(&self.address, receiver, assets)?;

        info!(%caller, %receiver, %owner, assets, shares, "vault withdraw");
        Ok(shares)
    }

    /// Burn exactly `shares` of `owner` and pay the assets to `receiver`.
    pub fn redeem<U: UnderlyingAsset>(
        &mut self,
        caller: &Address,
        shares: Wei,
        receiver: &Address,
        owner: &Address,
        now: Timestamp,
        underlying: &mut U,
    ) -> Result<Wei> {
        self.access.ensure_not_paused()?;
        if shares == 0 {
            return Err(VaultError::ZeroAmount);
        }
        self.accrue(now, underlying)?;

        let assets = self.to_assets(shares, Rounding::Down)?;
        if assets == 0 {
            return Err(VaultError::ZeroAssets { shares });
        }
        self.retire(caller, owner, assets, shares)?;
        underlying.transfer(&self.address, receiver, assets)?;

        info!(%caller, %receiver, %owner, assets, shares, "vault redeem");
        Ok(assets)
    }

    /// Replace the current distribution with `reward` over `duration`
    /// seconds starting now. Owner only.
    ///
    /// `reward` may be zero to stop the distribution, but never more than
    /// the underlying the vault holds beyond `total_assets`.
    pub fn speed_up_reward<U: UnderlyingAsset>(
        &mut self,
        caller: &Address,
        reward: Wei,
        duration: u64,
        now: Timestamp,
        underlying: &U,
    ) -> Result<()> {
        self.access.ensure_owner(caller)?;
        self.access.ensure_not_paused()?;
        if duration == 0 {
            return Err(VaultError::ZeroDuration);
        }
        let balance = underlying.balance_of(&self.address);
        let accrual = self.stream.accrue(now, self.total_assets, balance)?;
        self.total_assets = accrual.total_assets;

        let available = balance
            .checked_sub(self.total_assets)
            .ok_or(MathError::Underflow)?;
        if reward > available {
            return Err(VaultError::RewardExceedsAvailable { reward, available });
        }
        self.stream.restart(reward, duration, now)?;

        info!(
            reward,
            duration,
            reward_rate = self.stream.reward_rate,
            period_finish = self.stream.period_finish,
            "vault reward distribution replaced"
        );
        Ok(())
    }

    /// Set the length of automatically started periods. Owner only.
    ///
    /// The current period keeps its rate and end time.
    pub fn set_duration(&mut self, caller: &Address, duration: u64) -> Result<()> {
        self.access.ensure_owner(caller)?;
        self.access.ensure_not_paused()?;
        if self.stream.duration == duration {
            return Err(VaultError::SameValue);
        }
        self.stream.duration = duration;
        info!(duration, "vault reward duration updated");
        Ok(())
    }

    /// Transfer shares from the caller to `to`.
    pub fn transfer_shares(&mut self, caller: &Address, to: &Address, shares: Wei) -> Result<()> {
        self.access.ensure_not_paused()?;
        self.shares
            .transfer(caller, to, shares)
            .map_err(VaultError::Shares)
    }

    /// Approve `spender` to move or redeem the caller's shares.
    pub fn approve_shares(&mut self, caller: &Address, spender: &Address, shares: Wei) -> Result<()> {
        self.access.ensure_not_paused()?;
        self.shares
            .approve(caller, spender, shares)
            .map_err(VaultError::Shares)
    }

    /// Transfer `owner`'s shares to `to`, spending the caller's allowance.
    pub fn transfer_shares_from(
        &mut self,
        caller: &Address,
        owner: &Address,
        to: &Address,
        shares: Wei,
    ) -> Result<()> {
        self.access.ensure_not_paused()?;
        self.shares
            .spend_allowance(owner, caller, shares)
            .map_err(VaultError::Shares)?;
        self.shares
            .transfer(owner, to, shares)
            .map_err(VaultError::Shares)
    }

    fn to_shares(&self, assets: Wei, rounding: Rounding) -> Result<Wei> {
        Ok(convert_to_shares(
            assets,
            self.total_shares(),
            self.total_assets,
            rounding,
        )?)
    }

    fn to_assets(&self, shares: Wei, rounding: Rounding) -> Result<Wei> {
        Ok(convert_to_assets(
            shares,
            self.total_shares(),
            self.total_assets,
            rounding,
        )?)
    }

    fn to_shares_at(&self, assets: Wei, now: Timestamp, rounding: Rounding) -> Result<Wei> {
        Ok(convert_to_shares(
            assets,
            self.total_shares(),
            self.total_assets_at(now)?,
            rounding,
        )?)
    }

    fn to_assets_at(&self, shares: Wei, now: Timestamp, rounding: Rounding) -> Result<Wei> {
        Ok(convert_to_assets(
            shares,
            self.total_shares(),
            self.total_assets_at(now)?,
            rounding,
        )?)
    }

    fn pull<U: UnderlyingAsset>(&self, caller: &Address, assets: Wei, underlying: &mut U) -> Result<()> {
        underlying.transfer_from(&self.address, caller, &self.address, assets)?;
        Ok(())
    }

    fn issue(&mut self, receiver: &Address, assets: Wei, shares: Wei) -> Result<()> {
        self.shares
            .mint(receiver, shares)
            .map_err(VaultError::Shares)?;
        self.total_assets = self
            .total_assets
            .checked_add(assets)
            .ok_or(MathError::Overflow)?;
        Ok(())
    }

    fn retire(&mut self, caller: &Address, owner: &Address, assets: Wei, shares: Wei) -> Result<()> {
        if caller != owner {
            self.shares
                .spend_allowance(owner, caller, shares)
                .map_err(VaultError::Shares)?;
        }
        self.shares
            .burn(owner, shares)
            .map_err(VaultError::Shares)?;
        self.total_assets = self
            .total_assets
            .checked_sub(assets)
            .ok_or(MathError::Underflow)?;
        Ok(())
    }
}
