//! # deth-vault
//!
//! The sdETH reward-streaming vault: an ERC-4626-style share wrapper over
//! dETH that releases newly supplied dETH linearly over a fixed duration.
//!
//! ## Modules
//!
//! - [`conversion`] — share/asset conversion with the `+1` inflation guard
//! - [`stream`] — reward-rate accrual and automatic period roll-over
//! - [`vault`] — deposit/mint/withdraw/redeem and administration

pub mod conversion;
pub mod stream;
pub mod vault;

pub use conversion::{convert_to_assets, convert_to_shares};
pub use stream::RewardStream;
pub use vault::RewardVault;

use deth_token::{RebasingToken, TokenError};
use deth_types::{AccessError, Address, MathError, Wei};

/// Error types for vault operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    /// Amount is zero.
    #[error("amount is zero")]
    ZeroAmount,

    /// A deposit would mint zero shares.
    #[error("deposit of {assets} assets mints zero shares")]
    ZeroShares {
        /// The deposited assets.
        assets: Wei,
    },

    /// A redeem would pay zero assets.
    #[error("redeem of {shares} shares pays zero assets")]
    ZeroAssets {
        /// The redeemed shares.
        shares: Wei,
    },

    /// A reward period must last at least one second.
    #[error("reward duration is zero")]
    ZeroDuration,

    /// The vault cannot promise reward it does not hold.
    #[error("reward {reward} exceeds available balance {available}")]
    RewardExceedsAvailable {
        /// Requested reward.
        reward: Wei,
        /// Underlying balance not yet counted in total assets.
        available: Wei,
    },

    /// Same-value write.
    #[error("Cannot set the same value")]
    SameValue,

    /// Share ledger failure (balance or allowance).
    #[error("shares: {0}")]
    Shares(TokenError),

    /// Underlying token failure.
    #[error("underlying: {0}")]
    Underlying(#[from] TokenError),

    /// Authorization or pause failure.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Arithmetic failure.
    #[error(transparent)]
    Math(#[from] MathError),
}

/// Convenience result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

/// The token the vault wraps.
///
/// The vault only ever moves underlying into itself through an allowance
/// granted by the depositor, and out of itself on withdraw.
pub trait UnderlyingAsset {
    /// Balance of `account`.
    fn balance_of(&self, account: &Address) -> Wei;

    /// Move `amount` from `from` (the caller) to `to`.
    fn transfer(&mut self, from: &Address, to: &Address, amount: Wei) -> std::result::Result<(), TokenError>;

    /// Move `amount` from `from` to `to` using `spender`'s allowance.
    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Wei,
    ) -> std::result::Result<(), TokenError>;
}

impl UnderlyingAsset for RebasingToken {
    fn balance_of(&self, account: &Address) -> Wei {
        RebasingToken::balance_of(self, account)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Wei) -> std::result::Result<(), TokenError> {
        RebasingToken::transfer(self, from, to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Wei,
    ) -> std::result::Result<(), TokenError> {
        RebasingToken::transfer_from(self, spender, from, to, amount)
    }
}
