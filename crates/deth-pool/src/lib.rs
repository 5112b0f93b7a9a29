//! # deth-pool
//!
//! The core pool and the protocol aggregate that ties token, vault, oracle
//! and pool into one transactional ledger.
//!
//! ## Modules
//!
//! - [`limits`] — rolling daily action limits and minimum amounts
//! - [`queue`] — FIFO withdrawal claim queue
//! - [`native`] — native ETH balances
//! - [`strategy`] — strategy adapter seam
//! - [`pool`] — submit/withdraw/claim and pool administration
//! - [`protocol`] — atomic entry points over the whole ledger
//! - [`config`] — genesis parameters
//! - [`views`] — read-only status snapshots

pub mod config;
pub mod limits;
pub mod native;
pub mod pool;
pub mod protocol;
pub mod queue;
pub mod strategy;
pub mod views;

pub use config::ProtocolConfig;
pub use limits::{Action, ActionData, ActionLimits};
pub use native::NativeLedger;
pub use pool::{CorePool, PoolEnv, RewardSplit, WithdrawOutcome};
pub use protocol::{Protocol, Receipt, STATE_VERSION};
pub use queue::{ClaimQueue, QueueEntry};
pub use strategy::{Strategy, StrategyAdapter};
pub use views::{OracleStatus, PoolStatus, VaultStatus};

use deth_oracle::OracleError;
use deth_token::TokenError;
use deth_types::{AccessError, Address, MathError, Wei};
use deth_vault::VaultError;

/// Error types for pool and protocol operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Amount is zero.
    #[error("amount is zero")]
    ZeroAmount,

    /// Zero address where an account is required.
    #[error("zero address")]
    ZeroAddress,

    /// Native value attached to a call that does not accept it.
    #[error("call is not payable")]
    NotPayable,

    /// Amount under the action's minimum.
    #[error("{action} amount {amount} is below threshold {threshold}")]
    BelowThreshold {
        /// The limited action.
        action: Action,
        /// Requested amount.
        amount: Wei,
        /// Configured minimum.
        threshold: Wei,
    },

    /// Daily allowance exhausted.
    #[error("{action} limit exceeded: requested {requested}, remaining {remaining}")]
    LimitExceeded {
        /// The limited action.
        action: Action,
        /// Requested amount.
        requested: Wei,
        /// Allowance left today.
        remaining: Wei,
    },

    /// Nothing eligible to claim.
    #[error("no claimable amount")]
    NoClaimAmount,

    /// Ratio above 1e18.
    #[error("ratio {0} exceeds 1e18")]
    InvalidRatio(Wei),

    /// Caller is not the configured reward oracle.
    #[error("{0} is not the reward oracle")]
    NotRewardOracle(Address),

    /// Caller is not an allow-listed strategy.
    #[error("{0} is not a strategy")]
    NotStrategist(Address),

    /// No adapter deployed at the address.
    #[error("no strategy adapter at {0}")]
    UnknownStrategy(Address),

    /// An adapter is already deployed at the address.
    #[error("strategy adapter already deployed at {0}")]
    AdapterExists(Address),

    /// Strategy already allow-listed.
    #[error("strategy {0} already added")]
    StrategyAlreadyAdded(Address),

    /// The adapter is controlled by a different pool.
    #[error("strategy {strategy} reports core {core}")]
    StrategyCoreMismatch {
        /// The adapter.
        strategy: Address,
        /// Core the adapter reports.
        core: Address,
    },

    /// Reserve too small for a strategy deposit or release.
    #[error("insufficient strategy reserve: requested {requested}, available {available}")]
    InsufficientReserve {
        /// Requested amount.
        requested: Wei,
        /// Current reserve.
        available: Wei,
    },

    /// Native balance too small for a transfer.
    #[error("insufficient ETH for {account}: required {required}, available {available}")]
    InsufficientEth {
        /// The debited account.
        account: Address,
        /// Amount requested.
        required: Wei,
        /// Current balance.
        available: Wei,
    },

    /// Same-value write.
    #[error("Cannot set the same value")]
    SameValue,

    /// Snapshot written by an unknown state version.
    #[error("unsupported state version {found}, expected at most {supported}")]
    UnsupportedStateVersion {
        /// Version tag in the snapshot.
        found: u32,
        /// Newest version this build reads.
        supported: u32,
    },

    /// Token failure.
    #[error("token: {0}")]
    Token(#[from] TokenError),

    /// Vault failure.
    #[error("vault: {0}")]
    Vault(#[from] VaultError),

    /// Oracle failure.
    #[error("oracle: {0}")]
    Oracle(#[from] OracleError),

    /// Authorization or pause failure.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Arithmetic failure.
    #[error(transparent)]
    Math(#[from] MathError),
}

/// Convenience result type for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
