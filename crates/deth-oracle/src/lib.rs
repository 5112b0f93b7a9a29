//! # deth-oracle
//!
//! Epoch reward oracle.
//!
//! Managers report the validator reward accrued since the last accepted
//! epoch. A report is accepted only when it continues exactly from the last
//! one, does not run ahead of the beacon chain clock, activates no more
//! validators than the per-epoch limit allows, and implies a per-epoch
//! interest rate under the configured ceiling. Accepted rewards are handed to
//! a [`RewardSink`] (the core pool), which mints them.
//!
//! ## Modules
//!
//! - [`epoch`] — beacon chain epoch clock and the interest-rate bound
//! - [`oracle`] — the bounds-checked report state machine

pub mod epoch;
pub mod oracle;

pub use epoch::{current_epoch_id, epoch_timestamp, interest_rate_per_epoch};
pub use oracle::{EpochReport, OracleLimits, RewardOracle};

use deth_types::{AccessError, Address, MathError, Timestamp, Wei};

/// Error types for oracle operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// A report with no active validators.
    #[error("activated validator count is zero")]
    ZeroValidatorCount,

    /// The report does not continue from the last accepted epoch.
    #[error("start epoch {start_epoch_id} does not match last epoch {last_epoch_id}")]
    EpochMismatch {
        /// Start epoch given by the reporter.
        start_epoch_id: u64,
        /// Last accepted epoch.
        last_epoch_id: u64,
    },

    /// The reported epoch is not after the last accepted epoch.
    #[error("epoch {epoch_id} is not after last epoch {last_epoch_id}")]
    EpochNotAdvanced {
        /// Reported epoch.
        epoch_id: u64,
        /// Last accepted epoch.
        last_epoch_id: u64,
    },

    /// The reported epoch has not happened yet.
    #[error("epoch {epoch_id} is ahead of current epoch {current_epoch_id}")]
    EpochInFuture {
        /// Reported epoch.
        epoch_id: u64,
        /// Epoch of the current timestamp.
        current_epoch_id: u64,
    },

    /// More validators activated than the per-epoch limit permits.
    #[error("validator count {reported} exceeds limit {limit}")]
    ValidatorLimitExceeded {
        /// Reported active validators.
        reported: u64,
        /// Largest acceptable count.
        limit: u128,
    },

    /// Implied per-epoch interest above the ceiling.
    #[error("interest rate {rate} per epoch exceeds limit {limit}")]
    InterestRateExceeded {
        /// Implied 1e18-scaled interest per epoch, rounded up.
        rate: Wei,
        /// Configured ceiling.
        limit: Wei,
    },

    /// The reward sink refused the supply.
    #[error("reward supply failed: {0}")]
    SupplyFailed(String),

    /// Same-value write.
    #[error("Cannot set the same value")]
    SameValue,

    /// Authorization or pause failure.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Arithmetic failure.
    #[error(transparent)]
    Math(#[from] MathError),
}

/// Convenience result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;

/// Receiver of accepted epoch rewards.
pub trait RewardSink {
    /// Failure reported by the sink.
    type Error: std::error::Error;

    /// Mint `amount` of reward on behalf of `oracle`.
    fn supply_reward(
        &mut self,
        oracle: &Address,
        amount: Wei,
        now: Timestamp,
    ) -> std::result::Result<(), Self::Error>;
}
