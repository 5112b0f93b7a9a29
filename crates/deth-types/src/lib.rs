//! # deth-types
//!
//! Shared domain types used across the deth workspace: addresses, wei
//! amounts, fixed-point helpers, the access-control capability table and the
//! ledger events every committed transaction emits.

pub mod access;
pub mod address;
pub mod context;
pub mod events;
pub mod math;

pub use access::{AccessControl, AccessError, Role};
pub use address::Address;
pub use context::TxContext;
pub use events::{Component, LedgerEvent};
pub use math::{mul_div, wad_mul, MathError, Rounding, U256};

/// Amount of the base asset (or of a token denominated in it), in wei.
pub type Wei = u128;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// 1 ETH in wei.
pub const ONE_ETHER: Wei = 1_000_000_000_000_000_000;

/// Fixed-point scale for ratios (1.0 == `WAD`).
pub const WAD: u128 = ONE_ETHER;

/// Length of one action-limit bucket (one UTC day).
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Beacon chain slot time in seconds.
pub const SECONDS_PER_SLOT: u64 = 12;

/// Slots per beacon chain epoch.
pub const SLOTS_PER_EPOCH: u64 = 32;

/// Seconds per beacon chain epoch (6.4 minutes).
pub const SECONDS_PER_EPOCH: u64 = SECONDS_PER_SLOT * SLOTS_PER_EPOCH;

/// Principal backing one activated validator.
pub const DEPOSIT_SIZE: Wei = 32 * ONE_ETHER;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_length() {
        assert_eq!(SECONDS_PER_EPOCH, 384);
    }

    #[test]
    fn test_deposit_size() {
        assert_eq!(DEPOSIT_SIZE, 32_000_000_000_000_000_000);
    }
}
