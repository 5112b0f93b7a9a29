//! Beacon chain epoch clock.
//!
//! ```text
//! epoch_id      = (now - zero_epoch_timestamp) / 384
//! interest_rate = ceil(reward * 1e18 / (epoch_count * validators * 32 ETH))
//! ```

use deth_types::{mul_div, MathError, Rounding, Timestamp, Wei, DEPOSIT_SIZE, SECONDS_PER_EPOCH, WAD};

/// Epoch containing `now`. Times before genesis map to epoch 0.
pub fn current_epoch_id(now: Timestamp, zero_epoch_timestamp: Timestamp) -> u64 {
    now.saturating_sub(zero_epoch_timestamp) / SECONDS_PER_EPOCH
}

/// Start time of `epoch_id`.
pub fn epoch_timestamp(epoch_id: u64, zero_epoch_timestamp: Timestamp) -> Result<Timestamp, MathError> {
    epoch_id
        .checked_mul(SECONDS_PER_EPOCH)
        .and_then(|offset| offset.checked_add(zero_epoch_timestamp))
        .ok_or(MathError::Overflow)
}

/// 1e18-scaled reward per validator principal per epoch, rounded up.
///
/// # Errors
///
/// - [`MathError::DivisionByZero`] if `epoch_count` or `validators` is zero
/// - [`MathError::Overflow`] if the staked principal exceeds `u128`
pub fn interest_rate_per_epoch(reward: Wei, epoch_count: u64, validators: u64) -> Result<Wei, MathError> {
    let principal = u128::from(epoch_count)
        .checked_mul(u128::from(validators))
        .and_then(|n| n.checked_mul(DEPOSIT_SIZE))
        .ok_or(MathError::Overflow)?;
    mul_div(reward, WAD, principal, Rounding::Up)
}
