//! Reward streaming.
//!
//! Underlying that lands in the vault without a deposit (oracle rewards,
//! donations) is not counted in `total_assets` straight away. It is
//! released at a constant `reward_rate` until `period_finish`, then the next
//! accrual after the period ends rolls everything still undistributed into a
//! fresh period of `duration` seconds.
//!
//! ```text
//! released    = reward_rate * (min(now, period_finish) - last_update_time)
//! reward_rate = (underlying_balance - total_assets) / duration   (on roll)
//! ```
//!
//! Integer division leaves a remainder below `duration` wei undistributed;
//! it is picked up by the next roll.

use serde::{Deserialize, Serialize};
use tracing::debug;

use deth_types::{MathError, Timestamp, Wei};

/// Outcome of one accrual step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Accrual {
    /// Reward released into total assets by this step.
    pub released: Wei,
    /// Total assets after the release.
    pub total_assets: Wei,
    /// Whether a new distribution period was started.
    pub rolled: bool,
}

/// Reward-rate state of the vault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardStream {
    /// Length of each automatically started period, in seconds. Zero
    /// disables the automatic roll-over.
    pub duration: u64,
    /// Underlying released per second.
    pub reward_rate: Wei,
    /// End of the current period.
    pub period_finish: Timestamp,
    /// Last time reward was released into total assets.
    pub last_update_time: Timestamp,
}

impl RewardStream {
    /// A stream with no active period. The first accrual starts one.
    pub fn new(duration: u64, now: Timestamp) -> Self {
        Self {
            duration,
            reward_rate: 0,
            period_finish: now,
            last_update_time: now,
        }
    }

    /// Reward released between the last update and `now`, without mutating.
    pub fn pending(&self, now: Timestamp) -> Result<Wei, MathError> {
        let end = now.min(self.period_finish);
        if end <= self.last_update_time {
            return Ok(0);
        }
        self.reward_rate
            .checked_mul(Wei::from(end - self.last_update_time))
            .ok_or(MathError::Overflow)
    }

    /// Release pending reward into `total_assets` and roll into a new period
    /// when the current one has finished.
    ///
    /// # Errors
    ///
    /// - [`MathError::Overflow`] if the release overflows
    /// - [`MathError::Underflow`] if `total_assets` would exceed
    ///   `underlying_balance`
    pub fn accrue(
        &mut self,
        now: Timestamp,
        total_assets: Wei,
        underlying_balance: Wei,
    ) -> Result<Accrual, MathError> {
        let released = self.pending(now)?;
        let total_assets = total_assets
            .checked_add(released)
            .ok_or(MathError::Overflow)?;
        self.last_update_time = self.last_update_time.max(now);

        let mut rolled = false;
        if now >= self.period_finish && self.duration > 0 {
            let undistributed = underlying_balance
                .checked_sub(total_assets)
                .ok_or(MathError::Underflow)?;
            self.reward_rate = undistributed / Wei::from(self.duration);
            self.period_finish = now + self.duration;
            rolled = true;
            debug!(
                reward_rate = self.reward_rate,
                period_finish = self.period_finish,
                undistributed,
                "reward period rolled"
            );
        }

        Ok(Accrual {
            released,
            total_assets,
            rolled,
        })
    }

    /// Replace the current period with one distributing `reward` over
    /// `duration` seconds starting at `now`.
    pub fn restart(&mut self, reward: Wei, duration: u64, now: Timestamp) -> Result<(), MathError> {
        if duration == 0 {
            return Err(MathError::DivisionByZero);
        }
        self.reward_rate = reward / Wei::from(duration);
        self.period_finish = now + duration;
        self.duration = duration;
        self.last_update_time = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_accrual_rolls() {
        let mut stream = RewardStream::new(100, 1_000);
        let accrual = stream.accrue(1_000, 0, 1_000).expect("accrue");
        assert!(accrual.rolled);
        assert_eq!(accrual.released, 0);
        assert_eq!(stream.reward_rate, 10);
        assert_eq!(stream.period_finish, 1_100);
    }

    #[test]
    fn test_linear_release() {
        let mut stream = RewardStream::new(100, 0);
        stream.accrue(0, 0, 1_000).expect("start");

        let accrual = stream.accrue(25, 0, 1_000).expect("quarter");
        assert_eq!(accrual.released, 250);
        assert!(!accrual.rolled);

        let accrual = stream.accrue(100, 250, 1_000).expect("end");
        assert_eq!(accrual.released, 750);
        assert_eq!(accrual.total_assets, 1_000);
        // Nothing left to distribute, so the next period has a zero rate.
        assert!(accrual.rolled);
        assert_eq!(stream.reward_rate, 0);
    }

    #[test]
    fn test_release_capped_at_period_finish() {
        let mut stream = RewardStream::new(100, 0);
        stream.accrue(0, 0, 1_000).expect("start");
        assert_eq!(stream.pending(500).expect("pending"), 1_000);
    }

    #[test]
    fn test_remainder_rolls_forward() {
        let mut stream = RewardStream::new(3, 0);
        let accrual = stream.accrue(0, 0, 10).expect("start");
        assert!(accrual.rolled);
        assert_eq!(stream.reward_rate, 3);

        let accrual = stream.accrue(3, 0, 10).expect("end");
        assert_eq!(accrual.total_assets, 9);
        assert_eq!(stream.reward_rate, 0); // 1 wei left, below duration
    }

    #[test]
    fn test_zero_duration_never_rolls() {
        let mut stream = RewardStream::new(0, 0);
        let accrual = stream.accrue(50, 0, 1_000).expect("accrue");
        assert!(!accrual.rolled);
        assert_eq!(stream.reward_rate, 0);
    }

    #[test]
    fn test_restart() {
        let mut stream = RewardStream::new(100, 0);
        stream.restart(60, 30, 10).expect("restart");
        assert_eq!(stream.reward_rate, 2);
        assert_eq!(stream.period_finish, 40);
        assert_eq!(stream.duration, 30);
        assert_eq!(stream.last_update_time, 10);
        assert_eq!(
            stream.restart(1, 0, 10),
            Err(MathError::DivisionByZero)
        );
    }
}
