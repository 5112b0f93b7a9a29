//! Rolling daily action limits.
//!
//! Submit and withdraw each have a bucket with a daily `limit` (zero means
//! unlimited) and a minimum `threshold` (zero means none). Days are UTC days,
//! `now / 86400`.
//!
//! Both buckets share one `current_index` pointer. The first limited action
//! of a new day moves the pointer and resets its own bucket; the other bucket
//! still carries yesterday's `latest_index` and is reset on its own first
//! access that day.
//!
//! Each bucket also snapshots the action's lifetime counter at the start of
//! its day in `accumulated`, so the amount used today is
//! `lifetime - accumulated`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use tracing::debug;

use deth_types::{Timestamp, Wei, SECONDS_PER_DAY};

use crate::{PoolError, Result};

/// A rate-limited pool action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// ETH in, dETH minted.
    Submit,
    /// dETH burned, ETH out or queued.
    Withdraw,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Submit => write!(f, "submit"),
            Action::Withdraw => write!(f, "withdraw"),
        }
    }
}

/// One action's bucket.
#[serde_as]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionData {
    /// Daily allowance; zero disables the limit.
    #[serde_as(as = "DisplayFromStr")]
    pub limit: Wei,
    /// Minimum amount per action; zero disables the floor.
    #[serde_as(as = "DisplayFromStr")]
    pub threshold: Wei,
    /// Day this bucket was last touched.
    pub latest_index: u64,
    /// Lifetime counter at the start of `latest_index`.
    #[serde_as(as = "DisplayFromStr")]
    pub accumulated: Wei,
    /// Allowance left in `latest_index`.
    #[serde_as(as = "DisplayFromStr")]
    pub remaining: Wei,
}

/// Both buckets and the shared day pointer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLimits {
    current_index: u64,
    submit: ActionData,
    withdraw: ActionData,
}

/// Day index of `now`.
pub fn day_index(now: Timestamp) -> u64 {
    now / SECONDS_PER_DAY
}

impl ActionLimits {
    /// Buckets with the given daily limits and no thresholds.
    pub fn new(submit_limit: Wei, withdraw_limit: Wei) -> Self {
        Self {
            current_index: 0,
            submit: ActionData {
                limit: submit_limit,
                remaining: submit_limit,
                ..ActionData::default()
            },
            withdraw: ActionData {
                limit: withdraw_limit,
                remaining: withdraw_limit,
                ..ActionData::default()
            },
        }
    }

    /// The shared day pointer.
    pub fn current_index(&self) -> u64 {
        self.current_index
    }

    /// Bucket of `action`.
    pub fn data(&self, action: Action) -> &ActionData {
        match action {
            Action::Submit => &self.submit,
            Action::Withdraw => &self.withdraw,
        }
    }

    fn data_mut(&mut self, action: Action) -> &mut ActionData {
        match action {
            Action::Submit => &mut self.submit,
            Action::Withdraw => &mut self.withdraw,
        }
    }

    /// Allowance left for `action` at `now`, or `None` when unlimited.
    pub fn daily_remaining(&self, action: Action, now: Timestamp) -> Option<Wei> {
        let data = self.data(action);
        if data.limit == 0 {
            return None;
        }
        let idx = day_index(now);
        if idx != self.current_index || idx != data.latest_index {
            Some(data.limit)
        } else {
            Some(data.remaining)
        }
    }

    /// Reject `amount` under the action's minimum.
    pub fn check_threshold(&self, action: Action, amount: Wei) -> Result<()> {
        let threshold = self.data(action).threshold;
        if threshold > 0 && amount < threshold {
            return Err(PoolError::BelowThreshold {
                action,
                amount,
                threshold,
            });
        }
        Ok(())
    }

    /// Charge `amount` against today's allowance for `action`.
    ///
    /// `lifetime` is the action's lifetime counter before this action.
    pub fn consume(&mut self, action: Action, amount: Wei, now: Timestamp, lifetime: Wei) -> Result<()> {
        if self.data(action).limit == 0 {
            return Ok(());
        }
        let idx = day_index(now);
        let new_day = idx != self.current_index;
        if new_day {
            self.current_index = idx;
        }

        let data = self.data_mut(action);
        let stale = idx != data.latest_index;
        if stale {
            data.accumulated = lifetime;
            data.latest_index = idx;
        }
        if new_day || stale {
            data.remaining = data.limit;
            debug!(%action, day = idx, limit = data.limit, "action limit reset");
        }

        data.remaining = data
            .remaining
            .checked_sub(amount)
            .ok_or(PoolError::LimitExceeded {
                action,
                requested: amount,
                remaining: data.remaining,
            })?;
        Ok(())
    }

    /// Change the daily limit of `action`.
    ///
    /// If the bucket is live today, what was already used today still
    /// counts against the new limit.
    pub fn set_limit(&mut self, action: Action, limit: Wei, now: Timestamp, lifetime: Wei) -> Result<()> {
        let idx = day_index(now);
        let live = idx == self.current_index;
        let data = self.data_mut(action);
        if data.limit == limit {
            return Err(PoolError::SameValue);
        }
        data.limit = limit;
        if live && data.latest_index == idx {
            let used_today = lifetime.saturating_sub(data.accumulated);
            data.remaining = limit.saturating_sub(used_today);
        }
        Ok(())
    }

    /// Change the minimum amount of `action`.
    pub fn set_threshold(&mut self, action: Action, threshold: Wei) -> Result<()> {
        let data = self.data_mut(action);
        if data.threshold == threshold {
            return Err(PoolError::SameValue);
        }
        data.threshold = threshold;
        Ok(())
    }
}
