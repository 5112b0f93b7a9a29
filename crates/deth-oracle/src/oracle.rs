//! The epoch report state machine.
//!
//! ```text
//! last_epoch_id ──submit(start = last, epoch > last, epoch <= now)──▶ epoch_id
//! ```
//!
//! A report moves `last_epoch_id` forward and records the active validator
//! count it was checked against. Rejected reports leave both untouched, and
//! so does a report whose reward the sink refuses.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use deth_types::{AccessControl, Address, Role, Timestamp, Wei};

use crate::epoch::{current_epoch_id, epoch_timestamp, interest_rate_per_epoch};
use crate::{OracleError, Result, RewardSink};

/// Bounds a report must stay within.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleLimits {
    /// Highest 1e18-scaled interest per epoch.
    pub interest_rate_limit_per_epoch: Wei,
    /// Most validators that may activate per elapsed epoch.
    pub validator_limit_per_epoch: u64,
}

/// One manager report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochReport {
    /// Must equal the last accepted epoch.
    pub start_epoch_id: u64,
    /// Epoch the report runs up to.
    pub epoch_id: u64,
    /// Validators active at `epoch_id`.
    pub activated_validator_count: u64,
    /// Reward accrued since `start_epoch_id`.
    pub reward_increment: Wei,
}

/// Manager-driven reward oracle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardOracle {
    address: Address,
    access: AccessControl,
    limits: OracleLimits,
    zero_epoch_timestamp: Timestamp,
    last_epoch_id: u64,
    last_activated_validator_count: u64,
}

impl RewardOracle {
    /// Create an oracle whose epoch 0 starts at `zero_epoch_timestamp`.
    pub fn new(
        address: Address,
        owner: Address,
        zero_epoch_timestamp: Timestamp,
        limits: OracleLimits,
    ) -> Self {
        Self {
            address,
            access: AccessControl::new(owner),
            limits,
            zero_epoch_timestamp,
            last_epoch_id: 0,
            last_activated_validator_count: 0,
        }
    }

    /// The oracle's own address, as seen by the reward sink.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Access table.
    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    /// Mutable access table, for role and ownership administration.
    pub fn access_mut(&mut self) -> &mut AccessControl {
        &mut self.access
    }

    /// Configured bounds.
    pub fn limits(&self) -> OracleLimits {
        self.limits
    }

    /// Timestamp of epoch 0.
    pub fn zero_epoch_timestamp(&self) -> Timestamp {
        self.zero_epoch_timestamp
    }

    /// Last accepted epoch.
    pub fn last_epoch_id(&self) -> u64 {
        self.last_epoch_id
    }

    /// Validator count of the last accepted report.
    pub fn last_activated_validator_count(&self) -> u64 {
        self.last_activated_validator_count
    }

    /// Epoch containing `now`.
    pub fn current_epoch_id(&self, now: Timestamp) -> u64 {
        current_epoch_id(now, self.zero_epoch_timestamp)
    }

    /// Start time of `epoch_id`.
    pub fn epoch_timestamp(&self, epoch_id: u64) -> Result<Timestamp> {
        Ok(epoch_timestamp(epoch_id, self.zero_epoch_timestamp)?)
    }

    /// Accept a reward report and pass the reward to `sink`.
    ///
    /// # Errors
    ///
    /// Every bound violation has its own [`OracleError`] variant. A sink
    /// failure is returned as [`OracleError::SupplyFailed`] with the oracle
    /// state restored.
    pub fn submit_epoch_reward<S: RewardSink>(
        &mut self,
        caller: &Address,
        report: EpochReport,
        now: Timestamp,
        sink: &mut S,
    ) -> Result<()> {
        self.access.ensure_role(Role::Manager, caller)?;
        self.access.ensure_not_paused()?;
        if let Err(err) = self.check_report(&report, now) {
            warn!(
                %caller,
                start_epoch_id = report.start_epoch_id,
                epoch_id = report.epoch_id,
                activated_validator_count = report.activated_validator_count,
                reward_increment = report.reward_increment,
                error = %err,
                "epoch reward rejected"
            );
            return Err(err);
        }
        let EpochReport {
            epoch_id,
            activated_validator_count,
            reward_increment,
            ..
        } = report;

        let previous = (self.last_epoch_id, self.last_activated_validator_count);
        self.last_epoch_id = epoch_id;
        self.last_activated_validator_count = activated_validator_count;

        if let Err(err) = sink.supply_reward(&self.address, reward_increment, now) {
            (self.last_epoch_id, self.last_activated_validator_count) = previous;
            warn!(epoch_id, reward_increment, error = %err, "reward supply failed");
            return Err(OracleError::SupplyFailed(err.to_string()));
        }

        info!(
            %caller,
            epoch_id,
            activated_validator_count,
            reward_increment,
            "epoch reward accepted"
        );
        Ok(())
    }

    /// Set the per-epoch interest ceiling. Owner only.
    pub fn set_interest_rate_limit_per_epoch(&mut self, caller: &Address, limit: Wei) -> Result<()> {
        self.access.ensure_owner(caller)?;
        self.access.ensure_not_paused()?;
        if self.limits.interest_rate_limit_per_epoch == limit {
            return Err(OracleError::SameValue);
        }
        self.limits.interest_rate_limit_per_epoch = limit;
        info!(limit, "interest rate limit updated");
        Ok(())
    }

    /// Set the per-epoch validator activation limit. Owner only.
    pub fn set_validator_limit_per_epoch(&mut self, caller: &Address, limit: u64) -> Result<()> {
        self.access.ensure_owner(caller)?;
        self.access.ensure_not_paused()?;
        if self.limits.validator_limit_per_epoch == limit {
            return Err(OracleError::SameValue);
        }
        self.limits.validator_limit_per_epoch = limit;
        info!(limit, "validator limit updated");
        Ok(())
    }

    fn check_report(&self, report: &EpochReport, now: Timestamp) -> Result<()> {
        let EpochReport {
            start_epoch_id,
            epoch_id,
            activated_validator_count,
            reward_increment,
        } = *report;
        if activated_validator_count == 0 {
            return Err(OracleError::ZeroValidatorCount);
        }
        if start_epoch_id != self.last_epoch_id {
            return Err(OracleError::EpochMismatch {
                start_epoch_id,
                last_epoch_id: self.last_epoch_id,
            });
        }
        if epoch_id <= self.last_epoch_id {
            return Err(OracleError::EpochNotAdvanced {
                epoch_id,
                last_epoch_id: self.last_epoch_id,
            });
        }
        let current = self.current_epoch_id(now);
        if epoch_id > current {
            return Err(OracleError::EpochInFuture {
                epoch_id,
                current_epoch_id: current,
            });
        }

        let epoch_count = epoch_id - self.last_epoch_id;
        let validator_limit = u128::from(self.limits.validator_limit_per_epoch)
            * u128::from(epoch_count)
            + u128::from(self.last_activated_validator_count);
        if u128::from(activated_validator_count) > validator_limit {
            return Err(OracleError::ValidatorLimitExceeded {
                reported: activated_validator_count,
                limit: validator_limit,
            });
        }

        let rate = interest_rate_per_epoch(reward_increment, epoch_count, activated_validator_count)?;
        if rate > self.limits.interest_rate_limit_per_epoch {
            return Err(OracleError::InterestRateExceeded {
                rate,
                limit: self.limits.interest_rate_limit_per_epoch,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deth_types::{AccessError, ONE_ETHER, SECONDS_PER_EPOCH};
    use proptest::prelude::*;

    const GENESIS: u64 = 1_606_824_023;

    #[derive(Debug, thiserror::Error)]
    #[error("sink refused")]
    struct Refused;

    #[derive(Default)]
    struct RecordingSink {
        supplied: Vec<Wei>,
        refuse: bool,
    }

    impl RewardSink for RecordingSink {
        type Error = Refused;

        fn supply_reward(&mut self, _oracle: &Address, amount: Wei, _now: Timestamp) -> std::result::Result<(), Refused> {
            if self.refuse {
                return Err(Refused);
            }
            self.supplied.push(amount);
            Ok(())
        }
    }

    fn owner() -> Address {
        Address::derive("owner")
    }

    fn reporter() -> Address {
        Address::derive("reporter")
    }

    fn oracle() -> RewardOracle {
        let mut oracle = RewardOracle::new(
            Address::derive("deth.oracle"),
            owner(),
            GENESIS,
            OracleLimits {
                // 0.01% per epoch
                interest_rate_limit_per_epoch: ONE_ETHER / 10_000,
                validator_limit_per_epoch: 100,
            },
        );
        oracle
            .access_mut()
            .grant(&owner(), Role::Manager, reporter())
            .expect("grant");
        oracle
    }

    fn report(start: u64, epoch: u64, count: u64, reward: Wei) -> EpochReport {
        EpochReport {
            start_epoch_id: start,
            epoch_id: epoch,
            activated_validator_count: count,
            reward_increment: reward,
        }
    }

    fn at_epoch(epoch: u64) -> Timestamp {
        GENESIS + epoch * SECONDS_PER_EPOCH
    }

    #[test]
    fn test_accepts_report_and_supplies() {
        let mut oracle = oracle();
        let mut sink = RecordingSink::default();
        oracle
            .submit_epoch_reward(&reporter(), report(0, 10, 50, ONE_ETHER / 100), at_epoch(10), &mut sink)
            .expect("submit");
        assert_eq!(oracle.last_epoch_id(), 10);
        assert_eq!(oracle.last_activated_validator_count(), 50);
        assert_eq!(sink.supplied, vec![ONE_ETHER / 100]);
    }

    #[test]
    fn test_non_manager_rejected() {
        let mut oracle = oracle();
        let mut sink = RecordingSink::default();
        let err = oracle
            .submit_epoch_reward(&owner(), report(0, 1, 1, 0), at_epoch(1), &mut sink)
            .expect_err("not manager");
        assert!(matches!(err, OracleError::Access(AccessError::MissingRole { .. })));
    }

    #[test]
    fn test_zero_validators_rejected() {
        let mut oracle = oracle();
        let mut sink = RecordingSink::default();
        assert_eq!(
            oracle.submit_epoch_reward(&reporter(), report(0, 1, 0, 0), at_epoch(1), &mut sink),
            Err(OracleError::ZeroValidatorCount)
        );
    }

    #[test]
    fn test_start_epoch_must_match() {
        let mut oracle = oracle();
        let mut sink = RecordingSink::default();
        assert_eq!(
            oracle.submit_epoch_reward(&reporter(), report(1, 2, 1, 0), at_epoch(2), &mut sink),
            Err(OracleError::EpochMismatch {
                start_epoch_id: 1,
                last_epoch_id: 0
            })
        );
    }

    #[test]
    fn test_future_epoch_rejected() {
        let mut oracle = oracle();
        let mut sink = RecordingSink::default();
        assert_eq!(
            oracle.submit_epoch_reward(&reporter(), report(0, 6, 1, 0), at_epoch(5), &mut sink),
            Err(OracleError::EpochInFuture {
                epoch_id: 6,
                current_epoch_id: 5
            })
        );
    }

    #[test]
    fn test_validator_limit_accumulates_from_last_count() {
        let mut oracle = oracle();
        let mut sink = RecordingSink::default();
        oracle
            .submit_epoch_reward(&reporter(), report(0, 2, 200, 0), at_epoch(2), &mut sink)
            .expect("exactly at limit");

        // One more epoch allows 100 more on top of the 200 already active.
        let err = oracle
            .submit_epoch_reward(&reporter(), report(2, 3, 301, 0), at_epoch(3), &mut sink)
            .expect_err("overshoot");
        assert_eq!(
            err,
            OracleError::ValidatorLimitExceeded {
                reported: 301,
                limit: 300
            }
        );
        oracle
            .submit_epoch_reward(&reporter(), report(2, 3, 300, 0), at_epoch(3), &mut sink)
            .expect("at limit");
    }

    #[test]
    fn test_interest_rate_limit() {
        let mut oracle = oracle();
        let mut sink = RecordingSink::default();
        // 10 validators for 1 epoch: 320 ETH principal; 0.01% is 0.032 ETH.
        let at_limit = 32 * ONE_ETHER / 1_000;
        let err = oracle
            .submit_epoch_reward(&reporter(), report(0, 1, 10, at_limit + 1), at_epoch(1), &mut sink)
            .expect_err("one wei over");
        assert!(matches!(err, OracleError::InterestRateExceeded { .. }));

        oracle
            .submit_epoch_reward(&reporter(), report(0, 1, 10, at_limit), at_epoch(1), &mut sink)
            .expect("at limit");
    }

    #[test]
    fn test_sink_failure_restores_state() {
        let mut oracle = oracle();
        let mut sink = RecordingSink {
            refuse: true,
            ..RecordingSink::default()
        };
        let err = oracle
            .submit_epoch_reward(&reporter(), report(0, 1, 1, 0), at_epoch(1), &mut sink)
            .expect_err("sink refuses");
        assert_eq!(err, OracleError::SupplyFailed("sink refused".to_string()));
        assert_eq!(oracle.last_epoch_id(), 0);
        assert_eq!(oracle.last_activated_validator_count(), 0);
    }

    #[test]
    fn test_paused_oracle_rejects() {
        let mut oracle = oracle();
        let guardian = Address::derive("guardian");
        oracle
            .access_mut()
            .grant(&owner(), Role::PauseGuardian, guardian)
            .expect("grant");
        oracle.access_mut().pause(&guardian).expect("pause");
        let mut sink = RecordingSink::default();
        assert_eq!(
            oracle.submit_epoch_reward(&reporter(), report(0, 1, 1, 0), at_epoch(1), &mut sink),
            Err(OracleError::Access(AccessError::Paused))
        );
    }

    #[test]
    fn test_setters() {
        let mut oracle = oracle();
        assert_eq!(
            oracle.set_validator_limit_per_epoch(&owner(), 100),
            Err(OracleError::SameValue)
        );
        oracle
            .set_validator_limit_per_epoch(&owner(), 5)
            .expect("set");
        oracle
            .set_interest_rate_limit_per_epoch(&owner(), ONE_ETHER)
            .expect("set");
        assert_eq!(oracle.limits().validator_limit_per_epoch, 5);
        assert!(oracle
            .set_interest_rate_limit_per_epoch(&reporter(), 1)
            .is_err());
    }

    proptest! {
        #[test]
        fn prop_stale_epoch_always_rejected(
            last in 1u64..1_000,
            back in 0u64..1_000,
            reward in 0u128..1_000 * ONE_ETHER,
        ) {
            let mut oracle = oracle();
            let mut sink = RecordingSink::default();
            oracle
                .submit_epoch_reward(&reporter(), report(0, last, 1, 0), at_epoch(last), &mut sink)
                .expect("advance");
            let epoch = last.saturating_sub(back);
            let result = oracle.submit_epoch_reward(&reporter(), report(last, epoch, 1, reward), at_epoch(last + 10), &mut sink);
            prop_assert!(result.is_err());
            prop_assert_eq!(oracle.last_epoch_id(), last);
        }

        #[test]
        fn prop_validator_overshoot_always_rejected(
            epochs in 1u64..50,
            extra in 1u64..1_000,
            reward in 0u128..1_000 * ONE_ETHER,
        ) {
            let mut oracle = oracle();
            let mut sink = RecordingSink::default();
            let count = 100 * epochs + extra;
            let result = oracle.submit_epoch_reward(&reporter(), report(0, epochs, count, reward), at_epoch(epochs), &mut sink);
            let is_overshoot = matches!(result, Err(OracleError::ValidatorLimitExceeded { .. }));
            prop_assert!(is_overshoot);
        }
    }
}
