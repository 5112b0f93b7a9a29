//! Ledger-wide accounting under random operation sequences.
//!
//! Every step either succeeds or leaves the ledger exactly as it was, and
//! the checks in `Harness::check_invariants` hold after each step.

use proptest::prelude::*;

use deth_integration_tests::{owner, strategy, Harness};
use deth_pool::{PoolError, WithdrawOutcome};
use deth_types::{Wei, ONE_ETHER, WAD};

#[derive(Debug, Clone)]
enum Op {
    Submit { actor: usize, milli_eth: u64 },
    SubmitAndStake { actor: usize, milli_eth: u64 },
    Withdraw { actor: usize, percent: u8 },
    Stake { actor: usize, percent: u8 },
    Redeem { actor: usize, percent: u8 },
    RedeemAndWithdraw { actor: usize, percent: u8 },
    Claim { actor: usize },
    StrategyMint { actor: usize, milli_eth: u64 },
    StrategyDeposit { percent: u8 },
    StrategyEarning { milli_eth: u64 },
    ReleaseReserve { percent: u8 },
    Reward { epochs: u64, milli_eth: u64 },
    Wait { seconds: u64 },
}

fn op() -> impl Strategy<Value = Op> {
    let actor = 0usize..4;
    let percent = 0u8..=100;
    prop_oneof![
        3 => (actor.clone(), 1u64..5_000).prop_map(|(actor, milli_eth)| Op::Submit { actor, milli_eth }),
        2 => (actor.clone(), 1u64..5_000).prop_map(|(actor, milli_eth)| Op::SubmitAndStake { actor, milli_eth }),
        3 => (actor.clone(), percent.clone()).prop_map(|(actor, percent)| Op::Withdraw { actor, percent }),
        2 => (actor.clone(), percent.clone()).prop_map(|(actor, percent)| Op::Stake { actor, percent }),
        2 => (actor.clone(), percent.clone()).prop_map(|(actor, percent)| Op::Redeem { actor, percent }),
        1 => (actor.clone(), percent.clone()).prop_map(|(actor, percent)| Op::RedeemAndWithdraw { actor, percent }),
        3 => actor.clone().prop_map(|actor| Op::Claim { actor }),
        1 => (actor, 1u64..3_000).prop_map(|(actor, milli_eth)| Op::StrategyMint { actor, milli_eth }),
        1 => percent.clone().prop_map(|percent| Op::StrategyDeposit { percent }),
        1 => (1u64..3_000).prop_map(|milli_eth| Op::StrategyEarning { milli_eth }),
        1 => percent.prop_map(|percent| Op::ReleaseReserve { percent }),
        2 => (1u64..20, 0u64..1_000).prop_map(|(epochs, milli_eth)| Op::Reward { epochs, milli_eth }),
        2 => (1u64..200_000).prop_map(|seconds| Op::Wait { seconds }),
    ]
}

fn milli(milli_eth: u64) -> Wei {
    Wei::from(milli_eth) * ONE_ETHER / 1_000
}

fn share(amount: Wei, percent: u8) -> Wei {
    amount * Wei::from(percent) / 100
}

/// Apply one operation. The error, if any, is returned for inspection.
fn apply(h: &mut Harness, op: &Op) -> Result<(), PoolError> {
    let p = &mut h.protocol;
    match *op {
        Op::Submit { actor, milli_eth } => {
            let who = h.actors[actor % h.actors.len()];
            p.submit(&deth_types::TxContext::new(who, h.now).with_value(milli(milli_eth)), &who)
                .map(drop)
        }
        Op::SubmitAndStake { actor, milli_eth } => {
            let who = h.actors[actor % h.actors.len()];
            p.submit_and_stake(&deth_types::TxContext::new(who, h.now).with_value(milli(milli_eth)), &who)
                .map(drop)
        }
        Op::Withdraw { actor, percent } => {
            let who = h.actors[actor % h.actors.len()];
            let amount = share(p.token().balance_of(&who), percent);
            p.withdraw(&deth_types::TxContext::new(who, h.now), amount, &who).map(drop)
        }
        Op::Stake { actor, percent } => {
            let who = h.actors[actor % h.actors.len()];
            let amount = share(p.token().balance_of(&who), percent);
            p.vault_deposit(&deth_types::TxContext::new(who, h.now), amount, &who).map(drop)
        }
        Op::Redeem { actor, percent } => {
            let who = h.actors[actor % h.actors.len()];
            let shares = share(p.vault().shares_of(&who), percent);
            p.vault_redeem(&deth_types::TxContext::new(who, h.now), shares, &who, &who).map(drop)
        }
        Op::RedeemAndWithdraw { actor, percent } => {
            let who = h.actors[actor % h.actors.len()];
            let shares = share(p.vault().shares_of(&who), percent);
            p.redeem_and_withdraw(&deth_types::TxContext::new(who, h.now), shares, &who)
                .map(drop)
        }
        Op::Claim { actor } => {
            let who = h.actors[actor % h.actors.len()];
            p.claim(&deth_types::TxContext::new(who, h.now)).map(drop)
        }
        Op::StrategyMint { actor, milli_eth } => {
            let who = h.actors[actor % h.actors.len()];
            p.strategy_minting(&deth_types::TxContext::new(strategy(), h.now), &who, milli(milli_eth))
                .map(drop)
        }
        Op::StrategyDeposit { percent } => {
            let amount = share(p.pool().strategy_reserve(), percent);
            p.deposit_into_strategy(&deth_types::TxContext::new(owner(), h.now), strategy(), amount)
                .map(drop)
        }
        Op::StrategyEarning { milli_eth } => p
            .receive_strategy_earning(&deth_types::TxContext::new(strategy(), h.now).with_value(milli(milli_eth)))
            .map(drop),
        Op::ReleaseReserve { percent } => {
            let amount = share(p.pool().strategy_reserve(), percent);
            p.release_strategy_reserve(&deth_types::TxContext::new(owner(), h.now), amount)
                .map(drop)
        }
        Op::Reward { epochs, milli_eth } => h.report_reward(epochs, milli(milli_eth) * Wei::from(epochs)).map(drop),
        Op::Wait { seconds } => {
            h.advance(seconds);
            Ok(())
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_accounting_holds_across_sequences(
        reserve_percent in 0u64..=30,
        treasury_percent in 0u64..=100,
        ops in prop::collection::vec(op(), 1..60),
    ) {
        let reserve_ratio = WAD / 100 * Wei::from(reserve_percent);
        let treasury_ratio = WAD / 100 * Wei::from(treasury_percent);
        let mut h = Harness::new(4, reserve_ratio, treasury_ratio).expect("harness");
        prop_assert_eq!(h.check_invariants(), Ok(()));

        for op in &ops {
            let before = h.protocol.clone();
            let result = apply(&mut h, op);
            if let Err(err) = &result {
                prop_assert_eq!(&h.protocol, &before, "{:?} failed with {} but changed state", op, err);
                let overdrawn = matches!(err, PoolError::InsufficientEth { .. });
                prop_assert!(!overdrawn || !matches!(op, Op::Claim { .. }), "claim overdrew the pool: {}", err);
            }
            if let Err(violation) = h.check_invariants() {
                return Err(TestCaseError::fail(format!("after {op:?}: {violation}")));
            }
        }
    }

    #[test]
    fn prop_fifo_claims_follow_queue_order(
        amounts in prop::collection::vec(1u64..2_000, 2..8),
        refill in 1u64..20_000,
    ) {
        // Strategy-minted dETH has no ETH behind it, so every withdrawal queues.
        let mut h = Harness::new(4, 0, 0).expect("harness");
        let mut queued = Vec::new();
        for (i, amount) in amounts.iter().enumerate() {
            let who = h.actor(i);
            let amount = milli(*amount);
            let ctx = h.tx(strategy());
            h.protocol.strategy_minting(&ctx, &who, amount).expect("mint");
            let ctx = h.tx(who);
            let outcome = h.protocol.withdraw(&ctx, amount, &who).expect("withdraw").value;
            let queued_entry = matches!(outcome, WithdrawOutcome::Queued(_));
            prop_assert!(queued_entry);
            queued.push((who, amount));
        }

        let refill = milli(refill);
        let funder = h.actor(0);
        let ctx = h.tx(funder).with_value(refill);
        h.protocol.submit(&ctx, &funder).expect("submit");

        // Entries are eligible exactly while their running total is covered.
        let mut running: Wei = 0;
        for (i, (who, amount)) in queued.iter().enumerate() {
            running += amount;
            let entry = h.protocol.pool().queue().entry(i as u64 + 1).copied().expect("entry");
            prop_assert_eq!(entry.accumulated_threshold, running);
            prop_assert_eq!(entry.receiver, *who);
            let covered = running <= refill;
            let eligible = h.protocol.pool().queue().eligible(who, h.protocol.pool().claimable(h.protocol.native()));
            prop_assert_eq!(eligible.contains(&entry.queue_id), covered);
        }
        prop_assert_eq!(h.check_invariants(), Ok(()));
    }

    #[test]
    fn prop_daily_submit_limit(
        limit_eth in 1u64..50,
        submits in prop::collection::vec(1u64..20, 1..12),
    ) {
        let mut h = Harness::new(2, 0, WAD / 10).expect("harness");
        let limit = Wei::from(limit_eth) * ONE_ETHER;
        let ctx = h.tx(owner());
        h.protocol.set_action_limit(&ctx, deth_pool::Action::Submit, limit).expect("limit");

        let mut used: Wei = 0;
        for eth in submits {
            let amount = Wei::from(eth) * ONE_ETHER;
            let who = h.actor(0);
            let ctx = h.tx(who).with_value(amount);
            let accepted = h.protocol.submit(&ctx, &who).is_ok();
            prop_assert_eq!(accepted, used + amount <= limit);
            if accepted {
                used += amount;
            }
            h.advance(600);
        }

        // The next day starts with a fresh allowance.
        h.now = (h.now / 86_400 + 1) * 86_400;
        prop_assert_eq!(h.protocol.daily_remaining(deth_pool::Action::Submit, h.now), Some(limit));
    }
}
