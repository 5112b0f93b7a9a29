//! # deth-integration-tests
//!
//! End-to-end flows across token, vault, oracle, pool and storage.
//!
//! The library half is a [`Harness`]: a genesis ledger with funded actors,
//! an allow-listed strategy and a clock, plus the ledger-wide accounting
//! checks the tests assert after every step.
//!
//! ```sh
//! cargo test -p deth-integration-tests
//! ```

use deth_oracle::EpochReport;
use deth_pool::{Protocol, ProtocolConfig, Receipt, RewardSplit};
use deth_types::{Address, Timestamp, TxContext, Wei, ONE_ETHER, WAD};

/// Day-aligned genesis time; also the start of epoch 0.
pub const START: Timestamp = 1_700_006_400;

/// Native ETH every actor and the strategy start with.
pub const INITIAL_ETH: Wei = 1_000 * ONE_ETHER;

/// Validators reported once the first report is in.
pub const VALIDATORS: u64 = 100;

pub fn owner() -> Address {
    Address::derive("it.owner")
}

pub fn treasury() -> Address {
    Address::derive("it.treasury")
}

pub fn reporter() -> Address {
    Address::derive("it.reporter")
}

pub fn guardian() -> Address {
    Address::derive("it.guardian")
}

pub fn strategy() -> Address {
    Address::derive("it.strategy")
}

/// Genesis parameters with the given reserve and treasury ratios.
pub fn config(reserve_ratio: Wei, treasury_ratio: Wei) -> ProtocolConfig {
    ProtocolConfig {
        owner: owner(),
        treasury: treasury(),
        reserve_ratio,
        treasury_ratio,
        zero_epoch_timestamp: START,
        interest_rate_limit_per_epoch: WAD / 1_000,
        validator_limit_per_epoch: VALIDATORS,
        oracle_managers: vec![reporter()],
        pause_guardians: vec![guardian()],
        ..ProtocolConfig::default()
    }
}

/// A ledger under test.
#[derive(Debug, Clone)]
pub struct Harness {
    pub protocol: Protocol,
    pub now: Timestamp,
    pub actors: Vec<Address>,
}

impl Harness {
    /// Genesis with `actor_count` funded actors and a live strategy.
    pub fn new(actor_count: usize, reserve_ratio: Wei, treasury_ratio: Wei) -> deth_pool::Result<Self> {
        let mut protocol = Protocol::genesis(&config(reserve_ratio, treasury_ratio), START)?;
        let actors: Vec<Address> = (0..actor_count)
            .map(|i| Address::derive(&format!("it.actor.{i}")))
            .collect();
        for actor in &actors {
            protocol.fund_native(actor, INITIAL_ETH)?;
        }
        protocol.fund_native(&strategy(), INITIAL_ETH)?;

        let ctx = TxContext::new(owner(), START);
        let pool = protocol.pool().address();
        protocol.deploy_strategy(&ctx, strategy(), pool)?;
        protocol.add_strategy(&ctx, strategy())?;
        Ok(Self {
            protocol,
            now: START,
            actors,
        })
    }

    pub fn actor(&self, index: usize) -> Address {
        self.actors[index % self.actors.len()]
    }

    /// Context for `sender` at the current time.
    pub fn tx(&self, sender: Address) -> TxContext {
        TxContext::new(sender, self.now)
    }

    pub fn advance(&mut self, seconds: u64) {
        self.now += seconds;
    }

    /// Move the clock to the start of `epochs` epochs past the last report
    /// and report `reward` for them.
    pub fn report_reward(&mut self, epochs: u64, reward: Wei) -> deth_pool::Result<Receipt<RewardSplit>> {
        let oracle = self.protocol.oracle();
        let start_epoch_id = oracle.last_epoch_id();
        let epoch_id = start_epoch_id + epochs;
        let due = oracle.epoch_timestamp(epoch_id)?;
        self.now = self.now.max(due);
        let report = EpochReport {
            start_epoch_id,
            epoch_id,
            activated_validator_count: VALIDATORS,
            reward_increment: reward,
        };
        let ctx = self.tx(reporter());
        self.protocol.submit_epoch_reward(&ctx, report)
    }

    /// Everyone that can hold dETH in these flows.
    pub fn holders(&self) -> Vec<Address> {
        let mut holders = self.actors.clone();
        holders.extend([
            treasury(),
            strategy(),
            self.protocol.pool().address(),
            self.protocol.vault().address(),
        ]);
        holders
    }

    /// Ledger-wide accounting checks. Returns the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        let p = &self.protocol;
        let pool = p.pool();
        let pool_address = pool.address();

        let native_total = p.native().total();
        let expected_native = INITIAL_ETH * (self.actors.len() as Wei + 1);
        if native_total != expected_native {
            return Err(format!("native total {native_total} != {expected_native}"));
        }

        let holders = self.holders();
        let held: Wei = holders.iter().map(|a| p.token().balance_of(a)).sum();
        if held != p.token().total_supply() {
            return Err(format!("dETH held {held} != supply {}", p.token().total_supply()));
        }

        let queue = pool.queue();
        let queued: Wei = queue.entries().map(|e| e.amount).sum();
        if queued != queue.pending() {
            return Err(format!("queue sum {queued} != pending {}", queue.pending()));
        }
        let mut previous = (0u64, 0 as Wei);
        for entry in queue.entries() {
            if entry.queue_id <= previous.0 || entry.accumulated_threshold <= previous.1 {
                return Err(format!("queue out of order at {}", entry.queue_id));
            }
            previous = (entry.queue_id, entry.accumulated_threshold);
        }
        if queue.accumulated() < previous.1 {
            return Err("accumulated below last threshold".to_string());
        }

        let balance = p.native().balance_of(&pool_address);
        let claimable: Wei = self.actors.iter().map(|a| p.claimable_amount(a)).sum();
        let committed = pool.strategy_reserve().saturating_add(claimable);
        if committed > balance {
            return Err(format!(
                "reserve {} + claimable {claimable} exceeds pool balance {balance}",
                pool.strategy_reserve()
            ));
        }

        let vault_balance = p.token().balance_of(&p.vault().address());
        let total_assets = p
            .vault()
            .total_assets_at(self.now)
            .map_err(|e| e.to_string())?;
        if total_assets > vault_balance {
            return Err(format!("vault assets {total_assets} exceed its dETH {vault_balance}"));
        }
        if p.vault().stored_total_assets() > total_assets {
            return Err("stored vault assets ahead of streamed assets".to_string());
        }
        Ok(())
    }
}
