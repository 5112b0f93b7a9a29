//! Strategy adapters.
//!
//! A strategy receives ETH drawn from the pool's strategy reserve and later
//! returns earnings through `receive_strategy_earning`. The pool only keeps
//! the addresses of allow-listed strategies; it talks to the adapter itself
//! through [`Strategy`].

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use tracing::debug;

use deth_types::{Address, Wei};

/// What the pool needs from a strategy adapter.
pub trait Strategy {
    /// The adapter's address.
    fn address(&self) -> Address;

    /// The pool this adapter is controlled by.
    fn core(&self) -> Address;

    /// Called after the pool has sent `amount` ETH to the adapter.
    fn receive_eth_from_core(&mut self, amount: Wei);
}

/// Ledger-side adapter that holds the ETH it is sent.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyAdapter {
    address: Address,
    core: Address,
    #[serde_as(as = "DisplayFromStr")]
    received_from_core: Wei,
}

impl StrategyAdapter {
    /// An adapter at `address` reporting `core` as its pool.
    pub fn new(address: Address, core: Address) -> Self {
        Self {
            address,
            core,
            received_from_core: 0,
        }
    }

    /// Lifetime ETH received from the pool.
    pub fn received_from_core(&self) -> Wei {
        self.received_from_core
    }
}

impl Strategy for StrategyAdapter {
    fn address(&self) -> Address {
        self.address
    }

    fn core(&self) -> Address {
        self.core
    }

    fn receive_eth_from_core(&mut self, amount: Wei) {
        self.received_from_core = self.received_from_core.saturating_add(amount);
        debug!(strategy = %self.address, amount, "strategy funded");
    }
}
