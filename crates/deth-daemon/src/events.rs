//! Ledger event fan-out.
//!
//! Every committed transaction publishes its events on a broadcast channel.
//! Subscribers filter by event name or category and receive JSON-RPC
//! notifications; a slow subscriber loses the oldest events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use deth_types::{Address, LedgerEvent};

/// A ledger event with the transaction it came from.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Journal id of the transaction.
    pub tx_id: i64,
    /// RPC method that produced it.
    pub method: String,
    /// Calling account.
    pub sender: Address,
    /// Block time of the transaction.
    pub timestamp: u64,
    /// The event itself.
    pub event: LedgerEvent,
}

/// Subscription filter. Empty lists match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Event names, e.g. `"Submitted"`.
    #[serde(default)]
    pub names: Vec<String>,
    /// Categories: "pool" | "vault" | "oracle" | "admin".
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Broadcast bus.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// A bus buffering `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish to every subscriber.
    pub fn emit(&self, event: Event) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    /// A new receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Events published since start.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl EventFilter {
    /// Whether `event` passes the filter.
    pub fn matches(&self, event: &Event) -> bool {
        let name = event.event.name();
        if !self.names.is_empty() && !self.names.iter().any(|n| n == name) {
            return false;
        }
        if !self.categories.is_empty() {
            let category = categorize(&event.event);
            if !self.categories.iter().any(|c| c == category) {
                return false;
            }
        }
        true
    }
}

/// Category of a ledger event.
pub fn categorize(event: &LedgerEvent) -> &'static str {
    match event {
        LedgerEvent::Submitted { .. }
        | LedgerEvent::Withdrawn { .. }
        | LedgerEvent::WithdrawQueued { .. }
        | LedgerEvent::Claimed { .. }
        | LedgerEvent::StrategyDeposited { .. }
        | LedgerEvent::StrategyEarningReceived { .. }
        | LedgerEvent::StrategyMinted { .. }
        | LedgerEvent::StrategyReserveReleased { .. } => "pool",
        LedgerEvent::VaultDeposited { .. }
        | LedgerEvent::VaultWithdrawn { .. }
        | LedgerEvent::RewardRateUpdated { .. } => "vault",
        LedgerEvent::EpochRewardSubmitted { .. } | LedgerEvent::RewardSupplied { .. } => "oracle",
        LedgerEvent::StrategyChanged { .. }
        | LedgerEvent::ConfigChanged { .. }
        | LedgerEvent::RoleChanged { .. }
        | LedgerEvent::PauseChanged { .. }
        | LedgerEvent::OwnershipChanged { .. } => "admin",
    }
}
