//! Per-transaction execution context.

use serde::{Deserialize, Serialize};

use crate::{Address, Timestamp, Wei};

/// Who is calling, with how much attached ETH, at what block time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxContext {
    /// The calling account.
    pub sender: Address,
    /// Native value attached to the call.
    pub value: Wei,
    /// Block timestamp in seconds.
    pub timestamp: Timestamp,
}

impl TxContext {
    /// A call without attached value.
    pub fn new(sender: Address, timestamp: Timestamp) -> Self {
        Self {
            sender,
            value: 0,
            timestamp,
        }
    }

    /// Attach native value to the call.
    pub fn with_value(mut self, value: Wei) -> Self {
        self.value = value;
        self
    }
}
