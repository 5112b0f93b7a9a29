//! Native ETH balances of every account the ledger knows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use deth_types::{Address, MathError, Wei};

use crate::{PoolError, Result};

/// `address -> wei`. Zero balances are not stored.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeLedger {
    #[serde_as(as = "BTreeMap<_, DisplayFromStr>")]
    #[serde(default)]
    balances: BTreeMap<Address, Wei>,
}

impl NativeLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// ETH held by `account`.
    pub fn balance_of(&self, account: &Address) -> Wei {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Sum of all balances.
    pub fn total(&self) -> Wei {
        self.balances.values().sum()
    }

    /// Credit `amount` from outside the ledger (faucet, genesis funding).
    pub fn fund(&mut self, account: &Address, amount: Wei) -> Result<()> {
        if account.is_zero() {
            return Err(PoolError::ZeroAddress);
        }
        if amount == 0 {
            return Ok(());
        }
        let balance = self.balances.entry(*account).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(MathError::Overflow)?;
        Ok(())
    }

    /// Move `amount` from `from` to `to`.
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: Wei) -> Result<()> {
        if to.is_zero() {
            return Err(PoolError::ZeroAddress);
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(PoolError::InsufficientEth {
                account: *from,
                required: amount,
                available,
            });
        }
        if amount == 0 || from == to {
            return Ok(());
        }
        let remaining = available - amount;
        if remaining == 0 {
            self.balances.remove(from);
        } else {
            self.balances.insert(*from, remaining);
        }
        self.fund(to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer() {
        let alice = Address::derive("alice");
        let pool = Address::derive("deth.pool");
        let mut native = NativeLedger::new();
        native.fund(&alice, 10).expect("fund");
        native.transfer(&alice, &pool, 4).expect("transfer");
        assert_eq!(native.balance_of(&alice), 6);
        assert_eq!(native.balance_of(&pool), 4);
        assert_eq!(native.total(), 10);

        assert_eq!(
            native.transfer(&alice, &pool, 7),
            Err(PoolError::InsufficientEth {
                account: alice,
                required: 7,
                available: 6
            })
        );
    }

    #[test]
    fn test_amounts_serialize_as_strings() {
        let mut native = NativeLedger::new();
        native
            .fund(&Address::derive("whale"), u128::MAX)
            .expect("fund");
        let json = serde_json::to_string(&native).expect("serialize");
        assert!(json.contains(&u128::MAX.to_string()));
        let back: NativeLedger = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, native);
    }
}
