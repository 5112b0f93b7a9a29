//! Balance and allowance bookkeeping shared by dETH and sdETH shares.
//!
//! The ledger keeps `sum(balances) == total_supply` by construction: every
//! mutation that changes a balance changes either another balance or the
//! supply by the same amount. Zero balances are dropped from the map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use deth_types::{Address, MathError, Wei};

use crate::{Result, TokenError};

/// Balances, allowances and total supply of one fungible token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLedger {
    total_supply: Wei,
    #[serde(default)]
    balances: BTreeMap<Address, Wei>,
    #[serde(default)]
    allowances: BTreeMap<Address, BTreeMap<Address, Wei>>,
}

impl TokenLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total outstanding supply.
    pub fn total_supply(&self) -> Wei {
        self.total_supply
    }

    /// Balance of `account`.
    pub fn balance_of(&self, account: &Address) -> Wei {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Remaining amount `spender` may move on behalf of `owner`.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Wei {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Number of accounts with a non-zero balance.
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Create `amount` new units owned by `to`.
    pub fn mint(&mut self, to: &Address, amount: Wei) -> Result<()> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(MathError::Overflow)?;
        self.credit(to, amount)?;
        self.total_supply = supply;
        Ok(())
    }

    /// Destroy `amount` units owned by `from`.
    pub fn burn(&mut self, from: &Address, amount: Wei) -> Result<()> {
        self.debit(from, amount)?;
        self.total_supply = self
            .total_supply
            .checked_sub(amount)
            .ok_or(MathError::Underflow)?;
        Ok(())
    }

    /// Move `amount` from `from` to `to`.
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: Wei) -> Result<()> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    /// Set the allowance of `spender` over `owner`'s balance.
    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: Wei) -> Result<()> {
        if spender.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let spenders = self.allowances.entry(*owner).or_default();
        if amount == 0 {
            spenders.remove(spender);
            if spenders.is_empty() {
                self.allowances.remove(owner);
            }
        } else {
            spenders.insert(*spender, amount);
        }
        Ok(())
    }

    /// Consume `amount` of `spender`'s allowance over `owner`.
    ///
    /// An allowance of `Wei::MAX` is treated as unlimited and never
    /// decreases.
    pub fn spend_allowance(&mut self, owner: &Address, spender: &Address, amount: Wei) -> Result<()> {
        let current = self.allowance(owner, spender);
        if current == Wei::MAX {
            return Ok(());
        }
        if current < amount {
            return Err(TokenError::InsufficientAllowance {
                owner: *owner,
                spender: *spender,
                required: amount,
                available: current,
            });
        }
        self.approve(owner, spender, current - amount)
    }

    fn credit(&mut self, account: &Address, amount: Wei) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self.balances.entry(*account).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(MathError::Overflow)?;
        Ok(())
    }

    fn debit(&mut self, account: &Address, amount: Wei) -> Result<()> {
        let available = self.balance_of(account);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                account: *account,
                required: amount,
                available,
            });
        }
        let remaining = available - amount;
        if remaining == 0 {
            self.balances.remove(account);
        } else {
            self.balances.insert(*account, remaining);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::derive("alice")
    }

    fn bob() -> Address {
        Address::derive("bob")
    }

    #[test]
    fn test_mint_burn_supply() {
        let mut ledger = TokenLedger::new();
        ledger.mint(&alice(), 100).expect("mint");
        ledger.mint(&bob(), 50).expect("mint");
        assert_eq!(ledger.total_supply(), 150);

        ledger.burn(&alice(), 40).expect("burn");
        assert_eq!(ledger.balance_of(&alice()), 60);
        assert_eq!(ledger.total_supply(), 110);
        assert_eq!(ledger.holder_count(), 2);
    }

    #[test]
    fn test_burn_more_than_balance() {
        let mut ledger = TokenLedger::new();
        ledger.mint(&alice(), 10).expect("mint");
        let err = ledger.burn(&alice(), 11).expect_err("insufficient");
        assert!(matches!(
            err,
            TokenError::InsufficientBalance {
                required: 11,
                available: 10,
                ..
            }
        ));
        assert_eq!(ledger.total_supply(), 10);
    }

    #[test]
    fn test_transfer_drops_empty_balances() {
        let mut ledger = TokenLedger::new();
        ledger.mint(&alice(), 10).expect("mint");
        ledger.transfer(&alice(), &bob(), 10).expect("transfer");
        assert_eq!(ledger.balance_of(&alice()), 0);
        assert_eq!(ledger.balance_of(&bob()), 10);
        assert_eq!(ledger.holder_count(), 1);
    }

    #[test]
    fn test_mint_to_zero_address() {
        let mut ledger = TokenLedger::new();
        assert_eq!(
            ledger.mint(&Address::ZERO, 1),
            Err(TokenError::ZeroAddress)
        );
    }

    #[test]
    fn test_allowance_spend() {
        let mut ledger = TokenLedger::new();
        ledger.approve(&alice(), &bob(), 30).expect("approve");
        ledger.spend_allowance(&alice(), &bob(), 20).expect("spend");
        assert_eq!(ledger.allowance(&alice(), &bob()), 10);

        let err = ledger
            .spend_allowance(&alice(), &bob(), 11)
            .expect_err("over allowance");
        assert!(matches!(err, TokenError::InsufficientAllowance { .. }));
    }

    #[test]
    fn test_unlimited_allowance() {
        let mut ledger = TokenLedger::new();
        ledger.approve(&alice(), &bob(), Wei::MAX).expect("approve");
        ledger
            .spend_allowance(&alice(), &bob(), 1_000)
            .expect("spend");
        assert_eq!(ledger.allowance(&alice(), &bob()), Wei::MAX);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut ledger = TokenLedger::new();
        ledger.mint(&alice(), 7).expect("mint");
        ledger.approve(&alice(), &bob(), 3).expect("approve");
        let json = serde_json::to_string(&ledger).expect("serialize");
        let back: TokenLedger = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, ledger);
    }
}
