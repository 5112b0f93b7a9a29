//! The dETH receipt token.
//!
//! Supply changes come from two kinds of principals:
//!
//! - **Managers** (the core pool) mint and burn without limit.
//! - **Minters** (external bridges) mint up to a per-minter cap set by the
//!   owner. `minted <= cap` holds after every operation; burning through
//!   [`RebasingToken::minter_burn`] frees cap again.
//!
//! Every mutating entry point is blocked while the token is paused.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use deth_types::{AccessControl, Address, Role, Wei};

use crate::{Result, TokenError, TokenLedger};

/// Cap and usage of one external minter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinterAllowance {
    /// Maximum outstanding amount the minter may have minted.
    pub cap: Wei,
    /// Amount currently minted and not yet burned back.
    pub minted: Wei,
}

/// Access-controlled, pausable receipt token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebasingToken {
    name: String,
    symbol: String,
    address: Address,
    ledger: TokenLedger,
    access: AccessControl,
    #[serde(default)]
    minters: BTreeMap<Address, MinterAllowance>,
}

impl RebasingToken {
    /// Create an empty token owned by `owner`.
    pub fn new(name: &str, symbol: &str, address: Address, owner: Address) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            address,
            ledger: TokenLedger::new(),
            access: AccessControl::new(owner),
            minters: BTreeMap::new(),
        }
    }

    /// Token name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Token symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The token's own address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Access table (owner, managers, pause guardians, pause flag).
    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    /// Mutable access table, for role and ownership administration.
    pub fn access_mut(&mut self) -> &mut AccessControl {
        &mut self.access
    }

    /// Total outstanding supply.
    pub fn total_supply(&self) -> Wei {
        self.ledger.total_supply()
    }

    /// Balance of `account`.
    pub fn balance_of(&self, account: &Address) -> Wei {
        self.ledger.balance_of(account)
    }

    /// Allowance of `spender` over `owner`.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Wei {
        self.ledger.allowance(owner, spender)
    }

    /// Cap and usage of `minter`.
    pub fn minter_allowance(&self, minter: &Address) -> MinterAllowance {
        self.minters.get(minter).copied().unwrap_or_default()
    }

    /// Mint `amount` to `to`. Managers only.
    pub fn mint(&mut self, caller: &Address, to: &Address, amount: Wei) -> Result<()> {
        self.access.ensure_not_paused()?;
        self.access.ensure_role(Role::Manager, caller)?;
        if amount == 0 {
            return Err(TokenError::ZeroAmount);
        }
        self.ledger.mint(to, amount)?;
        debug!(%to, amount, supply = self.total_supply(), "dETH minted");
        Ok(())
    }

    /// Burn `amount` from `from`. Managers only; no allowance is consumed.
    pub fn burn_from(&mut self, caller: &Address, from: &Address, amount: Wei) -> Result<()> {
        self.access.ensure_not_paused()?;
        self.access.ensure_role(Role::Manager, caller)?;
        if amount == 0 {
            return Err(TokenError::ZeroAmount);
        }
        self.ledger.burn(from, amount)?;
        debug!(%from, amount, supply = self.total_supply(), "dETH burned");
        Ok(())
    }

    /// Burn `amount` of the caller's own balance.
    pub fn burn(&mut self, caller: &Address, amount: Wei) -> Result<()> {
        self.access.ensure_not_paused()?;
        if amount == 0 {
            return Err(TokenError::ZeroAmount);
        }
        self.ledger.burn(caller, amount)
    }

    /// Transfer `amount` from the caller to `to`.
    pub fn transfer(&mut self, caller: &Address, to: &Address, amount: Wei) -> Result<()> {
        self.access.ensure_not_paused()?;
        self.ledger.transfer(caller, to, amount)
    }

    /// Set `spender`'s allowance over the caller's balance.
    pub fn approve(&mut self, caller: &Address, spender: &Address, amount: Wei) -> Result<()> {
        self.access.ensure_not_paused()?;
        self.ledger.approve(caller, spender, amount)
    }

    /// Transfer `amount` from `from` to `to`, spending the caller's allowance.
    pub fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Wei,
    ) -> Result<()> {
        self.access.ensure_not_paused()?;
        self.ledger.spend_allowance(from, caller, amount)?;
        self.ledger.transfer(from, to, amount)
    }

    /// Set the mint cap of an external minter. Owner only.
    ///
    /// The cap may not drop below what the minter has already minted; the
    /// minter has to burn back first.
    pub fn set_minter_cap(&mut self, caller: &Address, minter: Address, cap: Wei) -> Result<()> {
        self.access.ensure_owner(caller)?;
        self.access.ensure_not_paused()?;
        if minter.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let current = self.minters.get(&minter).copied().unwrap_or_default();
        if current.cap == cap {
            return Err(TokenError::SameValue);
        }
        if cap < current.minted {
            return Err(TokenError::CapBelowMinted {
                minter,
                cap,
                minted: current.minted,
            });
        }
        let entry = self.minters.entry(minter).or_default();
        entry.cap = cap;
        if entry.cap == 0 && entry.minted == 0 {
            self.minters.remove(&minter);
        }
        info!(%minter, cap, "minter cap updated");
        Ok(())
    }

    /// Mint `amount` to `to` against the caller's minter cap.
    pub fn minter_mint(&mut self, caller: &Address, to: &Address, amount: Wei) -> Result<()> {
        self.access.ensure_not_paused()?;
        if amount == 0 {
            return Err(TokenError::ZeroAmount);
        }
        let allowance = self
            .minters
            .get(caller)
            .copied()
            .filter(|a| a.cap > 0)
            .ok_or(TokenError::NotMinter(*caller))?;
        let minted = allowance
            .minted
            .checked_add(amount)
            .filter(|m| *m <= allowance.cap)
            .ok_or(TokenError::MinterCapExceeded {
                minter: *caller,
                cap: allowance.cap,
                minted: allowance.minted,
                requested: amount,
            })?;
        self.ledger.mint(to, amount)?;
        self.minters.insert(
            *caller,
            MinterAllowance {
                cap: allowance.cap,
                minted,
            },
        );
        debug!(minter = %caller, %to, amount, minted, "minter mint");
        Ok(())
    }

    /// Burn `amount` of the caller's balance and release the same amount of
    /// its minter cap.
    pub fn minter_burn(&mut self, caller: &Address, amount: Wei) -> Result<()> {
        self.access.ensure_not_paused()?;
        if amount == 0 {
            return Err(TokenError::ZeroAmount);
        }
        let allowance = self
            .minters
            .get(caller)
            .copied()
            .ok_or(TokenError::NotMinter(*caller))?;
        self.ledger.burn(caller, amount)?;
        self.minters.insert(
            *caller,
            MinterAllowance {
                cap: allowance.cap,
                minted: allowance.minted.saturating_sub(amount),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deth_types::AccessError;

    fn owner() -> Address {
        Address::derive("owner")
    }

    fn pool() -> Address {
        Address::derive("deth.pool")
    }

    fn alice() -> Address {
        Address::derive("alice")
    }

    fn bridge() -> Address {
        Address::derive("bridge")
    }

    fn token() -> RebasingToken {
        let mut token = RebasingToken::new("deth ETH", "dETH", Address::derive("deth.token"), owner());
        token
            .access_mut()
            .grant(&owner(), Role::Manager, pool())
            .expect("grant manager");
        token
    }

    #[test]
    fn test_manager_mint_and_burn() {
        let mut token = token();
        token.mint(&pool(), &alice(), 100).expect("mint");
        assert_eq!(token.balance_of(&alice()), 100);
        token.burn_from(&pool(), &alice(), 60).expect("burn");
        assert_eq!(token.total_supply(), 40);
    }

    #[test]
    fn test_non_manager_cannot_mint() {
        let mut token = token();
        let err = token.mint(&alice(), &alice(), 1).expect_err("not manager");
        assert!(matches!(
            err,
            TokenError::Access(AccessError::MissingRole {
                role: Role::Manager,
                ..
            })
        ));
    }

    #[test]
    fn test_zero_mint_rejected() {
        let mut token = token();
        assert_eq!(token.mint(&pool(), &alice(), 0), Err(TokenError::ZeroAmount));
    }

    #[test]
    fn test_minter_cap() {
        let mut token = token();
        token.set_minter_cap(&owner(), bridge(), 100).expect("cap");
        token.minter_mint(&bridge(), &alice(), 70).expect("mint");

        let err = token
            .minter_mint(&bridge(), &alice(), 31)
            .expect_err("over cap");
        assert!(matches!(
            err,
            TokenError::MinterCapExceeded {
                cap: 100,
                minted: 70,
                requested: 31,
                ..
            }
        ));

        token.minter_mint(&bridge(), &bridge(), 30).expect("exactly at cap");
        assert_eq!(token.minter_allowance(&bridge()).minted, 100);

        token.minter_burn(&bridge(), 30).expect("burn back");
        assert_eq!(token.minter_allowance(&bridge()).minted, 70);
        token.minter_mint(&bridge(), &alice(), 30).expect("cap freed");
    }

    #[test]
    fn test_minter_cap_cannot_drop_below_minted() {
        let mut token = token();
        token.set_minter_cap(&owner(), bridge(), 100).expect("cap");
        token.minter_mint(&bridge(), &alice(), 100).expect("mint");

        assert_eq!(
            token.set_minter_cap(&owner(), bridge(), 50),
            Err(TokenError::CapBelowMinted {
                minter: bridge(),
                cap: 50,
                minted: 100,
            })
        );
        let allowance = token.minter_allowance(&bridge());
        assert_eq!((allowance.cap, allowance.minted), (100, 100));

        token.mint(&pool(), &bridge(), 60).expect("fund bridge");
        token.minter_burn(&bridge(), 60).expect("burn back");
        token.set_minter_cap(&owner(), bridge(), 50).expect("at minted");
        assert_eq!(token.minter_allowance(&bridge()).cap, 50);
    }

    #[test]
    fn test_unknown_minter_rejected() {
        let mut token = token();
        assert_eq!(
            token.minter_mint(&bridge(), &alice(), 1),
            Err(TokenError::NotMinter(bridge()))
        );
    }

    #[test]
    fn test_minter_cap_same_value() {
        let mut token = token();
        token.set_minter_cap(&owner(), bridge(), 5).expect("cap");
        assert_eq!(
            token.set_minter_cap(&owner(), bridge(), 5),
            Err(TokenError::SameValue)
        );
    }

    #[test]
    fn test_transfer_from_spends_allowance() {
        let mut token = token();
        let bob = Address::derive("bob");
        token.mint(&pool(), &alice(), 50).expect("mint");
        token.approve(&alice(), &bob, 20).expect("approve");
        token
            .transfer_from(&bob, &alice(), &bob, 20)
            .expect("transfer_from");
        assert_eq!(token.balance_of(&bob), 20);
        assert_eq!(token.allowance(&alice(), &bob), 0);
        assert!(token.transfer_from(&bob, &alice(), &bob, 1).is_err());
    }

    #[test]
    fn test_paused_blocks_everything() {
        let mut token = token();
        let guardian = Address::derive("guardian");
        token.mint(&pool(), &alice(), 10).expect("mint");
        token
            .access_mut()
            .grant(&owner(), Role::PauseGuardian, guardian)
            .expect("grant");
        token.access_mut().pause(&guardian).expect("pause");

        let paused = TokenError::Access(AccessError::Paused);
        assert_eq!(token.mint(&pool(), &alice(), 1), Err(paused.clone()));
        assert_eq!(token.transfer(&alice(), &pool(), 1), Err(paused.clone()));
        assert_eq!(token.burn(&alice(), 1), Err(paused.clone()));
        assert_eq!(token.set_minter_cap(&owner(), bridge(), 5), Err(paused));

        token.access_mut().unpause(&owner()).expect("unpause");
        token.transfer(&alice(), &pool(), 1).expect("transfer");
    }
}
