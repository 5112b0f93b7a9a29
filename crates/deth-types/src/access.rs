//! Role-based access control.
//!
//! Each component owns one [`AccessControl`]: a single owner (with two-step
//! transfer), a capability table mapping [`Role`] to a set of principals,
//! and the component's pause flag. Entry points call the `ensure_*` guards
//! before touching state.
//!
//! Membership changes are idempotency-checked: granting an existing member
//! or revoking a non-member is an error, never a silent no-op.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Address;

/// A capability that can be granted to any number of principals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Mint/burn authority on the token, submission authority on the oracle.
    Manager,
    /// May pause the component. Unpausing stays with the owner.
    PauseGuardian,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Manager => f.write_str("manager"),
            Role::PauseGuardian => f.write_str("pause_guardian"),
        }
    }
}

/// Authorization and pause failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// Caller is not the owner.
    #[error("caller {0} is not the owner")]
    NotOwner(Address),

    /// Caller is not the pending owner.
    #[error("caller {0} is not the pending owner")]
    NotPendingOwner(Address),

    /// Caller lacks a role.
    #[error("caller {account} does not have role {role}")]
    MissingRole {
        /// The required role.
        role: Role,
        /// The caller.
        account: Address,
    },

    /// Granting a role the account already has.
    #[error("{account} already has role {role}")]
    AlreadyMember {
        /// The role.
        role: Role,
        /// The account.
        account: Address,
    },

    /// Revoking a role the account does not have.
    #[error("{account} does not have role {role}")]
    NotMember {
        /// The role.
        role: Role,
        /// The account.
        account: Address,
    },

    /// The zero address cannot hold a role or ownership.
    #[error("zero address")]
    ZeroAddress,

    /// Same-value write.
    #[error("Cannot set the same value")]
    SameValue,

    /// The component is paused.
    #[error("paused")]
    Paused,

    /// Unpause requested while not paused.
    #[error("not paused")]
    NotPaused,
}

/// Convenience result type for access checks.
pub type Result<T> = std::result::Result<T, AccessError>;

/// Owner, role table and pause flag of one component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    owner: Address,
    #[serde(default)]
    pending_owner: Option<Address>,
    #[serde(default)]
    roles: BTreeMap<Role, BTreeSet<Address>>,
    #[serde(default)]
    paused: bool,
}

impl AccessControl {
    /// Create a table owned by `owner` with no role holders.
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            pending_owner: None,
            roles: BTreeMap::new(),
            paused: false,
        }
    }

    /// The current owner.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// The nominated owner awaiting acceptance, if any.
    pub fn pending_owner(&self) -> Option<Address> {
        self.pending_owner
    }

    /// Whether the component is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether `account` holds `role`.
    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.roles
            .get(&role)
            .is_some_and(|members| members.contains(account))
    }

    /// All holders of `role`, in address order.
    pub fn members(&self, role: Role) -> Vec<Address> {
        self.roles
            .get(&role)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Require `caller` to be the owner.
    pub fn ensure_owner(&self, caller: &Address) -> Result<()> {
        if *caller != self.owner {
            return Err(AccessError::NotOwner(*caller));
        }
        Ok(())
    }

    /// Require `caller` to hold `role`.
    pub fn ensure_role(&self, role: Role, caller: &Address) -> Result<()> {
        if !self.has_role(role, caller) {
            return Err(AccessError::MissingRole {
                role,
                account: *caller,
            });
        }
        Ok(())
    }

    /// Require the component to be running.
    pub fn ensure_not_paused(&self) -> Result<()> {
        if self.paused {
            return Err(AccessError::Paused);
        }
        Ok(())
    }

    /// Grant `role` to `account`. Owner only.
    pub fn grant(&mut self, caller: &Address, role: Role, account: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        if account.is_zero() {
            return Err(AccessError::ZeroAddress);
        }
        if !self.roles.entry(role).or_default().insert(account) {
            return Err(AccessError::AlreadyMember { role, account });
        }
        Ok(())
    }

    /// Revoke `role` from `account`. Owner only.
    pub fn revoke(&mut self, caller: &Address, role: Role, account: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        let removed = self
            .roles
            .get_mut(&role)
            .is_some_and(|members| members.remove(&account));
        if !removed {
            return Err(AccessError::NotMember { role, account });
        }
        Ok(())
    }

    /// Nominate a new owner. Takes effect once they call [`Self::accept_ownership`].
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(AccessError::ZeroAddress);
        }
        if new_owner == self.owner || self.pending_owner == Some(new_owner) {
            return Err(AccessError::SameValue);
        }
        self.pending_owner = Some(new_owner);
        Ok(())
    }

    /// Complete an ownership transfer. Returns the previous owner.
    pub fn accept_ownership(&mut self, caller: &Address) -> Result<Address> {
        if self.pending_owner != Some(*caller) {
            return Err(AccessError::NotPendingOwner(*caller));
        }
        let previous = self.owner;
        self.owner = *caller;
        self.pending_owner = None;
        Ok(previous)
    }

    /// Pause the component. Pause guardians only.
    pub fn pause(&mut self, caller: &Address) -> Result<()> {
        self.ensure_role(Role::PauseGuardian, caller)?;
        self.ensure_not_paused()?;
        self.paused = true;
        Ok(())
    }

    /// Resume the component. Owner only.
    pub fn unpause(&mut self, caller: &Address) -> Result<()> {
        self.ensure_owner(caller)?;
        if !self.paused {
            return Err(AccessError::NotPaused);
        }
        self.paused = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Address {
        Address::derive("owner")
    }

    fn alice() -> Address {
        Address::derive("alice")
    }

    #[test]
    fn test_grant_and_revoke() {
        let mut acl = AccessControl::new(owner());
        acl.grant(&owner(), Role::Manager, alice()).expect("grant");
        assert!(acl.has_role(Role::Manager, &alice()));
        assert!(!acl.has_role(Role::PauseGuardian, &alice()));
        assert_eq!(acl.members(Role::Manager), vec![alice()]);

        acl.revoke(&owner(), Role::Manager, alice()).expect("revoke");
        assert!(!acl.has_role(Role::Manager, &alice()));
    }

    #[test]
    fn test_duplicate_grant_rejected() {
        let mut acl = AccessControl::new(owner());
        acl.grant(&owner(), Role::Manager, alice()).expect("grant");
        let err = acl
            .grant(&owner(), Role::Manager, alice())
            .expect_err("duplicate");
        assert!(matches!(err, AccessError::AlreadyMember { .. }));
    }

    #[test]
    fn test_revoke_non_member_rejected() {
        let mut acl = AccessControl::new(owner());
        let err = acl
            .revoke(&owner(), Role::PauseGuardian, alice())
            .expect_err("not a member");
        assert!(matches!(err, AccessError::NotMember { .. }));
    }

    #[test]
    fn test_only_owner_grants() {
        let mut acl = AccessControl::new(owner());
        let err = acl
            .grant(&alice(), Role::Manager, alice())
            .expect_err("not owner");
        assert_eq!(err, AccessError::NotOwner(alice()));
    }

    #[test]
    fn test_zero_address_rejected() {
        let mut acl = AccessControl::new(owner());
        assert_eq!(
            acl.grant(&owner(), Role::Manager, Address::ZERO),
            Err(AccessError::ZeroAddress)
        );
    }

    #[test]
    fn test_pause_guardian_pauses_owner_unpauses() {
        let guardian = Address::derive("guardian");
        let mut acl = AccessControl::new(owner());
        acl.grant(&owner(), Role::PauseGuardian, guardian)
            .expect("grant");

        // Owner without the guardian role cannot pause.
        assert!(matches!(
            acl.pause(&owner()),
            Err(AccessError::MissingRole { .. })
        ));

        acl.pause(&guardian).expect("pause");
        assert!(acl.is_paused());
        assert_eq!(acl.ensure_not_paused(), Err(AccessError::Paused));

        // Guardian cannot unpause.
        assert_eq!(acl.unpause(&guardian), Err(AccessError::NotOwner(guardian)));
        acl.unpause(&owner()).expect("unpause");
        assert!(!acl.is_paused());
        assert_eq!(acl.unpause(&owner()), Err(AccessError::NotPaused));
    }

    #[test]
    fn test_two_step_ownership() {
        let mut acl = AccessControl::new(owner());
        acl.transfer_ownership(&owner(), alice()).expect("nominate");
        assert_eq!(acl.owner(), owner());
        assert_eq!(acl.pending_owner(), Some(alice()));

        let bob = Address::derive("bob");
        assert_eq!(
            acl.accept_ownership(&bob),
            Err(AccessError::NotPendingOwner(bob))
        );

        let previous = acl.accept_ownership(&alice()).expect("accept");
        assert_eq!(previous, owner());
        assert_eq!(acl.owner(), alice());
        assert_eq!(acl.pending_owner(), None);
    }

    #[test]
    fn test_transfer_to_self_rejected() {
        let mut acl = AccessControl::new(owner());
        assert_eq!(
            acl.transfer_ownership(&owner(), owner()),
            Err(AccessError::SameValue)
        );
    }
}
