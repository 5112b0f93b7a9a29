//! # deth-token
//!
//! The dETH receipt token: a balance ledger whose supply is minted and burned
//! by allow-listed managers (the core pool) and by capped minters (external
//! bridges).
//!
//! ## Modules
//!
//! - [`ledger`] — balances, allowances and supply bookkeeping
//! - [`token`] — the access-controlled, pausable token

pub mod ledger;
pub mod token;

pub use ledger::TokenLedger;
pub use token::{MinterAllowance, RebasingToken};

use deth_types::{AccessError, Address, MathError, Wei};

/// Error types for token operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Amount is zero.
    #[error("amount is zero")]
    ZeroAmount,

    /// Mint or transfer to the zero address.
    #[error("zero address")]
    ZeroAddress,

    /// Balance too small for a burn or transfer.
    #[error("insufficient balance for {account}: required {required}, available {available}")]
    InsufficientBalance {
        /// The debited account.
        account: Address,
        /// Amount requested.
        required: Wei,
        /// Current balance.
        available: Wei,
    },

    /// Allowance too small for a delegated transfer.
    #[error("insufficient allowance for {spender} on {owner}: required {required}, available {available}")]
    InsufficientAllowance {
        /// The token holder.
        owner: Address,
        /// The delegated spender.
        spender: Address,
        /// Amount requested.
        required: Wei,
        /// Current allowance.
        available: Wei,
    },

    /// Caller has no minter cap.
    #[error("{0} is not a minter")]
    NotMinter(Address),

    /// Minting would exceed the minter's cap.
    #[error("minter cap exceeded for {minter}: cap {cap}, minted {minted}, requested {requested}")]
    MinterCapExceeded {
        /// The minter.
        minter: Address,
        /// Configured cap.
        cap: Wei,
        /// Already minted.
        minted: Wei,
        /// Requested amount.
        requested: Wei,
    },

    /// Cap lowered below what the minter already minted.
    #[error("minter cap {cap} for {minter} is below minted {minted}")]
    CapBelowMinted {
        /// The minter.
        minter: Address,
        /// Requested cap.
        cap: Wei,
        /// Already minted.
        minted: Wei,
    },

    /// Same-value write.
    #[error("Cannot set the same value")]
    SameValue,

    /// Authorization or pause failure.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Supply arithmetic failure.
    #[error(transparent)]
    Math(#[from] MathError),
}

/// Convenience result type for token operations.
pub type Result<T> = std::result::Result<T, TokenError>;
