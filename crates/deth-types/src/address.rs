//! 20-byte account addresses.
//!
//! Addresses render as `0x`-prefixed lowercase hex and serialize through
//! their string form, so they can key JSON maps in state snapshots.

use std::fmt;
use std::str::FromStr;

use serde_with::{DeserializeFromStr, SerializeDisplay};

/// Domain separator for addresses derived from a label.
const ADDRESS_DERIVATION_CONTEXT: &str = "deth 2024-01-01 address derivation v1";

/// An account or component address.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct Address(pub [u8; 20]);

/// Failure to parse an [`Address`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    /// Input was not valid hex.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Input decoded to the wrong number of bytes.
    #[error("expected 20 bytes, got {0}")]
    InvalidLength(usize),
}

impl Address {
    /// The zero address. Never a valid receiver or role holder.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Derive a deterministic address from a human-readable label.
    ///
    /// Used for component addresses (`"deth.pool"`, `"deth.vault"`) and for
    /// named accounts in configuration and tests.
    pub fn derive(label: &str) -> Self {
        let digest = blake3::derive_key(ADDRESS_DERIVATION_CONTEXT, label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Self(bytes)
    }

    /// Whether this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
        let array: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressParseError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_parse() {
        let addr = Address::derive("alice");
        let text = addr.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 42);
        let parsed: Address = text.parse().expect("parse");
        assert_eq!(parsed, addr);
    }

    #[test]
    fn test_parse_without_prefix() {
        let parsed: Address = "0000000000000000000000000000000000000001"
            .parse()
            .expect("parse");
        assert_eq!(parsed.0[19], 1);
    }

    #[test]
    fn test_parse_wrong_length() {
        let err = "0x1234".parse::<Address>().expect_err("too short");
        assert_eq!(err, AddressParseError::InvalidLength(2));
    }

    #[test]
    fn test_parse_bad_hex() {
        assert!(matches!(
            "0xzz".parse::<Address>(),
            Err(AddressParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_derive_is_deterministic() {
        assert_eq!(Address::derive("deth.pool"), Address::derive("deth.pool"));
        assert_ne!(Address::derive("deth.pool"), Address::derive("deth.vault"));
        assert!(!Address::derive("deth.pool").is_zero());
        assert!(Address::ZERO.is_zero());
    }

    #[test]
    fn test_serde_as_string() {
        let addr = Address::derive("bob");
        let json = serde_json::to_string(&addr).expect("serialize");
        assert_eq!(json, format!("\"{addr}\""));
        let back: Address = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, addr);
    }
}
