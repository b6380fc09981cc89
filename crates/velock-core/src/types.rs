//! Core ledger types: addresses, lock identifiers, timestamps, magnitudes.
//!
//! Token magnitudes are `u128` base units; timestamps are `u64` Unix seconds.
//! [`Address`] and [`LockId`] serialize as `0x`-prefixed hex strings so they
//! can key JSON maps.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::LOCK_ID_DOMAIN;
use crate::error::HexIdError;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Token magnitude or voting power in base units.
pub type Amount = u128;

/// A 20-byte account address (lock owner or delegate).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

/// Unique identifier of a lock: BLAKE3 of a domain tag, the owner and a nonce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LockId(pub [u8; 32]);

impl LockId {
    /// Derive the identifier for the `nonce`-th lock created in a registry.
    ///
    /// # Examples
    ///
    /// ```
    /// use velock_core::types::{Address, LockId};
    /// let owner = Address([7; 20]);
    /// assert_eq!(LockId::derive(&owner, 0), LockId::derive(&owner, 0));
    /// assert_ne!(LockId::derive(&owner, 0), LockId::derive(&owner, 1));
    /// ```
    pub fn derive(owner: &Address, nonce: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(LOCK_ID_DOMAIN);
        hasher.update(owner.as_bytes());
        hasher.update(&nonce.to_le_bytes());
        Self(hasher.finalize().into())
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

fn decode_hex<const N: usize>(s: &str) -> Result<[u8; N], HexIdError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(digits).map_err(|_| HexIdError::InvalidHex)?;
    let got = bytes.len();
    bytes
        .try_into()
        .map_err(|_| HexIdError::InvalidLength { expected: N, got })
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = HexIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex(s).map(Self)
    }
}

impl FromStr for LockId {
    type Err = HexIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex(s).map(Self)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for LockId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for LockId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn address_display_roundtrips_through_from_str() {
        let addr = Address([0xAB; 20]);
        let text = addr.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 42);
        assert_eq!(text.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn address_parses_without_prefix() {
        let addr: Address = "0101010101010101010101010101010101010101".parse().unwrap();
        assert_eq!(addr, Address([1; 20]));
    }

    #[test]
    fn address_rejects_bad_input() {
        assert_eq!("0xzz".parse::<Address>(), Err(HexIdError::InvalidHex));
        assert_eq!(
            "0x0102".parse::<Address>(),
            Err(HexIdError::InvalidLength { expected: 20, got: 2 })
        );
    }

    #[test]
    fn lock_id_depends_on_owner() {
        assert_ne!(
            LockId::derive(&Address([1; 20]), 0),
            LockId::derive(&Address([2; 20]), 0)
        );
    }

    #[test]
    fn ids_usable_as_json_map_keys() {
        let mut map = HashMap::new();
        map.insert(Address([3; 20]), 5u64);
        let json = serde_json::to_string(&map).unwrap();
        let back: HashMap<Address, u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);

        let id = LockId::derive(&Address([3; 20]), 9);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(serde_json::from_str::<LockId>(&json).unwrap(), id);
    }
}
