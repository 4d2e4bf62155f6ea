// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TRON address codec.
//!
//! A TRON address is 21 bytes: the `0x41` network prefix followed by the
//! 20-byte account hash shared with EVM tooling. Nodes return it in three
//! shapes depending on the endpoint:
//!
//! - base58check (`T...`, 34 chars) when `visible: true`
//! - hex with prefix (`41` + 40 hex chars) in contract parameters
//! - bare 20-byte hex in event logs and ABI words (`0x` optional)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Network prefix byte for TRON mainnet and public testnets.
pub const ADDRESS_PREFIX: u8 = 0x41;

/// A 21-byte TRON address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TronAddress([u8; 21]);

impl TronAddress {
    /// Build from the 20-byte account hash.
    pub fn from_evm_bytes(bytes: &[u8; 20]) -> Self {
        let mut raw = [0u8; 21];
        raw[0] = ADDRESS_PREFIX;
        raw[1..].copy_from_slice(bytes);
        Self(raw)
    }

    /// Build from a 32-byte ABI word (address right-aligned in the last 20 bytes).
    pub fn from_abi_word(word: &[u8]) -> Result<Self, AddressError> {
        if word.len() != 32 {
            return Err(AddressError::InvalidLength(word.len()));
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word[12..]);
        Ok(Self::from_evm_bytes(&bytes))
    }

    /// Parse hex in any of the node's spellings (`41…`, `0x…`, bare 20 bytes).
    pub fn from_hex(raw: &str) -> Result<Self, AddressError> {
        let trimmed = raw.trim();
        let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = alloy::hex::decode(hex).map_err(|e| AddressError::InvalidHex(e.to_string()))?;

        match bytes.len() {
            20 => {
                let mut evm = [0u8; 20];
                evm.copy_from_slice(&bytes);
                Ok(Self::from_evm_bytes(&evm))
            }
            21 => {
                if bytes[0] != ADDRESS_PREFIX {
                    return Err(AddressError::InvalidPrefix(bytes[0]));
                }
                let mut raw = [0u8; 21];
                raw.copy_from_slice(&bytes);
                Ok(Self(raw))
            }
            n => Err(AddressError::InvalidLength(n)),
        }
    }

    /// Parse a base58check address (`T...`).
    pub fn from_base58(raw: &str) -> Result<Self, AddressError> {
        let bytes = bs58::decode(raw.trim())
            .with_check(None)
            .into_vec()
            .map_err(|e| AddressError::InvalidBase58(e.to_string()))?;

        if bytes.len() != 21 {
            return Err(AddressError::InvalidLength(bytes.len()));
        }
        if bytes[0] != ADDRESS_PREFIX {
            return Err(AddressError::InvalidPrefix(bytes[0]));
        }

        let mut raw = [0u8; 21];
        raw.copy_from_slice(&bytes);
        Ok(Self(raw))
    }

    /// Base58check representation used by wallets and explorers.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).with_check().into_string()
    }

    /// `41`-prefixed hex, the node's non-visible representation.
    pub fn to_hex(&self) -> String {
        alloy::hex::encode(self.0)
    }

    /// The 20-byte account hash.
    pub fn evm_bytes(&self) -> [u8; 20] {
        let mut out = [0u8; 20];
        out.copy_from_slice(&self.0[1..]);
        out
    }
}

impl FromStr for TronAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.starts_with('T') && trimmed.len() == 34 {
            Self::from_base58(trimmed)
        } else {
            Self::from_hex(trimmed)
        }
    }
}

impl fmt::Display for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl fmt::Debug for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TronAddress({})", self.to_base58())
    }
}

impl Serialize for TronAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for TronAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("invalid address length: {0} bytes")]
    InvalidLength(usize),

    #[error("invalid address prefix: 0x{0:02x}")]
    InvalidPrefix(u8),

    #[error("invalid hex address: {0}")]
    InvalidHex(String),

    #[error("invalid base58 address: {0}")]
    InvalidBase58(String),
}
