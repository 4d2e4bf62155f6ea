// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TRC20 token contract ABI helpers.
//!
//! TRC20 is ABI-compatible with ERC-20, so the interface is declared with
//! alloy's `sol!` macro; only the transport (TRON HTTP API instead of
//! JSON-RPC) differs.

use alloy::{
    primitives::{Address, FixedBytes, U256},
    sol,
    sol_types::SolCall,
};

use super::address::TronAddress;
use super::types::EventLog;

sol! {
    interface ITRC20 {
        event Transfer(address indexed from, address indexed to, uint256 value);

        function balanceOf(address account) external view returns (uint256);
    }
}

/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_TOPIC: FixedBytes<32> = FixedBytes::new([
    0xdd, 0xf2, 0x52, 0xad, 0x1b, 0xe2, 0xc8, 0x9b, 0x69, 0xc2, 0xb0, 0x68, 0xfc, 0x37, 0x8d, 0xaa,
    0x95, 0x2b, 0xa7, 0xf1, 0x63, 0xc4, 0xa1, 0x16, 0x28, 0xf5, 0x5a, 0x4d, 0xf5, 0x23, 0xb3, 0xef,
]);

/// Function selector string passed to `triggerconstantcontract`.
pub const BALANCE_OF_SELECTOR: &str = "balanceOf(address)";

/// A decoded `Transfer` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trc20Transfer {
    pub from: TronAddress,
    pub to: TronAddress,
    /// Raw token units
    pub value: U256,
}

/// Decode a log entry as a TRC20 `Transfer`.
///
/// Returns `None` for logs with a different signature or fewer than three
/// topics; malformed hex in a matching log is an error.
pub fn decode_transfer_log(log: &EventLog) -> Option<Result<Trc20Transfer, Trc20DecodeError>> {
    if log.topics.len() < 3 {
        return None;
    }

    let signature = match decode_word(&log.topics[0]) {
        Ok(word) => word,
        Err(e) => return Some(Err(e)),
    };
    if FixedBytes::<32>::from(signature) != TRANSFER_TOPIC {
        return None;
    }

    Some(decode_matching_log(log))
}

fn decode_matching_log(log: &EventLog) -> Result<Trc20Transfer, Trc20DecodeError> {
    let from_word = decode_word(&log.topics[1])?;
    let to_word = decode_word(&log.topics[2])?;
    let from = TronAddress::from_abi_word(&from_word)
        .map_err(|e| Trc20DecodeError::Address(e.to_string()))?;
    let to = TronAddress::from_abi_word(&to_word)
        .map_err(|e| Trc20DecodeError::Address(e.to_string()))?;

    // Value is the only non-indexed field: the first data word.
    let data = strip_hex(&log.data);
    let data_bytes =
        alloy::hex::decode(data).map_err(|e| Trc20DecodeError::Hex(e.to_string()))?;
    if data_bytes.len() < 32 {
        return Err(Trc20DecodeError::ShortData(data_bytes.len()));
    }
    let value = U256::from_be_slice(&data_bytes[..32]);

    Ok(Trc20Transfer {
        from,
        to,
        value,
    })
}

/// ABI-encode the `balanceOf` argument (without selector) as hex.
pub fn encode_balance_of_parameter(owner: &TronAddress) -> String {
    let call = ITRC20::balanceOfCall {
        account: Address::from(owner.evm_bytes()),
    };
    let encoded = call.abi_encode();
    // Skip the 4-byte selector; the node prepends it from `function_selector`.
    alloy::hex::encode(&encoded[4..])
}

/// Decode a `uint256` return word from `constant_result[0]`.
pub fn decode_uint256_result(hex_word: &str) -> Result<U256, Trc20DecodeError> {
    let bytes =
        alloy::hex::decode(strip_hex(hex_word)).map_err(|e| Trc20DecodeError::Hex(e.to_string()))?;
    if bytes.len() < 32 {
        return Err(Trc20DecodeError::ShortData(bytes.len()));
    }
    Ok(U256::from_be_slice(&bytes[..32]))
}

fn strip_hex(raw: &str) -> &str {
    raw.strip_prefix("0x").unwrap_or(raw)
}

fn decode_word(raw: &str) -> Result<[u8; 32], Trc20DecodeError> {
    let bytes =
        alloy::hex::decode(strip_hex(raw)).map_err(|e| Trc20DecodeError::Hex(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| Trc20DecodeError::ShortData(b.len()))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Trc20DecodeError {
    #[error("invalid hex in log: {0}")]
    Hex(String),

    #[error("invalid address in log: {0}")]
    Address(String),

    #[error("log word has {0} bytes, expected 32")]
    ShortData(usize),
}
