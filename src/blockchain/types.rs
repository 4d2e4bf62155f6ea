// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TRON network constants and full-node response types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// TRON network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Short network key (`mainnet`, `shasta`, `nile`)
    pub key: &'static str,
    /// Network name for display
    pub name: &'static str,
    /// Full-node HTTP API base URL
    pub api_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
    /// TRC20 USDT contract (base58), if one is deployed
    pub usdt_contract: Option<&'static str>,
}

/// TRON mainnet via TronGrid.
pub const TRON_MAINNET: NetworkConfig = NetworkConfig {
    key: "mainnet",
    name: "TRON Mainnet",
    api_url: "https://api.trongrid.io",
    explorer_url: "https://tronscan.org/#",
    usdt_contract: Some("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t"),
};

/// Shasta testnet.
pub const TRON_SHASTA: NetworkConfig = NetworkConfig {
    key: "shasta",
    name: "TRON Shasta Testnet",
    api_url: "https://api.shasta.trongrid.io",
    explorer_url: "https://shasta.tronscan.org/#",
    usdt_contract: None,
};

/// Nile testnet.
pub const TRON_NILE: NetworkConfig = NetworkConfig {
    key: "nile",
    name: "TRON Nile Testnet",
    api_url: "https://nile.trongrid.io",
    explorer_url: "https://nile.tronscan.org/#",
    usdt_contract: Some("TXYZopYRdj2D9XRtbG411XZZ3kM5VkAeBf"),
};

/// Resolve a network by its short key (case-insensitive).
pub fn network_by_key(raw: &str) -> Option<NetworkConfig> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "mainnet" => Some(TRON_MAINNET),
        "shasta" => Some(TRON_SHASTA),
        "nile" => Some(TRON_NILE),
        _ => None,
    }
}

/// TRX and TRC20 USDT both use 6 decimals (1 TRX = 1_000_000 sun).
pub const TOKEN_DECIMALS: u8 = 6;

/// Asset a payment was made in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    /// Native TRX transfer
    Trx,
    /// TRC20 Tether transfer
    Usdt,
}

impl Asset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Asset::Trx => "TRX",
            Asset::Usdt => "USDT",
        }
    }
}

/// Token balance information.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenBalance {
    /// Token symbol (e.g., "TRX", "USDT")
    pub symbol: String,
    /// Balance in smallest unit (sun for TRX, token decimals for TRC20)
    pub balance_raw: String,
    /// Balance formatted with decimals
    pub balance_formatted: String,
    /// Number of decimals
    pub decimals: u8,
    /// Contract address (None for native token)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
}

// =============================================================================
// Full-node response shapes (`visible: false`, hex addresses)
// =============================================================================

/// `/wallet/gettransactionbyid` response.
///
/// The node answers `{}` for unknown hashes, so every field defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawTransaction {
    #[serde(rename = "txID", default)]
    pub tx_id: String,
    #[serde(default)]
    pub ret: Vec<ContractRet>,
    #[serde(default)]
    pub raw_data: Option<RawData>,
}

impl RawTransaction {
    /// Whether the node returned an actual transaction.
    pub fn is_present(&self) -> bool {
        !self.tx_id.is_empty() && self.raw_data.is_some()
    }

    /// `ret[0].contractRet`, if reported.
    pub fn contract_result(&self) -> Option<&str> {
        self.ret.first().and_then(|r| r.contract_ret.as_deref())
    }

    /// The first (and in practice only) contract in the transaction.
    pub fn contract(&self) -> Option<&Contract> {
        self.raw_data.as_ref().and_then(|d| d.contract.first())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContractRet {
    #[serde(rename = "contractRet", default)]
    pub contract_ret: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawData {
    #[serde(default)]
    pub contract: Vec<Contract>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Contract {
    #[serde(rename = "type")]
    pub contract_type: String,
    pub parameter: ContractParameter,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractParameter {
    pub value: ContractValue,
}

/// Union of the `TransferContract` and `TriggerSmartContract` parameter fields.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContractValue {
    #[serde(default)]
    pub owner_address: Option<String>,
    /// TransferContract recipient
    #[serde(default)]
    pub to_address: Option<String>,
    /// TransferContract amount in sun
    #[serde(default)]
    pub amount: Option<u64>,
    /// TriggerSmartContract target
    #[serde(default)]
    pub contract_address: Option<String>,
    /// TriggerSmartContract call data (hex)
    #[serde(default)]
    pub data: Option<String>,
}

/// `/wallet/gettransactioninfobyid` response (includes unconfirmed).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TransactionInfo {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "blockNumber", default)]
    pub block_number: Option<u64>,
    #[serde(rename = "blockTimeStamp", default)]
    pub block_timestamp: Option<i64>,
    #[serde(default)]
    pub receipt: Option<Receipt>,
    #[serde(default)]
    pub log: Vec<EventLog>,
    /// Top-level `result` is only present (as `FAILED`) on failure.
    #[serde(default)]
    pub result: Option<String>,
}

impl TransactionInfo {
    pub fn is_present(&self) -> bool {
        !self.id.is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Receipt {
    #[serde(default)]
    pub result: Option<String>,
}

/// Raw event log: `address` is bare 20-byte hex, topics/data are unprefixed hex.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EventLog {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
}

/// `/wallet/getaccount` response (`{}` for inactive accounts).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub address: Option<String>,
    /// TRX balance in sun
    #[serde(default)]
    pub balance: u64,
    #[serde(default)]
    pub create_time: Option<i64>,
}

impl AccountInfo {
    pub fn is_present(&self) -> bool {
        self.address.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_absent_transaction() {
        let tx: RawTransaction = serde_json::from_str("{}").unwrap();
        assert!(!tx.is_present());
        assert!(tx.contract_result().is_none());
    }

    #[test]
    fn parses_transfer_contract() {
        let json = r#"{
            "ret": [{"contractRet": "SUCCESS"}],
            "txID": "abc",
            "raw_data": {
                "contract": [{
                    "parameter": {
                        "value": {
                            "amount": 2500000,
                            "owner_address": "41a614f803b6fd780986a42c78ec9c7f77e6ded13c",
                            "to_address": "41b614f803b6fd780986a42c78ec9c7f77e6ded13c"
                        },
                        "type_url": "type.googleapis.com/protocol.TransferContract"
                    },
                    "type": "TransferContract"
                }],
                "timestamp": 1700000000000
            }
        }"#;
        let tx: RawTransaction = serde_json::from_str(json).unwrap();
        assert!(tx.is_present());
        assert_eq!(tx.contract_result(), Some("SUCCESS"));
        let contract = tx.contract().unwrap();
        assert_eq!(contract.contract_type, "TransferContract");
        assert_eq!(contract.parameter.value.amount, Some(2_500_000));
    }

    #[test]
    fn network_lookup_is_case_insensitive() {
        assert_eq!(network_by_key("Nile").unwrap().key, "nile");
        assert!(network_by_key("goerli").is_none());
    }
}
