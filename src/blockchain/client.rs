// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TRON full-node client for blockchain reads.

use std::time::Duration;

use alloy::primitives::U256;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::address::TronAddress;
use super::trc20::{decode_uint256_result, encode_balance_of_parameter, BALANCE_OF_SELECTOR};
use super::types::{AccountInfo, NetworkConfig, RawTransaction, TransactionInfo};

/// Default per-request timeout for node calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Header TronGrid reads the API key from.
const API_KEY_HEADER: &str = "TRON-PRO-API-KEY";

/// Read-only view of the chain used by the verifier and lookups.
///
/// Every method returns `Ok(None)` when the node reports the object as
/// unknown; transport and decode problems are errors.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// `/wallet/gettransactionbyid`
    async fn get_transaction(&self, tx_hash: &str) -> ChainResult<Option<RawTransaction>>;

    /// `/wallet/gettransactioninfobyid` (includes unconfirmed transactions)
    async fn get_transaction_info(&self, tx_hash: &str) -> ChainResult<Option<TransactionInfo>>;

    /// `/wallet/getaccount`
    async fn get_account(&self, address: &TronAddress) -> ChainResult<Option<AccountInfo>>;

    /// TRC20 `balanceOf(owner)` via `/wallet/triggerconstantcontract`
    async fn trc20_balance_of(
        &self,
        contract: &TronAddress,
        owner: &TronAddress,
    ) -> ChainResult<U256>;

    /// Head block number via `/wallet/getnowblock`
    async fn current_block_number(&self) -> ChainResult<u64>;
}

/// HTTP client for a TronGrid-compatible full node.
#[derive(Clone)]
pub struct TronClient {
    /// Network configuration
    network: NetworkConfig,
    /// Base URL (network default or operator override)
    api_url: url::Url,
    /// Optional TronGrid API key
    api_key: Option<String>,
    client: reqwest::Client,
}

impl TronClient {
    /// Create a new client for the specified network.
    pub fn new(
        network: NetworkConfig,
        api_url_override: Option<&str>,
        api_key: Option<String>,
    ) -> Result<Self, ChainError> {
        let raw_url = api_url_override.unwrap_or(network.api_url);
        let mut api_url: url::Url = raw_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidApiUrl(e.to_string()))?;
        // `join` replaces the last segment unless the path ends in `/`.
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        Ok(Self {
            network,
            api_url,
            api_key,
            client,
        })
    }

    /// Get the network configuration.
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ChainResult<R> {
        let url = self
            .api_url
            .join(path)
            .map_err(|e| ChainError::InvalidApiUrl(e.to_string()))?;

        let mut request = self.client.post(url).json(body);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChainError::HttpStatus {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        // The node reports some failures as `{"Error": "..."}` with HTTP 200.
        if let Ok(node_error) = serde_json::from_slice::<NodeError>(&bytes) {
            return Err(ChainError::Node(node_error.error));
        }

        serde_json::from_slice(&bytes).map_err(|e| ChainError::Decode(e.to_string()))
    }
}

#[derive(Serialize)]
struct ValueRequest<'a> {
    value: &'a str,
    visible: bool,
}

#[derive(Serialize)]
struct AddressRequest {
    address: String,
    visible: bool,
}

#[derive(Serialize)]
struct ConstantCallRequest<'a> {
    owner_address: String,
    contract_address: String,
    function_selector: &'a str,
    parameter: String,
    visible: bool,
}

#[derive(Deserialize)]
struct ConstantCallResponse {
    #[serde(default)]
    constant_result: Vec<String>,
}

#[derive(Deserialize)]
struct NowBlockResponse {
    block_header: BlockHeader,
}

#[derive(Deserialize)]
struct BlockHeader {
    raw_data: BlockRawData,
}

#[derive(Deserialize)]
struct BlockRawData {
    #[serde(default)]
    number: u64,
}

#[derive(Deserialize)]
struct NodeError {
    #[serde(rename = "Error")]
    error: String,
}

#[async_trait]
impl ChainReader for TronClient {
    async fn get_transaction(&self, tx_hash: &str) -> ChainResult<Option<RawTransaction>> {
        let tx: RawTransaction = self
            .post(
                "wallet/gettransactionbyid",
                &ValueRequest {
                    value: tx_hash,
                    visible: false,
                },
            )
            .await?;
        Ok(tx.is_present().then_some(tx))
    }

    async fn get_transaction_info(&self, tx_hash: &str) -> ChainResult<Option<TransactionInfo>> {
        let info: TransactionInfo = self
            .post(
                "wallet/gettransactioninfobyid",
                &ValueRequest {
                    value: tx_hash,
                    visible: false,
                },
            )
            .await?;
        Ok(info.is_present().then_some(info))
    }

    async fn get_account(&self, address: &TronAddress) -> ChainResult<Option<AccountInfo>> {
        let account: AccountInfo = self
            .post(
                "wallet/getaccount",
                &AddressRequest {
                    address: address.to_hex(),
                    visible: false,
                },
            )
            .await?;
        Ok(account.is_present().then_some(account))
    }

    async fn trc20_balance_of(
        &self,
        contract: &TronAddress,
        owner: &TronAddress,
    ) -> ChainResult<U256> {
        let response: ConstantCallResponse = self
            .post(
                "wallet/triggerconstantcontract",
                &ConstantCallRequest {
                    owner_address: owner.to_hex(),
                    contract_address: contract.to_hex(),
                    function_selector: BALANCE_OF_SELECTOR,
                    parameter: encode_balance_of_parameter(owner),
                    visible: false,
                },
            )
            .await?;

        let word = response
            .constant_result
            .first()
            .ok_or_else(|| ChainError::Decode("empty constant_result".to_string()))?;
        decode_uint256_result(word).map_err(|e| ChainError::Decode(e.to_string()))
    }

    async fn current_block_number(&self) -> ChainResult<u64> {
        let block: NowBlockResponse = self
            .post("wallet/getnowblock", &serde_json::json!({}))
            .await?;
        Ok(block.block_header.raw_data.number)
    }
}

/// Errors that can occur during blockchain reads.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid API URL: {0}")]
    InvalidApiUrl(String),

    #[error("Node transport error: {0}")]
    Transport(String),

    #[error("Node returned HTTP {status} for {path}")]
    HttpStatus { path: String, status: u16 },

    #[error("Node error: {0}")]
    Node(String),

    #[error("Failed to decode node response: {0}")]
    Decode(String),
}

pub type ChainResult<T> = Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::TRON_NILE;

    #[test]
    fn client_uses_network_default_url() {
        let client = TronClient::new(TRON_NILE, None, None).unwrap();
        assert_eq!(client.api_url.as_str(), "https://nile.trongrid.io/");
        assert_eq!(client.network().key, "nile");
    }

    #[test]
    fn client_accepts_override() {
        let client =
            TronClient::new(TRON_NILE, Some("http://127.0.0.1:8090"), Some("k".into())).unwrap();
        assert_eq!(
            client.api_url.join("wallet/getnowblock").unwrap().as_str(),
            "http://127.0.0.1:8090/wallet/getnowblock"
        );
    }

    #[test]
    fn override_path_is_kept_when_joining() {
        for raw in ["https://proxy.example/tron", "https://proxy.example/tron/"] {
            let client = TronClient::new(TRON_NILE, Some(raw), None).unwrap();
            assert_eq!(
                client.api_url.join("wallet/getnowblock").unwrap().as_str(),
                "https://proxy.example/tron/wallet/getnowblock"
            );
        }
    }

    #[test]
    fn client_rejects_invalid_url() {
        let result = TronClient::new(TRON_NILE, Some("not a url"), None);
        assert!(matches!(result, Err(ChainError::InvalidApiUrl(_))));
    }

    #[test]
    fn node_error_shape_parses() {
        let raw = r#"{"Error":"class org.tron.core.exception.BadItemException"}"#;
        let err: NodeError = serde_json::from_str(raw).unwrap();
        assert!(err.error.contains("BadItemException"));
    }
}
