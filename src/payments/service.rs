// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment operations exposed through the edge entrypoint.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::claim::{normalize_tx_hash, PaymentClaim};
use super::error::PaymentError;
use super::ledger::LedgerWriter;
use super::verifier::{DecodedTransfer, TransactionVerifier};
use crate::blockchain::units::units_from_u256;
use crate::blockchain::{
    format_amount, CachedLookup, ChainCache, ChainReader, NetworkConfig, TokenBalance,
    TronAddress, TOKEN_DECIMALS,
};
use crate::storage::{
    AuditEvent, AuditRepository, CreditReceipt, LedgerDatabase, LedgerTransaction, WalletBalance,
};

/// Default page size for `list_transactions`.
pub const DEFAULT_PAGE_SIZE: usize = 20;
/// Largest page `list_transactions` will return.
pub const MAX_PAGE_SIZE: usize = 100;

// =============================================================================
// Request/Response Types
// =============================================================================

/// `get_transaction` input.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransactionQuery {
    #[serde(alias = "txHash", alias = "txId", alias = "tx_id")]
    pub tx_hash: String,
}

/// `get_account` input.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AccountQuery {
    /// On-chain address to inspect (base58 or hex)
    #[serde(default)]
    pub address: Option<String>,
}

/// `list_transactions` / `list_audit_events` input.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PageQuery {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// On-chain view of a transaction.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionView {
    pub tx_hash: String,
    /// `contractRet` reported by the node
    pub status: Option<String>,
    pub contract_type: Option<String>,
    /// Decoded transfer, when the transaction is a supported payment
    pub transfer: Option<DecodedTransfer>,
    /// Why the transfer could not be decoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decode_error: Option<String>,
    pub block_number: Option<u64>,
    /// Block timestamp in milliseconds
    pub block_timestamp: Option<i64>,
    pub explorer_url: String,
    /// The caller's ledger rows for this hash
    pub ledger_records: Vec<LedgerTransaction>,
}

/// On-chain balances of an address.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OnChainAccount {
    pub address: String,
    /// Whether the account exists on-chain
    pub activated: bool,
    pub trx: TokenBalance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usdt: Option<TokenBalance>,
}

/// `get_account` output.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccountView {
    pub user_id: String,
    /// Platform wallet balances per asset
    pub balances: Vec<WalletBalance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_chain: Option<OnChainAccount>,
}

/// A page of ledger transactions.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionPage {
    pub transactions: Vec<LedgerTransaction>,
    pub next_cursor: Option<String>,
}

/// A page of audit events.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuditPage {
    pub events: Vec<AuditEvent>,
}

// =============================================================================
// Service
// =============================================================================

/// Payment verification, crediting and lookups.
pub struct PaymentService {
    db: Arc<LedgerDatabase>,
    chain: Arc<dyn ChainReader>,
    cache: ChainCache,
    network: NetworkConfig,
    verifier: TransactionVerifier,
    ledger: LedgerWriter,
}

impl PaymentService {
    pub fn new(
        db: Arc<LedgerDatabase>,
        chain: Arc<dyn ChainReader>,
        cache: ChainCache,
        network: NetworkConfig,
        verifier: TransactionVerifier,
        ledger: LedgerWriter,
    ) -> Self {
        Self {
            db,
            chain,
            cache,
            network,
            verifier,
            ledger,
        }
    }

    /// Verify a claim on-chain and credit the caller.
    pub async fn verify_transaction(
        &self,
        user_id: &str,
        claim: &PaymentClaim,
    ) -> Result<CreditReceipt, PaymentError> {
        let claim = match claim.validate() {
            Ok(c) => c,
            Err(e) => {
                self.reject(user_id, None, &e);
                return Err(e);
            }
        };

        // Cheap pre-check; the authoritative one runs inside the ledger write.
        if let Some(ledger_id) = self.ledger.find_replay(&claim.tx_hash)? {
            tracing::debug!(
                tx_hash = %claim.tx_hash,
                ledger_id = %ledger_id,
                "Replay detected before chain lookup"
            );
            let e = PaymentError::AlreadyCredited(claim.tx_hash.clone());
            self.reject(user_id, Some(&claim.tx_hash), &e);
            return Err(e);
        }

        let result = match self.verifier.verify(&claim).await {
            Ok(verified) => self.ledger.credit(user_id, &claim, &verified),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            self.reject(user_id, Some(&claim.tx_hash), e);
        }
        result
    }

    /// Decoded on-chain view of a hash plus the caller's ledger rows for it.
    pub async fn get_transaction(
        &self,
        user_id: &str,
        query: &TransactionQuery,
    ) -> Result<TransactionView, PaymentError> {
        let tx_hash = normalize_tx_hash(&query.tx_hash)?;

        let lookup = match self.cache.get(&tx_hash) {
            Some(hit) => hit,
            None => {
                let fetched = self.verifier.fetch(&tx_hash).await?;
                self.cache.put_if_final(&tx_hash, &fetched);
                fetched
            }
        };

        let (transfer, decode_error) = match self.decode_for_view(&lookup) {
            Ok(t) => (Some(t), None),
            Err(e) => (None, Some(e.to_string())),
        };

        let ledger_records = self
            .db
            .transactions_for_hash(&tx_hash)?
            .into_iter()
            .filter(|t| t.user_id == user_id)
            .collect();

        let info = lookup.info.as_ref();
        Ok(TransactionView {
            explorer_url: format!("{}/transaction/{}", self.network.explorer_url, tx_hash),
            tx_hash,
            status: lookup.transaction.contract_result().map(str::to_string),
            contract_type: lookup.transaction.contract().map(|c| c.contract_type.clone()),
            transfer,
            decode_error,
            block_number: info.and_then(|i| i.block_number),
            block_timestamp: info.and_then(|i| i.block_timestamp),
            ledger_records,
        })
    }

    fn decode_for_view(&self, lookup: &CachedLookup) -> Result<DecodedTransfer, PaymentError> {
        match lookup.transaction.contract_result() {
            Some("SUCCESS") => self.verifier.decode(lookup),
            Some(other) => Err(PaymentError::TransactionFailed(other.to_string())),
            None => Err(PaymentError::TransactionFailed("no contract result".to_string())),
        }
    }

    /// Platform balances, plus on-chain balances when an address is given.
    pub async fn get_account(
        &self,
        user_id: &str,
        query: &AccountQuery,
    ) -> Result<AccountView, PaymentError> {
        let balances = self.db.wallet_balances(user_id)?;

        let on_chain = match query.address.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            Some(raw) => {
                let address: TronAddress =
                    raw.parse().map_err(|e: crate::blockchain::AddressError| {
                        PaymentError::InvalidAddress(e.to_string())
                    })?;
                Some(self.on_chain_account(&address).await?)
            }
            None => None,
        };

        Ok(AccountView {
            user_id: user_id.to_string(),
            balances,
            on_chain,
        })
    }

    async fn on_chain_account(
        &self,
        address: &TronAddress,
    ) -> Result<OnChainAccount, PaymentError> {
        let account = self.chain.get_account(address).await?;
        let sun = account.as_ref().map(|a| a.balance).unwrap_or(0);

        let usdt = match self.verifier.settings().usdt_contract {
            Some(contract) => {
                let raw = self.chain.trc20_balance_of(&contract, address).await?;
                let formatted = units_from_u256(raw)
                    .map(|u| format_amount(u, TOKEN_DECIMALS))
                    .unwrap_or_else(|_| raw.to_string());
                Some(TokenBalance {
                    symbol: "USDT".to_string(),
                    balance_raw: raw.to_string(),
                    balance_formatted: formatted,
                    decimals: TOKEN_DECIMALS,
                    contract_address: Some(contract.to_base58()),
                })
            }
            None => None,
        };

        Ok(OnChainAccount {
            address: address.to_base58(),
            activated: account.is_some(),
            trx: TokenBalance {
                symbol: "TRX".to_string(),
                balance_raw: sun.to_string(),
                balance_formatted: format_amount(sun, TOKEN_DECIMALS),
                decimals: TOKEN_DECIMALS,
                contract_address: None,
            },
            usdt,
        })
    }

    /// The caller's ledger transactions, newest first.
    pub fn list_transactions(
        &self,
        user_id: &str,
        query: &PageQuery,
    ) -> Result<TransactionPage, PaymentError> {
        let limit = page_size(query.limit);
        let (transactions, next_cursor) =
            self.db.list_by_user(user_id, query.cursor.as_deref(), limit)?;
        Ok(TransactionPage {
            transactions,
            next_cursor,
        })
    }

    /// The caller's recent audit events, newest first.
    pub fn list_audit_events(
        &self,
        user_id: &str,
        query: &PageQuery,
    ) -> Result<AuditPage, PaymentError> {
        let events =
            AuditRepository::new(&self.db).events_for_user(user_id, page_size(query.limit))?;
        Ok(AuditPage { events })
    }

    fn reject(&self, user_id: &str, tx_hash: Option<&str>, error: &PaymentError) {
        if error.is_rejection() {
            tracing::info!(
                user_id = %user_id,
                tx_hash = tx_hash.unwrap_or("-"),
                error_code = error.error_code(),
                "Payment claim rejected: {}", error
            );
        } else {
            tracing::error!(
                user_id = %user_id,
                tx_hash = tx_hash.unwrap_or("-"),
                error_code = error.error_code(),
                "Payment claim failed: {}", error
            );
        }
        self.ledger.record_rejection(user_id, tx_hash, error);
    }
}

fn page_size(requested: Option<usize>) -> usize {
    requested.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}
