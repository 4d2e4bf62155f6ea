// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! On-chain verification of payment claims.
//!
//! The verifier reads the transaction from the node, extracts the single
//! transfer it represents and compares it against the claim. It never
//! writes anything.

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use super::claim::ValidatedClaim;
use super::error::PaymentError;
use crate::blockchain::trc20::decode_transfer_log;
use crate::blockchain::units::units_from_u256;
use crate::blockchain::{
    format_amount, Asset, CachedLookup, ChainReader, RawTransaction, TronAddress, TOKEN_DECIMALS,
};

const TRANSFER_CONTRACT: &str = "TransferContract";
const TRIGGER_SMART_CONTRACT: &str = "TriggerSmartContract";
const SUCCESS: &str = "SUCCESS";

/// Verification rules.
#[derive(Debug, Clone)]
pub struct VerifierSettings {
    /// TRC20 USDT contract whose `Transfer` events count as payments
    pub usdt_contract: Option<TronAddress>,
    /// Platform receiving address; when set every payment must go there
    pub treasury: Option<TronAddress>,
    /// Accepted |claimed - transferred| in micro-units (inclusive)
    pub tolerance_units: u64,
    /// Blocks required on top of the inclusion block (0 = none)
    pub min_confirmations: u64,
}

/// The single transfer a transaction represents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DecodedTransfer {
    pub asset: Asset,
    #[schema(value_type = String)]
    pub from: TronAddress,
    #[schema(value_type = String)]
    pub to: TronAddress,
    /// Micro-units
    pub amount_units: u64,
    /// Human-readable amount
    pub amount: String,
}

/// A transfer that matched a claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedTransfer {
    pub tx_hash: String,
    pub transfer: DecodedTransfer,
    pub block_number: Option<u64>,
}

/// Checks claims against the chain.
pub struct TransactionVerifier {
    chain: Arc<dyn ChainReader>,
    settings: VerifierSettings,
}

impl TransactionVerifier {
    pub fn new(chain: Arc<dyn ChainReader>, settings: VerifierSettings) -> Self {
        Self { chain, settings }
    }

    pub fn settings(&self) -> &VerifierSettings {
        &self.settings
    }

    /// Fetch a transaction and its info. Unknown hashes are an error.
    pub async fn fetch(&self, tx_hash: &str) -> Result<CachedLookup, PaymentError> {
        let transaction = self
            .chain
            .get_transaction(tx_hash)
            .await?
            .ok_or_else(|| PaymentError::TransactionNotFound(tx_hash.to_string()))?;
        let info = self.chain.get_transaction_info(tx_hash).await?;
        Ok(CachedLookup { transaction, info })
    }

    /// Verify a validated claim against the chain.
    pub async fn verify(&self, claim: &ValidatedClaim) -> Result<VerifiedTransfer, PaymentError> {
        let lookup = self.fetch(&claim.tx_hash).await?;
        require_success(&lookup.transaction)?;

        let transfer = self.decode(&lookup)?;

        if let Some(treasury) = &self.settings.treasury {
            if transfer.to != *treasury {
                return Err(PaymentError::WrongRecipient {
                    expected: treasury.to_base58(),
                    actual: transfer.to.to_base58(),
                });
            }
        }

        let block_number = lookup.info.as_ref().and_then(|i| i.block_number);
        self.check_confirmations(block_number).await?;

        let diff = transfer.amount_units.abs_diff(claim.amount_units);
        if diff > self.settings.tolerance_units {
            return Err(PaymentError::AmountMismatch {
                claimed: claim.amount(),
                actual: transfer.amount.clone(),
            });
        }

        tracing::debug!(
            tx_hash = %claim.tx_hash,
            asset = transfer.asset.as_str(),
            amount = %transfer.amount,
            "Payment verified on-chain"
        );

        Ok(VerifiedTransfer {
            tx_hash: claim.tx_hash.clone(),
            transfer,
            block_number,
        })
    }

    /// Extract the transfer from a successful transaction.
    pub fn decode(&self, lookup: &CachedLookup) -> Result<DecodedTransfer, PaymentError> {
        let contract = lookup
            .transaction
            .contract()
            .ok_or_else(|| {
                PaymentError::MalformedTransaction("no contract in transaction".into())
            })?;

        match contract.contract_type.as_str() {
            TRANSFER_CONTRACT => {
                let value = &contract.parameter.value;
                let from = parse_hex_address(value.owner_address.as_deref(), "owner_address")?;
                let to = parse_hex_address(value.to_address.as_deref(), "to_address")?;
                let amount_units = value
                    .amount
                    .ok_or_else(|| PaymentError::MalformedTransaction("missing amount".into()))?;
                Ok(DecodedTransfer {
                    asset: Asset::Trx,
                    from,
                    to,
                    amount_units,
                    amount: format_amount(amount_units, TOKEN_DECIMALS),
                })
            }
            TRIGGER_SMART_CONTRACT => self.decode_trc20(lookup),
            other => Err(PaymentError::UnsupportedContract(other.to_string())),
        }
    }

    fn decode_trc20(&self, lookup: &CachedLookup) -> Result<DecodedTransfer, PaymentError> {
        let usdt = self.settings.usdt_contract.ok_or_else(|| {
            PaymentError::UnsupportedContract(format!(
                "{TRIGGER_SMART_CONTRACT} (no USDT contract configured)"
            ))
        })?;

        let info = lookup.info.as_ref().ok_or_else(|| {
            PaymentError::TransactionNotFound(format!(
                "{} (receipt not yet available)",
                lookup.transaction.tx_id
            ))
        })?;

        if let Some(result) = info.receipt.as_ref().and_then(|r| r.result.as_deref()) {
            if result != SUCCESS {
                return Err(PaymentError::TransactionFailed(result.to_string()));
            }
        }

        let mut transfers = Vec::new();
        for log in &info.log {
            let emitter = TronAddress::from_hex(&log.address).ok();
            if emitter != Some(usdt) {
                continue;
            }
            match decode_transfer_log(log) {
                None => {}
                Some(Ok(transfer)) => transfers.push(transfer),
                Some(Err(e)) => return Err(PaymentError::MalformedTransaction(e.to_string())),
            }
        }

        if let Some(treasury) = &self.settings.treasury {
            let before = transfers.len();
            transfers.retain(|t| t.to == *treasury);
            if transfers.is_empty() && before > 0 {
                return Err(PaymentError::WrongRecipient {
                    expected: treasury.to_base58(),
                    actual: "another address".to_string(),
                });
            }
        }

        let transfer = match transfers.len() {
            0 => return Err(PaymentError::NoTransferEvent),
            1 => transfers.remove(0),
            n => return Err(PaymentError::AmbiguousTransfer(n)),
        };

        let amount_units = units_from_u256(transfer.value)
            .map_err(|_| PaymentError::MalformedTransaction("transfer value exceeds u64".into()))?;

        Ok(DecodedTransfer {
            asset: Asset::Usdt,
            from: transfer.from,
            to: transfer.to,
            amount_units,
            amount: format_amount(amount_units, TOKEN_DECIMALS),
        })
    }

    async fn check_confirmations(&self, block_number: Option<u64>) -> Result<(), PaymentError> {
        let required = self.settings.min_confirmations;
        if required == 0 {
            return Ok(());
        }
        let actual = match block_number {
            Some(block) => {
                let head = self.chain.current_block_number().await?;
                head.saturating_sub(block)
            }
            None => 0,
        };
        if actual < required {
            return Err(PaymentError::InsufficientConfirmations { required, actual });
        }
        Ok(())
    }
}

fn require_success(tx: &RawTransaction) -> Result<(), PaymentError> {
    match tx.contract_result() {
        Some(SUCCESS) => Ok(()),
        Some(other) => Err(PaymentError::TransactionFailed(other.to_string())),
        None => Err(PaymentError::TransactionFailed("no contract result".to_string())),
    }
}

fn parse_hex_address(raw: Option<&str>, field: &str) -> Result<TronAddress, PaymentError> {
    let raw = raw.ok_or_else(|| PaymentError::MalformedTransaction(format!("missing {field}")))?;
    TronAddress::from_hex(raw)
        .map_err(|e| PaymentError::MalformedTransaction(format!("{field}: {e}")))
}
