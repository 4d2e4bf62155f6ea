// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment verification and crediting errors.

use crate::blockchain::ChainError;
use crate::storage::LedgerDbError;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Invalid transaction hash: expected 64 hex characters")]
    InvalidTxHash,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Missing {0} for this payment type")]
    MissingTarget(&'static str),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Transaction failed on-chain: {0}")]
    TransactionFailed(String),

    #[error("Unsupported contract type: {0}")]
    UnsupportedContract(String),

    #[error("Malformed transaction data: {0}")]
    MalformedTransaction(String),

    #[error("No USDT transfer event found in transaction")]
    NoTransferEvent,

    #[error("Transaction contains {0} matching USDT transfers")]
    AmbiguousTransfer(usize),

    #[error("Payment was sent to {actual}, expected {expected}")]
    WrongRecipient { expected: String, actual: String },

    #[error("Transaction has {actual} confirmations, {required} required")]
    InsufficientConfirmations { required: u64, actual: u64 },

    #[error("Amount mismatch: claimed {claimed}, transferred {actual}")]
    AmountMismatch { claimed: String, actual: String },

    #[error("Transaction {0} has already been credited")]
    AlreadyCredited(String),

    #[error("Blockchain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Ledger error: {0}")]
    Ledger(LedgerDbError),
}

impl From<LedgerDbError> for PaymentError {
    fn from(e: LedgerDbError) -> Self {
        match e {
            LedgerDbError::AlreadyCredited { tx_hash, .. } => {
                PaymentError::AlreadyCredited(tx_hash)
            }
            other => PaymentError::Ledger(other),
        }
    }
}

impl PaymentError {
    /// Stable machine-readable code for the edge response.
    pub fn error_code(&self) -> &'static str {
        match self {
            PaymentError::InvalidTxHash => "invalid_tx_hash",
            PaymentError::InvalidAmount(_) => "invalid_amount",
            PaymentError::MissingTarget(_) => "missing_target",
            PaymentError::InvalidAddress(_) => "invalid_address",
            PaymentError::TransactionNotFound(_) => "transaction_not_found",
            PaymentError::TransactionFailed(_) => "transaction_failed",
            PaymentError::UnsupportedContract(_) => "unsupported_contract",
            PaymentError::MalformedTransaction(_) => "malformed_transaction",
            PaymentError::NoTransferEvent => "no_transfer_event",
            PaymentError::AmbiguousTransfer(_) => "ambiguous_transfer",
            PaymentError::WrongRecipient { .. } => "wrong_recipient",
            PaymentError::InsufficientConfirmations { .. } => "insufficient_confirmations",
            PaymentError::AmountMismatch { .. } => "amount_mismatch",
            PaymentError::AlreadyCredited(_) => "already_credited",
            PaymentError::Chain(_) => "chain_error",
            PaymentError::Ledger(LedgerDbError::BalanceOverflow { .. }) => "balance_overflow",
            PaymentError::Ledger(_) => "ledger_error",
        }
    }

    /// Whether the claim itself was judged invalid (as opposed to an
    /// infrastructure failure while judging it).
    pub fn is_rejection(&self) -> bool {
        !matches!(self, PaymentError::Chain(_) | PaymentError::Ledger(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_replay_maps_to_already_credited() {
        let err: PaymentError = LedgerDbError::AlreadyCredited {
            tx_hash: "ab".to_string(),
            ledger_id: "id".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "already_credited");
        assert!(err.is_rejection());

        let overflow: PaymentError = LedgerDbError::BalanceOverflow {
            user_id: "u".to_string(),
            asset: "USDT".to_string(),
        }
        .into();
        assert_eq!(overflow.error_code(), "balance_overflow");
        assert!(!overflow.is_rejection());
    }

    #[test]
    fn chain_errors_are_not_rejections() {
        let err = PaymentError::from(ChainError::Transport("timeout".to_string()));
        assert_eq!(err.error_code(), "chain_error");
        assert!(!err.is_rejection());
    }
}
