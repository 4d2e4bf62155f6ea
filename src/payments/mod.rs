// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment verification and ledger crediting.
//!
//! A client claims it paid; the verifier checks the claim against the chain
//! and the ledger writer credits the caller's wallet.

pub mod claim;
pub mod error;
pub mod ledger;
pub mod service;
pub mod verifier;

pub use claim::{normalize_tx_hash, PaymentClaim, ValidatedClaim};
pub use error::PaymentError;
pub use ledger::LedgerWriter;
pub use service::{
    AccountQuery, AccountView, AuditPage, OnChainAccount, PageQuery, PaymentService,
    TransactionPage, TransactionQuery, TransactionView,
};
pub use verifier::{DecodedTransfer, TransactionVerifier, VerifiedTransfer, VerifierSettings};
