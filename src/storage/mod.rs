// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Storage Module
//!
//! Persistent payment ledger in a single redb file under `DATA_DIR`.
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   ledger.redb    # transactions, wallets, purpose records, audit log
//! ```

pub mod audit;
pub mod ledger_db;
pub mod records;

pub use audit::{AuditEvent, AuditEventType, AuditRepository};
pub use ledger_db::{LedgerDatabase, LedgerDbError, LedgerDbResult, ReplayPolicy};
pub use records::{
    ContentPurchase, CreatorSupport, CreditReceipt, LedgerTransaction, Purpose, PurposeRecord,
    Subscription, SubscriptionStatus, TxStatus, WalletBalance,
};

/// File name of the ledger database inside the data directory.
pub const LEDGER_FILE: &str = "ledger.redb";
