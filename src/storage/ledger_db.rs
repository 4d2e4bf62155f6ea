// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded payment ledger backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `transactions`: ledger id → serialized LedgerTransaction
//! - `tx_hash_index`: on-chain hash → ledger ids (multimap)
//! - `user_tx_index`: composite key (len|user|!timestamp|id) → asset
//! - `wallets`: `user|ASSET` → serialized WalletBalance
//! - `content_purchases`, `subscriptions`, `creator_support`: id → record
//! - `audit_log`: composite key (len|user|!timestamp|event_id) → AuditEvent
//!
//! A claim is credited in a single write transaction: the replay check, the
//! transaction row, the wallet update and the purpose record either all
//! commit or none do.

use std::path::Path;
use std::str::FromStr;

use redb::{
    Database, MultimapTableDefinition, ReadableDatabase, ReadableMultimapTable, ReadableTable,
    ReadableTableMetadata, TableDefinition, WriteTransaction,
};
use serde::{Deserialize, Serialize};

use super::records::{CreditReceipt, LedgerTransaction, Purpose, PurposeRecord, WalletBalance};
use crate::blockchain::Asset;

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: ledger id → serialized LedgerTransaction (JSON bytes).
const TRANSACTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("transactions");

/// Index: lowercase on-chain hash → ledger ids.
const TX_HASH_INDEX: MultimapTableDefinition<&str, &str> =
    MultimapTableDefinition::new("tx_hash_index");

/// Index: composite key → asset symbol.
/// Key format: `len|user|!timestamp_be|id` for descending-time range scans.
const USER_TX_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("user_tx_index");

/// Wallets: `user|ASSET` → serialized WalletBalance.
const WALLETS: TableDefinition<&str, &[u8]> = TableDefinition::new("wallets");

const CONTENT_PURCHASES: TableDefinition<&str, &[u8]> = TableDefinition::new("content_purchases");
const SUBSCRIPTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("subscriptions");
const CREATOR_SUPPORT: TableDefinition<&str, &[u8]> = TableDefinition::new("creator_support");

/// Audit log: `len|user|!timestamp_be|event_id` → serialized AuditEvent.
pub(super) const AUDIT_LOG: TableDefinition<&[u8], &[u8]> = TableDefinition::new("audit_log");

// =============================================================================
// Replay policy
// =============================================================================

/// What to do when a claim names an on-chain hash that was already credited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayPolicy {
    /// One credit per on-chain hash, across all users.
    #[default]
    Reject,
    /// Credit every claim. Only for reproducing legacy ledgers.
    Allow,
}

impl FromStr for ReplayPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(ReplayPolicy::Reject),
            "allow" => Ok(ReplayPolicy::Allow),
            other => Err(format!("unknown replay policy '{other}' (expected reject or allow)")),
        }
    }
}

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LedgerDbError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("transaction {tx_hash} was already credited as {ledger_id}")]
    AlreadyCredited { tx_hash: String, ledger_id: String },

    #[error("balance overflow for {user_id} ({asset})")]
    BalanceOverflow { user_id: String, asset: String },
}

pub type LedgerDbResult<T> = Result<T, LedgerDbError>;

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite key: `len(user) | user | inverted_timestamp_be_bytes | id`.
///
/// The user segment is length-prefixed so no user's range covers another
/// user whose id merely starts with it. The inverted timestamp ensures
/// newest-first ordering when scanning forward.
pub(super) fn make_index_key(user_id: &str, timestamp_micros: i64, id: &str) -> Vec<u8> {
    let mut key = make_prefix(user_id);
    key.reserve(8 + 1 + id.len());
    key.extend_from_slice(&(!timestamp_micros as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(id.as_bytes());
    key
}

/// Prefix for range scanning all keys of a user.
pub(super) fn make_prefix(user_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(4 + user_id.len() + 1);
    prefix.extend_from_slice(&(user_id.len() as u32).to_be_bytes());
    prefix.extend_from_slice(user_id.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Upper bound for a range scan (prefix with 0xFF bytes appended).
pub(super) fn make_prefix_end(user_id: &str) -> Vec<u8> {
    let mut end = make_prefix(user_id);
    end.extend_from_slice(&[0xFF; 20]);
    end
}

/// Extract the trailing id from a composite key.
///
/// The timestamp bytes may contain `|`, so the id is located by offset.
pub(super) fn extract_id_from_key(key: &[u8], prefix_len: usize) -> Option<String> {
    let id_start = prefix_len + 8 + 1;
    key.get(id_start..)
        .and_then(|id| String::from_utf8(id.to_vec()).ok())
}

fn wallet_key(user_id: &str, asset: Asset) -> String {
    format!("{user_id}|{}", asset.as_str())
}

pub(super) fn encode_cursor(key: &[u8]) -> String {
    alloy::hex::encode(key)
}

pub(super) fn decode_cursor(cursor: &str) -> Option<Vec<u8>> {
    alloy::hex::decode(cursor).ok()
}

// =============================================================================
// LedgerDatabase
// =============================================================================

/// Embedded ACID ledger.
pub struct LedgerDatabase {
    db: Database,
}

impl LedgerDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> LedgerDbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(TRANSACTIONS)?;
            let _ = write_txn.open_multimap_table(TX_HASH_INDEX)?;
            let _ = write_txn.open_table(USER_TX_INDEX)?;
            let _ = write_txn.open_table(WALLETS)?;
            let _ = write_txn.open_table(CONTENT_PURCHASES)?;
            let _ = write_txn.open_table(SUBSCRIPTIONS)?;
            let _ = write_txn.open_table(CREATOR_SUPPORT)?;
            let _ = write_txn.open_table(AUDIT_LOG)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub(super) fn database(&self) -> &Database {
        &self.db
    }

    /// Verify the database can serve a read transaction.
    pub fn health_check(&self) -> LedgerDbResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(TRANSACTIONS)?;
        Ok(())
    }

    // =========================================================================
    // Crediting
    // =========================================================================

    /// Record an accepted claim: transaction row, wallet credit and purpose
    /// record, all in one write transaction.
    ///
    /// With [`ReplayPolicy::Reject`] a hash that already has a ledger row
    /// fails with [`LedgerDbError::AlreadyCredited`]. The check runs inside
    /// the write transaction, so concurrent claims for the same hash cannot
    /// both pass it.
    pub fn credit(
        &self,
        tx: &LedgerTransaction,
        record: &PurposeRecord,
        policy: ReplayPolicy,
    ) -> LedgerDbResult<CreditReceipt> {
        let write_txn = self.db.begin_write()?;
        match Self::apply_credit(&write_txn, tx, record, policy) {
            Ok(wallet) => {
                write_txn.commit()?;
                Ok(CreditReceipt {
                    transaction: tx.clone(),
                    wallet,
                    record: record.clone(),
                })
            }
            Err(e) => {
                write_txn.abort()?;
                Err(e)
            }
        }
    }

    fn apply_credit(
        write_txn: &WriteTransaction,
        tx: &LedgerTransaction,
        record: &PurposeRecord,
        policy: ReplayPolicy,
    ) -> LedgerDbResult<WalletBalance> {
        let hash = tx.tron_tx_id.to_lowercase();

        let mut hash_index = write_txn.open_multimap_table(TX_HASH_INDEX)?;
        if policy == ReplayPolicy::Reject {
            let mut existing = hash_index.get(hash.as_str())?;
            if let Some(entry) = existing.next() {
                return Err(LedgerDbError::AlreadyCredited {
                    tx_hash: hash,
                    ledger_id: entry?.value().to_string(),
                });
            }
        }
        hash_index.insert(hash.as_str(), tx.id.as_str())?;

        let mut tx_table = write_txn.open_table(TRANSACTIONS)?;
        tx_table.insert(tx.id.as_str(), serde_json::to_vec(tx)?.as_slice())?;

        let mut idx_table = write_txn.open_table(USER_TX_INDEX)?;
        let key = make_index_key(&tx.user_id, tx.created_at.timestamp_micros(), &tx.id);
        idx_table.insert(key.as_slice(), tx.asset.as_str())?;

        let mut wallets = write_txn.open_table(WALLETS)?;
        let wkey = wallet_key(&tx.user_id, tx.asset);
        let current = match wallets.get(wkey.as_str())? {
            Some(value) => serde_json::from_slice(value.value())?,
            None => WalletBalance::empty(&tx.user_id, tx.asset),
        };
        let updated = current.checked_credit(tx.amount_units).ok_or_else(|| {
            LedgerDbError::BalanceOverflow {
                user_id: tx.user_id.clone(),
                asset: tx.asset.as_str().to_string(),
            }
        })?;
        wallets.insert(wkey.as_str(), serde_json::to_vec(&updated)?.as_slice())?;

        let mut purpose_table = write_txn.open_table(purpose_table(record.purpose()))?;
        purpose_table.insert(record.id(), serde_json::to_vec(record)?.as_slice())?;

        Ok(updated)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Look up a single ledger row by id.
    pub fn get_transaction(&self, id: &str) -> LedgerDbResult<Option<LedgerTransaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSACTIONS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All ledger rows recorded for an on-chain hash.
    pub fn transactions_for_hash(&self, tx_hash: &str) -> LedgerDbResult<Vec<LedgerTransaction>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_multimap_table(TX_HASH_INDEX)?;
        let table = read_txn.open_table(TRANSACTIONS)?;

        let mut rows = Vec::new();
        for id in index.get(tx_hash.to_lowercase().as_str())? {
            let id = id?;
            if let Some(value) = table.get(id.value())? {
                rows.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok(rows)
    }

    /// Paginated listing of a user's ledger rows, newest first.
    ///
    /// Returns `(transactions, next_cursor)`.
    pub fn list_by_user(
        &self,
        user_id: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> LedgerDbResult<(Vec<LedgerTransaction>, Option<String>)> {
        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(USER_TX_INDEX)?;
        let tx_table = read_txn.open_table(TRANSACTIONS)?;

        let prefix = make_prefix(user_id);
        let prefix_end = make_prefix_end(user_id);

        // A cursor from another user's listing must not leak rows
        let decoded = cursor
            .and_then(decode_cursor)
            .filter(|k| k.starts_with(&prefix));
        let skip_cursor = decoded.is_some();
        let start = decoded.unwrap_or_else(|| prefix.clone());

        let mut results = Vec::with_capacity(limit);
        let mut skip_first = skip_cursor;
        let mut last_key: Option<Vec<u8>> = None;

        for entry in idx_table.range(start.as_slice()..prefix_end.as_slice())? {
            let (key, _) = entry?;
            let key_bytes = key.value().to_vec();

            // Skip the cursor entry itself
            if skip_first {
                skip_first = false;
                if key_bytes == start {
                    continue;
                }
            }

            if let Some(id) = extract_id_from_key(&key_bytes, prefix.len()) {
                if let Some(value) = tx_table.get(id.as_str())? {
                    let tx: LedgerTransaction = serde_json::from_slice(value.value())?;
                    if tx.user_id == user_id {
                        results.push(tx);
                        last_key = Some(key_bytes);
                    }
                }
            }

            if results.len() >= limit {
                break;
            }
        }

        let next_cursor = if results.len() >= limit {
            last_key.map(|k| encode_cursor(&k))
        } else {
            None
        };

        Ok((results, next_cursor))
    }

    /// Balance for one user and asset (zero when never credited).
    pub fn wallet_balance(&self, user_id: &str, asset: Asset) -> LedgerDbResult<WalletBalance> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLETS)?;
        match table.get(wallet_key(user_id, asset).as_str())? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Ok(WalletBalance::empty(user_id, asset)),
        }
    }

    /// Balances for every asset.
    pub fn wallet_balances(&self, user_id: &str) -> LedgerDbResult<Vec<WalletBalance>> {
        [Asset::Trx, Asset::Usdt]
            .into_iter()
            .map(|asset| self.wallet_balance(user_id, asset))
            .collect()
    }

    /// Look up a purpose record by id.
    pub fn get_purpose_record(
        &self,
        purpose: Purpose,
        id: &str,
    ) -> LedgerDbResult<Option<PurposeRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(purpose_table(purpose))?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Number of ledger rows.
    pub fn transaction_count(&self) -> LedgerDbResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSACTIONS)?;
        Ok(table.len()?)
    }
}

fn purpose_table(purpose: Purpose) -> TableDefinition<'static, &'static str, &'static [u8]> {
    match purpose {
        Purpose::ContentPurchase => CONTENT_PURCHASES,
        Purpose::Subscription => SUBSCRIPTIONS,
        Purpose::CreatorSupport => CREATOR_SUPPORT,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::records::TxStatus;
    use chrono::{Duration, Utc};

    pub(crate) fn temp_db() -> (LedgerDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = LedgerDatabase::open(&dir.path().join("ledger.redb")).unwrap();
        (db, dir)
    }

    fn ledger_tx(user: &str, hash: &str, units: u64, purpose: Purpose) -> LedgerTransaction {
        LedgerTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.to_string(),
            asset: Asset::Usdt,
            amount_units: units,
            amount: crate::blockchain::format_amount(units, 6),
            purpose,
            status: TxStatus::Completed,
            tron_tx_id: hash.to_string(),
            reference_id: "content-1".to_string(),
            from_address: "TPayer".to_string(),
            to_address: "TTreasury".to_string(),
            block_number: Some(1),
            created_at: Utc::now(),
        }
    }

    fn credit(
        db: &LedgerDatabase,
        tx: &LedgerTransaction,
        policy: ReplayPolicy,
    ) -> LedgerDbResult<CreditReceipt> {
        let record = PurposeRecord::for_transaction(tx, Duration::days(30));
        db.credit(tx, &record, policy)
    }

    #[test]
    fn credit_writes_all_rows() {
        let (db, _dir) = temp_db();
        let tx = ledger_tx("user-1", &"aa".repeat(32), 2_500_000, Purpose::ContentPurchase);
        let receipt = credit(&db, &tx, ReplayPolicy::Reject).unwrap();

        assert_eq!(receipt.wallet.balance_units, 2_500_000);
        assert_eq!(receipt.wallet.balance, "2.5");
        assert_eq!(db.get_transaction(&tx.id).unwrap().unwrap(), tx);
        assert_eq!(db.transactions_for_hash(&"AA".repeat(32)).unwrap().len(), 1);
        assert_eq!(
            db.wallet_balance("user-1", Asset::Usdt).unwrap().balance_units,
            2_500_000
        );
        assert_eq!(db.wallet_balance("user-1", Asset::Trx).unwrap().balance_units, 0);

        let stored = db
            .get_purpose_record(Purpose::ContentPurchase, receipt.record.id())
            .unwrap()
            .unwrap();
        assert!(matches!(
            stored,
            PurposeRecord::ContentPurchase(ref p) if p.transaction_id == tx.id
        ));
    }

    #[test]
    fn reject_policy_blocks_second_credit() {
        let (db, _dir) = temp_db();
        let hash = "bb".repeat(32);
        let first = ledger_tx("user-1", &hash, 1_000_000, Purpose::CreatorSupport);
        credit(&db, &first, ReplayPolicy::Reject).unwrap();

        // Same hash claimed by another user
        let second = ledger_tx("user-2", &hash, 1_000_000, Purpose::CreatorSupport);
        let err = credit(&db, &second, ReplayPolicy::Reject).unwrap_err();
        assert!(matches!(err, LedgerDbError::AlreadyCredited { .. }));

        assert_eq!(db.transaction_count().unwrap(), 1);
        assert_eq!(
            db.wallet_balance("user-2", Asset::Usdt).unwrap().balance_units,
            0
        );
    }

    #[test]
    fn allow_policy_credits_every_claim() {
        let (db, _dir) = temp_db();
        let hash = "cc".repeat(32);
        for _ in 0..2 {
            let tx = ledger_tx("user-1", &hash, 1_000_000, Purpose::ContentPurchase);
            credit(&db, &tx, ReplayPolicy::Allow).unwrap();
        }
        assert_eq!(db.transactions_for_hash(&hash).unwrap().len(), 2);
        assert_eq!(
            db.wallet_balance("user-1", Asset::Usdt).unwrap().balance_units,
            2_000_000
        );
    }

    #[test]
    fn overflow_rolls_back_everything() {
        let (db, _dir) = temp_db();
        let full = ledger_tx("user-1", &"dd".repeat(32), u64::MAX, Purpose::ContentPurchase);
        credit(&db, &full, ReplayPolicy::Reject).unwrap();

        let second = ledger_tx("user-1", &"ee".repeat(32), 1, Purpose::Subscription);
        let err = credit(&db, &second, ReplayPolicy::Reject).unwrap_err();
        assert!(matches!(err, LedgerDbError::BalanceOverflow { .. }));

        assert_eq!(db.transaction_count().unwrap(), 1);
        assert!(db.get_transaction(&second.id).unwrap().is_none());
        assert!(db.transactions_for_hash(&second.tron_tx_id).unwrap().is_empty());
        assert_eq!(
            db.wallet_balance("user-1", Asset::Usdt).unwrap().balance_units,
            u64::MAX
        );
        let (rows, _) = db.list_by_user("user-1", None, 10).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn list_by_user_with_pagination() {
        let (db, _dir) = temp_db();
        for i in 0..5 {
            let mut tx = ledger_tx("user-1", &format!("{i:064x}"), 1, Purpose::ContentPurchase);
            tx.created_at = Utc::now() - Duration::seconds(5 - i);
            credit(&db, &tx, ReplayPolicy::Reject).unwrap();
        }
        let other = ledger_tx("user-2", &"ff".repeat(32), 1, Purpose::ContentPurchase);
        credit(&db, &other, ReplayPolicy::Reject).unwrap();

        let (page1, cursor) = db.list_by_user("user-1", None, 2).unwrap();
        assert_eq!(page1.len(), 2);
        assert!(page1[0].created_at > page1[1].created_at, "newest first");
        assert!(cursor.is_some());

        let (page2, cursor2) = db.list_by_user("user-1", cursor.as_deref(), 2).unwrap();
        assert_eq!(page2.len(), 2);
        assert!(cursor2.is_some());

        let (page3, cursor3) = db.list_by_user("user-1", cursor2.as_deref(), 2).unwrap();
        assert_eq!(page3.len(), 1);
        assert!(cursor3.is_none());
        assert!(page3.iter().all(|t| t.user_id == "user-1"));
    }

    #[test]
    fn foreign_cursor_starts_from_own_prefix() {
        let (db, _dir) = temp_db();
        let own = ledger_tx("user-1", &"01".repeat(32), 1, Purpose::ContentPurchase);
        let foreign = ledger_tx("user-2", &"02".repeat(32), 1, Purpose::ContentPurchase);
        credit(&db, &own, ReplayPolicy::Reject).unwrap();
        credit(&db, &foreign, ReplayPolicy::Reject).unwrap();

        let (_, cursor) = db.list_by_user("user-2", None, 1).unwrap();
        let (rows, _) = db.list_by_user("user-1", cursor.as_deref(), 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, "user-1");
    }

    #[test]
    fn listing_excludes_users_sharing_an_id_prefix() {
        let (db, _dir) = temp_db();
        let own = ledger_tx("a", &"03".repeat(32), 1, Purpose::ContentPurchase);
        let nested = ledger_tx("a|b", &"04".repeat(32), 7, Purpose::ContentPurchase);
        credit(&db, &own, ReplayPolicy::Reject).unwrap();
        credit(&db, &nested, ReplayPolicy::Reject).unwrap();

        let (rows, _) = db.list_by_user("a", None, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, own.id);

        let (rows, _) = db.list_by_user("a|b", None, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, nested.id);
    }

    #[test]
    fn index_prefixes_do_not_nest() {
        let short = make_prefix("a");
        let key = make_index_key("a|b", 1000, "x");
        let end = make_prefix_end("a");
        assert!(!key.starts_with(&short));
        assert!(!(short.as_slice() <= key.as_slice() && key.as_slice() < end.as_slice()));
    }

    #[test]
    fn make_index_key_ordering() {
        let key_old = make_index_key("user", 1000, "a");
        let key_new = make_index_key("user", 2000, "b");
        assert!(key_new < key_old, "Newer timestamps should sort first");
        let prefix_len = make_prefix("user").len();
        assert_eq!(extract_id_from_key(&key_new, prefix_len).as_deref(), Some("b"));

        // Inverted timestamp containing a pipe byte
        let piped = make_index_key("user", !0x7c7c_7c7c_7c7c_7c7c_u64 as i64, "c");
        assert_eq!(extract_id_from_key(&piped, prefix_len).as_deref(), Some("c"));
    }

    #[test]
    fn replay_policy_parses() {
        assert_eq!("Reject".parse::<ReplayPolicy>().unwrap(), ReplayPolicy::Reject);
        assert_eq!(" allow ".parse::<ReplayPolicy>().unwrap(), ReplayPolicy::Allow);
        assert!("maybe".parse::<ReplayPolicy>().is_err());
        assert_eq!(ReplayPolicy::default(), ReplayPolicy::Reject);
    }
}
