// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for payment claims.
//!
//! Every claim that reaches the ledger leaves an audit event, whether it was
//! credited, rejected by verification or blocked as a replay.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ledger_db::{
    make_index_key, make_prefix, make_prefix_end, LedgerDatabase, LedgerDbResult, AUDIT_LOG,
};

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    ClaimCredited,
    ClaimRejected,
    ReplayBlocked,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// User who submitted the claim.
    pub user_id: String,
    /// On-chain transaction hash, when the claim named one.
    pub tron_tx_id: Option<String>,
    /// Ledger row written, for credited claims.
    pub ledger_id: Option<String>,
    /// Additional details as JSON.
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    /// Whether the claim was credited.
    pub success: bool,
    /// Machine-readable rejection code.
    pub error: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event for a user.
    pub fn new(event_type: AuditEventType, user_id: impl Into<String>) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            user_id: user_id.into(),
            tron_tx_id: None,
            ledger_id: None,
            details: None,
            success: event_type == AuditEventType::ClaimCredited,
            error: None,
        }
    }

    pub fn with_tx_hash(mut self, tx_hash: impl Into<String>) -> Self {
        self.tron_tx_id = Some(tx_hash.into());
        self
    }

    pub fn with_ledger_id(mut self, ledger_id: impl Into<String>) -> Self {
        self.ledger_id = Some(ledger_id.into());
        self
    }

    /// Add details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with an error code.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Repository for audit events.
pub struct AuditRepository<'a> {
    db: &'a LedgerDatabase,
}

impl<'a> AuditRepository<'a> {
    /// Create a new audit repository.
    pub fn new(db: &'a LedgerDatabase) -> Self {
        Self { db }
    }

    /// Append an audit event.
    pub fn log(&self, event: &AuditEvent) -> LedgerDbResult<()> {
        let key = make_index_key(
            &event.user_id,
            event.timestamp.timestamp_micros(),
            &event.event_id,
        );
        let json = serde_json::to_vec(event)?;

        let write_txn = self.db.database().begin_write()?;
        {
            let mut table = write_txn.open_table(AUDIT_LOG)?;
            table.insert(key.as_slice(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Most recent events for a user, newest first.
    pub fn events_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> LedgerDbResult<Vec<AuditEvent>> {
        let read_txn = self.db.database().begin_read()?;
        let table = read_txn.open_table(AUDIT_LOG)?;

        let start = make_prefix(user_id);
        let end = make_prefix_end(user_id);

        let mut events = Vec::new();
        for entry in table.range(start.as_slice()..end.as_slice())? {
            let (_, value) = entry?;
            let event: AuditEvent = serde_json::from_slice(value.value())?;
            if event.user_id != user_id {
                continue;
            }
            events.push(event);
            if events.len() >= limit {
                break;
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ledger_db::tests::temp_db;

    #[test]
    fn log_and_read_events() {
        let (db, _dir) = temp_db();
        let audit = AuditRepository::new(&db);

        let mut first = AuditEvent::new(AuditEventType::ClaimRejected, "user-1")
            .with_tx_hash("aa")
            .failed("amount_mismatch");
        first.timestamp = Utc::now() - chrono::Duration::seconds(10);
        audit.log(&first).unwrap();

        let second = AuditEvent::new(AuditEventType::ClaimCredited, "user-1")
            .with_tx_hash("bb")
            .with_ledger_id("ledger-1")
            .with_details(serde_json::json!({"amount": "5"}));
        audit.log(&second).unwrap();

        audit
            .log(&AuditEvent::new(AuditEventType::ReplayBlocked, "user-2"))
            .unwrap();

        let events = audit.events_for_user("user-1", 10).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::ClaimCredited);
        assert!(events[0].success);
        assert_eq!(events[0].ledger_id.as_deref(), Some("ledger-1"));
        assert_eq!(events[1].error.as_deref(), Some("amount_mismatch"));
        assert!(!events[1].success);

        assert_eq!(audit.events_for_user("user-1", 1).unwrap().len(), 1);
    }

    #[test]
    fn events_exclude_users_sharing_an_id_prefix() {
        let (db, _dir) = temp_db();
        let audit = AuditRepository::new(&db);

        audit
            .log(&AuditEvent::new(AuditEventType::ClaimCredited, "a|b").with_tx_hash("nested"))
            .unwrap();
        audit
            .log(&AuditEvent::new(AuditEventType::ClaimRejected, "a").with_tx_hash("own"))
            .unwrap();

        let events = audit.events_for_user("a", 10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tron_tx_id.as_deref(), Some("own"));

        let nested = audit.events_for_user("a|b", 10).unwrap();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].tron_tx_id.as_deref(), Some("nested"));
    }

    #[test]
    fn new_event_success_follows_type() {
        assert!(AuditEvent::new(AuditEventType::ClaimCredited, "u").success);
        assert!(!AuditEvent::new(AuditEventType::ReplayBlocked, "u").success);
    }
}
