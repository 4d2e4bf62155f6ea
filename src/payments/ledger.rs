// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Records verified payments in the ledger.

use std::sync::Arc;

use chrono::{Duration, Utc};

use super::claim::ValidatedClaim;
use super::error::PaymentError;
use super::verifier::VerifiedTransfer;
use crate::storage::{
    AuditEvent, AuditEventType, AuditRepository, CreditReceipt, LedgerDatabase, LedgerTransaction,
    PurposeRecord, ReplayPolicy, TxStatus,
};

/// Turns verified transfers into ledger rows.
pub struct LedgerWriter {
    db: Arc<LedgerDatabase>,
    replay_policy: ReplayPolicy,
    subscription_period: Duration,
}

impl LedgerWriter {
    pub fn new(
        db: Arc<LedgerDatabase>,
        replay_policy: ReplayPolicy,
        subscription_period: Duration,
    ) -> Self {
        Self {
            db,
            replay_policy,
            subscription_period,
        }
    }

    /// Ledger id of an earlier credit for this hash, if replays are rejected.
    pub fn find_replay(&self, tx_hash: &str) -> Result<Option<String>, PaymentError> {
        if self.replay_policy == ReplayPolicy::Allow {
            return Ok(None);
        }
        Ok(self
            .db
            .transactions_for_hash(tx_hash)?
            .into_iter()
            .next()
            .map(|tx| tx.id))
    }

    /// Credit `user_id` for a verified transfer.
    ///
    /// The wallet credited is the caller's own wallet for the transfer's
    /// asset; the verified amount, not the claimed one, is recorded.
    pub fn credit(
        &self,
        user_id: &str,
        claim: &ValidatedClaim,
        verified: &VerifiedTransfer,
    ) -> Result<CreditReceipt, PaymentError> {
        let transfer = &verified.transfer;
        let tx = LedgerTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            asset: transfer.asset,
            amount_units: transfer.amount_units,
            amount: transfer.amount.clone(),
            purpose: claim.purpose,
            status: TxStatus::Completed,
            tron_tx_id: verified.tx_hash.clone(),
            reference_id: claim.reference_id.clone(),
            from_address: transfer.from.to_base58(),
            to_address: transfer.to.to_base58(),
            block_number: verified.block_number,
            created_at: Utc::now(),
        };
        let record = PurposeRecord::for_transaction(&tx, self.subscription_period);

        let receipt = self.db.credit(&tx, &record, self.replay_policy)?;

        tracing::info!(
            user_id = %user_id,
            tx_hash = %verified.tx_hash,
            ledger_id = %receipt.transaction.id,
            asset = receipt.transaction.asset.as_str(),
            amount = %receipt.transaction.amount,
            purpose = claim.purpose.as_str(),
            balance = %receipt.wallet.balance,
            "Payment credited"
        );

        self.audit(
            AuditEvent::new(AuditEventType::ClaimCredited, user_id)
                .with_tx_hash(&verified.tx_hash)
                .with_ledger_id(&receipt.transaction.id)
                .with_details(serde_json::json!({
                    "asset": receipt.transaction.asset.as_str(),
                    "amount": receipt.transaction.amount,
                    "purpose": claim.purpose.as_str(),
                    "reference_id": claim.reference_id,
                })),
        );

        Ok(receipt)
    }

    /// Record a claim that was not credited.
    pub fn record_rejection(&self, user_id: &str, tx_hash: Option<&str>, error: &PaymentError) {
        let event_type = match error {
            PaymentError::AlreadyCredited(_) => AuditEventType::ReplayBlocked,
            _ => AuditEventType::ClaimRejected,
        };
        let mut event = AuditEvent::new(event_type, user_id)
            .with_details(serde_json::json!({ "message": error.to_string() }))
            .failed(error.error_code());
        if let Some(hash) = tx_hash {
            event = event.with_tx_hash(hash);
        }
        self.audit(event);
    }

    fn audit(&self, event: AuditEvent) {
        if let Err(e) = AuditRepository::new(&self.db).log(&event) {
            tracing::warn!(error = %e, event_id = %event.event_id, "Failed to write audit event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{Asset, TronAddress};
    use crate::payments::verifier::DecodedTransfer;
    use crate::storage::ledger_db::tests::temp_db;
    use crate::storage::Purpose;

    fn verified(hash: &str, units: u64) -> VerifiedTransfer {
        VerifiedTransfer {
            tx_hash: hash.to_string(),
            transfer: DecodedTransfer {
                asset: Asset::Usdt,
                from: TronAddress::from_evm_bytes(&[1; 20]),
                to: TronAddress::from_evm_bytes(&[2; 20]),
                amount_units: units,
                amount: crate::blockchain::format_amount(units, 6),
            },
            block_number: Some(5),
        }
    }

    fn claim(hash: &str, purpose: Purpose) -> ValidatedClaim {
        ValidatedClaim {
            tx_hash: hash.to_string(),
            // Claimed amount differs from the verified one within tolerance
            amount_units: 4_995_000,
            purpose,
            reference_id: "tier-gold".to_string(),
        }
    }

    #[test]
    fn credits_verified_amount_and_audits() {
        let (db, _dir) = temp_db();
        let db = Arc::new(db);
        let writer = LedgerWriter::new(db.clone(), ReplayPolicy::Reject, Duration::days(30));
        let hash = "ab".repeat(32);

        let receipt = writer
            .credit("user-1", &claim(&hash, Purpose::Subscription), &verified(&hash, 5_000_000))
            .unwrap();
        assert_eq!(receipt.transaction.amount_units, 5_000_000);
        assert_eq!(receipt.wallet.balance_units, 5_000_000);
        assert!(matches!(
            receipt.record,
            PurposeRecord::Subscription(ref s) if s.tier_id == "tier-gold"
        ));
        assert_eq!(writer.find_replay(&hash).unwrap(), Some(receipt.transaction.id.clone()));

        let events = AuditRepository::new(&db).events_for_user("user-1", 10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, AuditEventType::ClaimCredited);
    }

    #[test]
    fn replay_is_audited_as_blocked() {
        let (db, _dir) = temp_db();
        let db = Arc::new(db);
        let writer = LedgerWriter::new(db.clone(), ReplayPolicy::Reject, Duration::days(30));
        let hash = "cd".repeat(32);

        writer
            .credit("user-1", &claim(&hash, Purpose::ContentPurchase), &verified(&hash, 1_000_000))
            .unwrap();
        let err = writer
            .credit("user-2", &claim(&hash, Purpose::ContentPurchase), &verified(&hash, 1_000_000))
            .unwrap_err();
        assert_eq!(err.error_code(), "already_credited");
        writer.record_rejection("user-2", Some(&hash), &err);

        let events = AuditRepository::new(&db).events_for_user("user-2", 10).unwrap();
        assert_eq!(events[0].event_type, AuditEventType::ReplayBlocked);
        assert_eq!(events[0].error.as_deref(), Some("already_credited"));
    }

    #[test]
    fn allow_policy_skips_replay_lookup() {
        let (db, _dir) = temp_db();
        let writer = LedgerWriter::new(Arc::new(db), ReplayPolicy::Allow, Duration::days(30));
        let hash = "ef".repeat(32);
        writer
            .credit("user-1", &claim(&hash, Purpose::ContentPurchase), &verified(&hash, 1))
            .unwrap();
        assert_eq!(writer.find_replay(&hash).unwrap(), None);
    }
}
