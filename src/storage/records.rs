// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger records persisted by the payment flow.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{format_amount, Asset, TOKEN_DECIMALS};

/// What a verified payment pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// Unlocks a piece of paid content
    #[serde(alias = "contentPurchase", alias = "purchase")]
    ContentPurchase,
    /// Starts a subscription to a creator tier
    Subscription,
    /// Direct tip to a creator
    #[serde(alias = "creatorSupport", alias = "support", alias = "tip")]
    CreatorSupport,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::ContentPurchase => "content_purchase",
            Purpose::Subscription => "subscription",
            Purpose::CreatorSupport => "creator_support",
        }
    }
}

/// Transaction status. Rows are only written for accepted claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Completed,
}

/// One accepted claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LedgerTransaction {
    /// Ledger row ID (UUID v4)
    pub id: String,
    /// Credited user (auth `sub`)
    pub user_id: String,
    /// Asset the on-chain payment was made in
    pub asset: Asset,
    /// Verified amount in micro-units (6 decimals)
    pub amount_units: u64,
    /// Verified amount, human-readable
    pub amount: String,
    /// What the payment was for
    #[serde(rename = "type")]
    pub purpose: Purpose,
    pub status: TxStatus,
    /// On-chain transaction hash (lowercase hex, no prefix)
    pub tron_tx_id: String,
    /// Content, tier or recipient ID
    pub reference_id: String,
    /// Payer address (base58)
    pub from_address: String,
    /// Receiving address (base58)
    pub to_address: String,
    /// Block the payment was included in, if known at verification time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    pub created_at: DateTime<Utc>,
}

/// Platform-custodied balance for one user and asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WalletBalance {
    pub user_id: String,
    pub asset: Asset,
    /// Balance in micro-units
    pub balance_units: u64,
    /// Balance, human-readable
    pub balance: String,
    pub updated_at: DateTime<Utc>,
}

impl WalletBalance {
    /// A zero balance for a user that has never been credited.
    pub fn empty(user_id: &str, asset: Asset) -> Self {
        Self {
            user_id: user_id.to_string(),
            asset,
            balance_units: 0,
            balance: "0".to_string(),
            updated_at: Utc::now(),
        }
    }

    /// Add `units`, failing on overflow.
    pub fn checked_credit(&self, units: u64) -> Option<Self> {
        let balance_units = self.balance_units.checked_add(units)?;
        Some(Self {
            user_id: self.user_id.clone(),
            asset: self.asset,
            balance_units,
            balance: format_amount(balance_units, TOKEN_DECIMALS),
            updated_at: Utc::now(),
        })
    }
}

/// Grants access to a piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContentPurchase {
    pub id: String,
    pub user_id: String,
    pub content_id: String,
    pub transaction_id: String,
    pub amount: String,
    pub created_at: DateTime<Utc>,
}

/// Subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
}

/// A paid subscription to a creator tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub tier_id: String,
    pub transaction_id: String,
    pub amount: String,
    pub status: SubscriptionStatus,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A tip from one user to a creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreatorSupport {
    pub id: String,
    pub supporter_id: String,
    pub recipient_id: String,
    pub transaction_id: String,
    pub amount: String,
    pub created_at: DateTime<Utc>,
}

/// The purpose-specific row written alongside a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PurposeRecord {
    ContentPurchase(ContentPurchase),
    Subscription(Subscription),
    CreatorSupport(CreatorSupport),
}

impl PurposeRecord {
    /// Build the row for `tx`, using `subscription_period` for subscriptions.
    pub fn for_transaction(tx: &LedgerTransaction, subscription_period: Duration) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        match tx.purpose {
            Purpose::ContentPurchase => PurposeRecord::ContentPurchase(ContentPurchase {
                id,
                user_id: tx.user_id.clone(),
                content_id: tx.reference_id.clone(),
                transaction_id: tx.id.clone(),
                amount: tx.amount.clone(),
                created_at: tx.created_at,
            }),
            Purpose::Subscription => PurposeRecord::Subscription(Subscription {
                id,
                user_id: tx.user_id.clone(),
                tier_id: tx.reference_id.clone(),
                transaction_id: tx.id.clone(),
                amount: tx.amount.clone(),
                status: SubscriptionStatus::Active,
                started_at: tx.created_at,
                expires_at: tx.created_at + subscription_period,
            }),
            Purpose::CreatorSupport => PurposeRecord::CreatorSupport(CreatorSupport {
                id,
                supporter_id: tx.user_id.clone(),
                recipient_id: tx.reference_id.clone(),
                transaction_id: tx.id.clone(),
                amount: tx.amount.clone(),
                created_at: tx.created_at,
            }),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            PurposeRecord::ContentPurchase(r) => &r.id,
            PurposeRecord::Subscription(r) => &r.id,
            PurposeRecord::CreatorSupport(r) => &r.id,
        }
    }

    pub fn purpose(&self) -> Purpose {
        match self {
            PurposeRecord::ContentPurchase(_) => Purpose::ContentPurchase,
            PurposeRecord::Subscription(_) => Purpose::Subscription,
            PurposeRecord::CreatorSupport(_) => Purpose::CreatorSupport,
        }
    }
}

/// Everything written for one accepted claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreditReceipt {
    pub transaction: LedgerTransaction,
    pub wallet: WalletBalance,
    pub record: PurposeRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_tx(purpose: Purpose) -> LedgerTransaction {
        LedgerTransaction {
            id: "tx-1".to_string(),
            user_id: "user-1".to_string(),
            asset: Asset::Usdt,
            amount_units: 5_000_000,
            amount: "5".to_string(),
            purpose,
            status: TxStatus::Completed,
            tron_tx_id: "ab".repeat(32),
            reference_id: "ref-9".to_string(),
            from_address: "TPayer".to_string(),
            to_address: "TTreasury".to_string(),
            block_number: Some(10),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn purpose_accepts_both_spellings() {
        let a: Purpose = serde_json::from_str("\"content_purchase\"").unwrap();
        let b: Purpose = serde_json::from_str("\"contentPurchase\"").unwrap();
        assert_eq!(a, b);
        let tip: Purpose = serde_json::from_str("\"creatorSupport\"").unwrap();
        assert_eq!(tip, Purpose::CreatorSupport);
        assert!(serde_json::from_str::<Purpose>("\"refund\"").is_err());
    }

    #[test]
    fn transaction_serializes_purpose_as_type() {
        let json = serde_json::to_value(sample_tx(Purpose::Subscription)).unwrap();
        assert_eq!(json["type"], "subscription");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["asset"], "USDT");
    }

    #[test]
    fn purpose_record_matches_transaction() {
        let tx = sample_tx(Purpose::Subscription);
        let record = PurposeRecord::for_transaction(&tx, Duration::days(30));
        match &record {
            PurposeRecord::Subscription(sub) => {
                assert_eq!(sub.tier_id, "ref-9");
                assert_eq!(sub.transaction_id, "tx-1");
                assert_eq!(sub.expires_at - sub.started_at, Duration::days(30));
            }
            other => panic!("unexpected record {other:?}"),
        }
        assert_eq!(record.purpose(), Purpose::Subscription);

        let support =
            PurposeRecord::for_transaction(&sample_tx(Purpose::CreatorSupport), Duration::days(30));
        assert!(matches!(
            support,
            PurposeRecord::CreatorSupport(ref s) if s.recipient_id == "ref-9"
        ));
    }

    #[test]
    fn wallet_credit_checks_overflow() {
        let wallet = WalletBalance::empty("user-1", Asset::Usdt);
        let credited = wallet.checked_credit(1_500_000).unwrap();
        assert_eq!(credited.balance_units, 1_500_000);
        assert_eq!(credited.balance, "1.5");

        let full = WalletBalance {
            balance_units: u64::MAX,
            ..wallet
        };
        assert!(full.checked_credit(1).is_none());
    }
}
