// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client payment claims and their validation.

use serde::{Deserialize, Deserializer};
use utoipa::ToSchema;

use super::error::PaymentError;
use crate::blockchain::{format_amount, parse_amount, AmountError, TOKEN_DECIMALS};
use crate::storage::Purpose;

/// A client's claim that an on-chain payment was made.
///
/// Field names are accepted in camelCase and snake_case.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PaymentClaim {
    /// On-chain transaction hash (64 hex chars, optional `0x`)
    #[serde(alias = "txHash", alias = "txId", alias = "tx_id")]
    pub tx_hash: String,
    /// Amount the client believes was paid, as a number or decimal string
    #[serde(deserialize_with = "amount_as_string")]
    #[schema(value_type = String, example = "5.00")]
    pub amount: String,
    /// What the payment is for
    #[serde(alias = "type")]
    pub purpose: Purpose,
    /// Required for `content_purchase`
    #[serde(default, alias = "contentId")]
    pub content_id: Option<String>,
    /// Required for `subscription`
    #[serde(default, alias = "tierId")]
    pub tier_id: Option<String>,
    /// Required for `creator_support`
    #[serde(default, alias = "recipientId", alias = "creatorId")]
    pub recipient_id: Option<String>,
}

/// A claim whose fields passed local validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedClaim {
    /// Lowercase hex, no prefix
    pub tx_hash: String,
    pub amount_units: u64,
    pub purpose: Purpose,
    /// Content, tier or recipient ID, depending on purpose
    pub reference_id: String,
}

impl ValidatedClaim {
    pub fn amount(&self) -> String {
        format_amount(self.amount_units, TOKEN_DECIMALS)
    }
}

impl PaymentClaim {
    /// Check every field without touching the chain.
    pub fn validate(&self) -> Result<ValidatedClaim, PaymentError> {
        let tx_hash = normalize_tx_hash(&self.tx_hash)?;

        let amount_units = parse_amount(&self.amount, TOKEN_DECIMALS).map_err(|e| match e {
            AmountError::TooManyDecimals(d) => {
                PaymentError::InvalidAmount(format!("at most {d} decimal places"))
            }
            other => PaymentError::InvalidAmount(other.to_string()),
        })?;
        if amount_units == 0 {
            return Err(PaymentError::InvalidAmount("must be greater than zero".to_string()));
        }

        let (field, target) = match self.purpose {
            Purpose::ContentPurchase => ("content_id", &self.content_id),
            Purpose::Subscription => ("tier_id", &self.tier_id),
            Purpose::CreatorSupport => ("recipient_id", &self.recipient_id),
        };
        let reference_id = target
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(PaymentError::MissingTarget(field))?
            .to_string();

        Ok(ValidatedClaim {
            tx_hash,
            amount_units,
            purpose: self.purpose,
            reference_id,
        })
    }
}

/// Normalize a transaction hash to 64 lowercase hex chars without prefix.
pub fn normalize_tx_hash(raw: &str) -> Result<String, PaymentError> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PaymentError::InvalidTxHash);
    }
    Ok(hex.to_ascii_lowercase())
}

/// Accept `5`, `5.5` or `"5.50"`.
fn amount_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Text(String),
        Number(serde_json::Number),
    }

    match RawAmount::deserialize(deserializer)? {
        RawAmount::Text(s) => Ok(s),
        RawAmount::Number(n) => Ok(n.to_string()),
    }
}
