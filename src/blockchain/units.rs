// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Conversions between human-readable decimal amounts and integer token units.

use alloy::primitives::U256;

/// Parse a human-readable amount (e.g. `"12.5"`) into integer units.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<u64, AmountError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(AmountError::Empty);
    }
    if amount.starts_with('-') {
        return Err(AmountError::Negative);
    }

    let parts: Vec<&str> = amount.split('.').collect();
    if parts.len() > 2 {
        return Err(AmountError::Format(amount.to_string()));
    }

    let whole_str = if parts[0].is_empty() { "0" } else { parts[0] };
    if !whole_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(AmountError::Format(amount.to_string()));
    }
    let whole = whole_str
        .parse::<u64>()
        .map_err(|_| AmountError::Overflow)?;

    let fraction = if parts.len() == 2 {
        let frac_str = parts[1];
        if !frac_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(AmountError::Format(amount.to_string()));
        }
        if frac_str.len() > decimals as usize {
            return Err(AmountError::TooManyDecimals(decimals));
        }
        if frac_str.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac_str, width = decimals as usize);
            padded.parse::<u64>().map_err(|_| AmountError::Overflow)?
        }
    } else {
        0
    };

    let multiplier = 10u64
        .checked_pow(decimals as u32)
        .ok_or(AmountError::Overflow)?;
    whole
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(fraction))
        .ok_or(AmountError::Overflow)
}

/// Format integer units as a trimmed decimal string.
pub fn format_amount(units: u64, decimals: u8) -> String {
    if units == 0 {
        return "0".to_string();
    }

    let divisor = 10u64.pow(decimals as u32);
    let whole = units / divisor;
    let remainder = units % divisor;

    if remainder == 0 {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        format!("{}.{}", whole, decimal_str.trim_end_matches('0'))
    }
}

/// Narrow an on-chain `uint256` to `u64` units.
pub fn units_from_u256(value: U256) -> Result<u64, AmountError> {
    u64::try_from(value).map_err(|_| AmountError::Overflow)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("amount must not be negative")]
    Negative,

    #[error("invalid amount format: {0}")]
    Format(String),

    #[error("too many decimal places (max {0})")]
    TooManyDecimals(u8),

    #[error("amount overflow")]
    Overflow,
}
