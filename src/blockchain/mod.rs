// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration module for TRON.
//!
//! This module provides functionality for:
//! - Reading transactions, receipts and accounts from a full node
//! - Decoding TRC20 `Transfer` events
//! - Converting between TRON address encodings

pub mod address;
pub mod cache;
pub mod client;
#[cfg(test)]
pub mod mock;
pub mod trc20;
pub mod types;
pub mod units;

pub use address::{AddressError, TronAddress};
pub use cache::{CachedLookup, ChainCache};
pub use client::{ChainError, ChainReader, ChainResult, TronClient};
pub use types::*;
pub use units::{format_amount, parse_amount, AmountError};
