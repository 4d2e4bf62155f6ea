// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CreatorPay - TRON Payment Verification & Ledger Service
//!
//! Verifies client-claimed TRON payments (native TRX and TRC20 USDT)
//! against a full node and credits the platform ledger: wallet balances
//! plus the content purchase, subscription or creator support row the
//! payment pays for.
//!
//! ## Modules
//!
//! - `api` - Edge endpoint, health probes, OpenAPI (Axum)
//! - `auth` - Bearer-token authentication (Supabase-style JWT)
//! - `blockchain` - TRON full-node reads, TRC20 decoding, addresses
//! - `payments` - Claim validation, on-chain verification, crediting
//! - `storage` - Ledger database and audit trail (redb)

pub mod api;
pub mod auth;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod payments;
pub mod state;
pub mod storage;
