// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication against the platform's auth provider.
//!
//! ## Auth Flow
//!
//! 1. The client signs in with the auth provider
//! 2. The client sends `Authorization: Bearer <access token>`
//! 3. The server:
//!    - Verifies the signature (HS256 shared secret or JWKS)
//!    - Verifies expiry, and issuer/audience when configured
//!    - Extracts `sub` → canonical `user_id` (the wallet owner)
//!    - Refuses `anon` tokens
//!
//! ## Security
//!
//! - Every edge operation requires authentication
//! - Authentication runs before the request body is read
//! - JWKS is cached with TTL
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod roles;

pub use claims::{AuthenticatedUser, SessionClaims};
pub use error::AuthError;
pub use extractor::{verify_token, Auth};
pub use jwks::JwksManager;
pub use roles::Role;
