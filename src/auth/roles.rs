// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Roles carried in the auth provider's `role` claim.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::AuthError;

/// Role of an authenticated caller.
///
/// The provider also issues `anon` tokens for signed-out clients; those
/// carry no user and are refused before a `Role` is ever built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Signed-in end user
    Authenticated,
    /// Backend service acting on behalf of a user
    ServiceRole,
}

impl Role {
    /// Map the `role` claim. A missing claim means a signed-in user.
    pub fn from_claim(raw: Option<&str>) -> Result<Role, AuthError> {
        match raw.map(|r| r.to_ascii_lowercase()).as_deref() {
            None | Some("authenticated") => Ok(Role::Authenticated),
            Some("service_role") => Ok(Role::ServiceRole),
            Some("anon") => Err(AuthError::AnonymousToken),
            Some(_) => Err(AuthError::InsufficientPermissions),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Authenticated => write!(f, "authenticated"),
            Role::ServiceRole => write!(f, "service_role"),
        }
    }
}
