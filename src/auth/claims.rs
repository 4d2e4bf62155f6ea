// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::AuthError;
use super::roles::Role;

/// Claims carried by the auth provider's access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Expiration timestamp
    pub exp: i64,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: Option<i64>,

    /// Issuer (validated by jsonwebtoken when configured)
    #[serde(default)]
    pub iss: Option<String>,

    /// Audience (validated by jsonwebtoken when configured)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<serde_json::Value>,

    /// `authenticated`, `service_role` or `anon`
    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub session_id: Option<String>,
}

/// Authenticated user information extracted from JWT.
///
/// This is the primary type used throughout the application to represent
/// the authenticated user making a request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Canonical user ID (`sub` claim); the wallet owner for credits
    pub user_id: String,

    /// Caller role
    pub role: Role,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Session ID (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Token expiration (Unix timestamp, not serialized)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Build from verified claims, refusing anonymous or subject-less tokens.
    pub fn from_claims(claims: SessionClaims) -> Result<Self, AuthError> {
        let role = Role::from_claim(claims.role.as_deref())?;
        if claims.sub.trim().is_empty() {
            return Err(AuthError::MalformedToken);
        }

        Ok(Self {
            user_id: claims.sub,
            role,
            email: claims.email,
            session_id: claims.session_id,
            expires_at: claims.exp,
        })
    }
}
