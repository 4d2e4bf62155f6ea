// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

use super::claims::{AuthenticatedUser, SessionClaims};
use super::error::AuthError;
use crate::state::{AppState, AuthConfig};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Extractor for authenticated users.
///
/// Validates the bearer token from the Authorization header. Rejections
/// render as the edge error envelope, before any body is read.
///
/// ## Verification Modes
///
/// - **HS256** (`SUPABASE_JWT_SECRET` set): shared-secret signature check
/// - **JWKS** (`AUTH_JWKS_URL` set): RS*/ES* signature check against the provider's keys
/// - **Development** (`dev` feature, nothing configured): structure and expiry only
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let user = verify_token(token, &state.auth_config).await?;
        Ok(Auth(user))
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .map(str::trim)
        .ok_or(AuthError::InvalidAuthHeader)?;

    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

/// Verify a JWT and extract user information.
pub async fn verify_token(
    token: &str,
    auth_config: &AuthConfig,
) -> Result<AuthenticatedUser, AuthError> {
    let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;

    match (header.alg, &auth_config.hs256_secret, &auth_config.jwks) {
        (Algorithm::HS256, Some(secret), _) => {
            let key = DecodingKey::from_secret(secret.as_bytes());
            verify_signed(token, &key, Algorithm::HS256, auth_config)
        }
        (Algorithm::HS256, None, _) => Err(AuthError::UnsupportedAlgorithm),
        (_, _, Some(jwks)) => {
            let (key, algorithm) = match &header.kid {
                Some(kid) => jwks.get_decoding_key(kid).await?,
                None => jwks.get_any_decoding_key().await?,
            };
            if algorithm != header.alg {
                return Err(AuthError::UnsupportedAlgorithm);
            }
            verify_signed(token, &key, algorithm, auth_config)
        }
        #[cfg(feature = "dev")]
        (_, None, None) => verify_unsigned_development(token),
        _ => Err(AuthError::UnsupportedAlgorithm),
    }
}

fn verify_signed(
    token: &str,
    key: &DecodingKey,
    algorithm: Algorithm,
    auth_config: &AuthConfig,
) -> Result<AuthenticatedUser, AuthError> {
    let mut validation = Validation::new(algorithm);
    validation.leeway = CLOCK_SKEW_LEEWAY;

    if let Some(ref issuer) = auth_config.issuer {
        validation.set_issuer(&[issuer]);
    }

    match auth_config.audience {
        Some(ref audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }

    let token_data = decode::<SessionClaims>(token, key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        jsonwebtoken::errors::ErrorKind::InvalidAudience => AuthError::InvalidAudience,
        jsonwebtoken::errors::ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
        jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => AuthError::UnsupportedAlgorithm,
        _ => AuthError::MalformedToken,
    })?;

    AuthenticatedUser::from_claims(token_data.claims)
}

/// Development JWT verification (no signature check).
///
/// WARNING: This should only be used in development environments.
#[cfg(feature = "dev")]
fn verify_unsigned_development(token: &str) -> Result<AuthenticatedUser, AuthError> {
    let token_data = jsonwebtoken::dangerous::insecure_decode::<SessionClaims>(token)
        .map_err(|_| AuthError::MalformedToken)?;

    let claims = token_data.claims;
    let now = chrono::Utc::now().timestamp();
    if claims.exp < now - CLOCK_SKEW_LEEWAY as i64 {
        return Err(AuthError::TokenExpired);
    }

    AuthenticatedUser::from_claims(claims)
}
