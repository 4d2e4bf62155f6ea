// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AuthError, JwksManager};
use crate::blockchain::ChainReader;
use crate::config::AuthSettings;
use crate::payments::PaymentService;
use crate::storage::LedgerDatabase;

/// How bearer tokens are verified.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Shared HS256 secret
    pub hs256_secret: Option<String>,
    /// Key set for asymmetric tokens
    pub jwks: Option<JwksManager>,
    /// Expected issuer (not checked when `None`)
    pub issuer: Option<String>,
    /// Expected audience (not checked when `None`)
    pub audience: Option<String>,
}

impl AuthConfig {
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, AuthError> {
        let jwks = settings.jwks_url.as_deref().map(JwksManager::new).transpose()?;
        Ok(Self {
            hs256_secret: settings.jwt_secret.clone(),
            jwks,
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub payments: Arc<PaymentService>,
    pub db: Arc<LedgerDatabase>,
    pub chain: Arc<dyn ChainReader>,
    pub auth_config: AuthConfig,
}

impl AppState {
    pub fn new(
        payments: PaymentService,
        db: Arc<LedgerDatabase>,
        chain: Arc<dyn ChainReader>,
    ) -> Self {
        Self {
            payments: Arc::new(payments),
            db,
            chain,
            auth_config: AuthConfig::default(),
        }
    }

    pub fn with_auth_config(mut self, auth_config: AuthConfig) -> Self {
        self.auth_config = auth_config;
        self
    }
}
