// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup and parsed into a
//! typed [`ServerConfig`]. Invalid values fail startup instead of falling
//! back to defaults.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding `ledger.redb` | `./data` |
//! | `TRON_NETWORK` | `mainnet`, `shasta` or `nile` | `mainnet` |
//! | `TRON_API_URL` | Full-node base URL, path prefix allowed | network default |
//! | `TRON_API_KEY` | TronGrid API key | none |
//! | `USDT_CONTRACT` | TRC20 USDT contract override (base58) | network default |
//! | `TREASURY_ADDRESS` | Platform receiving address (base58) | none |
//! | `AMOUNT_TOLERANCE` | Accepted claimed/transferred difference | `0.01` |
//! | `MIN_CONFIRMATIONS` | Required confirmations | `0` |
//! | `REPLAY_POLICY` | `reject` or `allow` | `reject` |
//! | `SUBSCRIPTION_PERIOD_DAYS` | Subscription length | `30` |
//! | `SUPABASE_JWT_SECRET` | HS256 secret for access tokens | none |
//! | `AUTH_JWKS_URL` | JWKS endpoint for RS*/ES* tokens | none |
//! | `AUTH_ISSUER` | Expected JWT issuer claim | not checked |
//! | `AUTH_AUDIENCE` | Expected JWT audience claim | not checked |
//! | `CHAIN_CACHE_CAPACITY` | On-chain lookup cache entries | `1024` |
//! | `CHAIN_CACHE_TTL_SECS` | On-chain lookup cache TTL | `300` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; both enable HTTPS | none (HTTP) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! One of `SUPABASE_JWT_SECRET` or `AUTH_JWKS_URL` is required unless the
//! crate is built with the `dev` feature.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::blockchain::{network_by_key, parse_amount, NetworkConfig, TronAddress, TOKEN_DECIMALS};
use crate::payments::VerifierSettings;
use crate::storage::ReplayPolicy;

/// Directory holding the ledger database.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Logging format (`json` or `pretty`). Read directly by `main`.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_NETWORK: &str = "mainnet";
const DEFAULT_AMOUNT_TOLERANCE: &str = "0.01";
const DEFAULT_SUBSCRIPTION_DAYS: i64 = 30;
const DEFAULT_CHAIN_CACHE_CAPACITY: usize = 1024;
const DEFAULT_CHAIN_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{0} and {1} must be set together")]
    Incomplete(&'static str, &'static str),
}

/// Token verification settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSettings {
    pub jwt_secret: Option<String>,
    pub jwks_url: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

/// PEM files for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub network: NetworkConfig,
    pub tron_api_url: Option<String>,
    pub tron_api_key: Option<String>,
    /// Effective USDT contract (override or the network's)
    pub usdt_contract: Option<TronAddress>,
    pub treasury: Option<TronAddress>,
    pub tolerance_units: u64,
    pub min_confirmations: u64,
    pub replay_policy: ReplayPolicy,
    pub subscription_period: chrono::Duration,
    pub auth: AuthSettings,
    pub chain_cache_capacity: usize,
    pub chain_cache_ttl: Duration,
    pub tls: Option<TlsPaths>,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or("PORT", get("PORT"), DEFAULT_PORT)?;
        let bind_addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    name: "HOST",
                    value: host.clone(),
                    reason: e.to_string(),
                })?;

        let data_dir =
            PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));

        let network_key = get("TRON_NETWORK").unwrap_or_else(|| DEFAULT_NETWORK.to_string());
        let network = network_by_key(&network_key).ok_or_else(|| ConfigError::Invalid {
            name: "TRON_NETWORK",
            value: network_key.clone(),
            reason: "expected mainnet, shasta or nile".to_string(),
        })?;

        let usdt_contract = match get("USDT_CONTRACT") {
            Some(raw) => Some(parse_address("USDT_CONTRACT", &raw)?),
            None => network
                .usdt_contract
                .map(|raw| parse_address("USDT_CONTRACT", raw))
                .transpose()?,
        };
        let treasury = get("TREASURY_ADDRESS")
            .map(|raw| parse_address("TREASURY_ADDRESS", &raw))
            .transpose()?;

        let tolerance_raw =
            get("AMOUNT_TOLERANCE").unwrap_or_else(|| DEFAULT_AMOUNT_TOLERANCE.to_string());
        let tolerance_units =
            parse_amount(&tolerance_raw, TOKEN_DECIMALS).map_err(|e| ConfigError::Invalid {
                name: "AMOUNT_TOLERANCE",
                value: tolerance_raw.clone(),
                reason: e.to_string(),
            })?;

        let min_confirmations = parse_or("MIN_CONFIRMATIONS", get("MIN_CONFIRMATIONS"), 0u64)?;

        let replay_policy = match get("REPLAY_POLICY") {
            Some(raw) => raw.parse::<ReplayPolicy>().map_err(|reason| ConfigError::Invalid {
                name: "REPLAY_POLICY",
                value: raw.clone(),
                reason,
            })?,
            None => ReplayPolicy::default(),
        };

        let subscription_days = parse_or(
            "SUBSCRIPTION_PERIOD_DAYS",
            get("SUBSCRIPTION_PERIOD_DAYS"),
            DEFAULT_SUBSCRIPTION_DAYS,
        )?;
        if subscription_days <= 0 {
            return Err(ConfigError::Invalid {
                name: "SUBSCRIPTION_PERIOD_DAYS",
                value: subscription_days.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let auth = AuthSettings {
            jwt_secret: get("SUPABASE_JWT_SECRET"),
            jwks_url: get("AUTH_JWKS_URL"),
            issuer: get("AUTH_ISSUER"),
            audience: get("AUTH_AUDIENCE"),
        };
        if let Some(ref jwks_url) = auth.jwks_url {
            jwks_url.parse::<url::Url>().map_err(|e| ConfigError::Invalid {
                name: "AUTH_JWKS_URL",
                value: jwks_url.clone(),
                reason: e.to_string(),
            })?;
        }
        if !cfg!(feature = "dev") && auth.jwt_secret.is_none() && auth.jwks_url.is_none() {
            return Err(ConfigError::Missing("SUPABASE_JWT_SECRET or AUTH_JWKS_URL"));
        }

        let chain_cache_capacity = parse_or(
            "CHAIN_CACHE_CAPACITY",
            get("CHAIN_CACHE_CAPACITY"),
            DEFAULT_CHAIN_CACHE_CAPACITY,
        )?;
        let chain_cache_ttl = Duration::from_secs(parse_or(
            "CHAIN_CACHE_TTL_SECS",
            get("CHAIN_CACHE_TTL_SECS"),
            DEFAULT_CHAIN_CACHE_TTL_SECS,
        )?);

        let tls = match (get("TLS_CERT_PATH"), get("TLS_KEY_PATH")) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::Incomplete("TLS_CERT_PATH", "TLS_KEY_PATH")),
        };

        Ok(Self {
            bind_addr,
            data_dir,
            network,
            tron_api_url: get("TRON_API_URL"),
            tron_api_key: get("TRON_API_KEY"),
            usdt_contract,
            treasury,
            tolerance_units,
            min_confirmations,
            replay_policy,
            subscription_period: chrono::Duration::days(subscription_days),
            auth,
            chain_cache_capacity,
            chain_cache_ttl,
            tls,
        })
    }

    /// Rules handed to the transaction verifier.
    pub fn verifier_settings(&self) -> VerifierSettings {
        VerifierSettings {
            usdt_contract: self.usdt_contract,
            treasury: self.treasury,
            tolerance_units: self.tolerance_units,
            min_confirmations: self.min_confirmations,
        }
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

fn parse_address(name: &'static str, raw: &str) -> Result<TronAddress, ConfigError> {
    raw.parse().map_err(|e: crate::blockchain::AddressError| ConfigError::Invalid {
        name,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
