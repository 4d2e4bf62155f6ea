// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use creatorpay_server::{
    api::router,
    blockchain::{ChainCache, ChainReader, TronClient},
    config::{ServerConfig, TlsPaths, LOG_FORMAT_ENV},
    payments::{LedgerWriter, PaymentService, TransactionVerifier},
    state::{AppState, AuthConfig},
    storage::{LedgerDatabase, LEDGER_FILE},
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Time in-flight requests get to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn run() -> Result<(), BoxError> {
    // Install the ring crypto provider for rustls before any TLS use.
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("rustls crypto provider was already installed");
    }

    let config = ServerConfig::from_env()?;

    std::fs::create_dir_all(&config.data_dir)?;
    let ledger_path = config.data_dir.join(LEDGER_FILE);
    let db = Arc::new(LedgerDatabase::open(&ledger_path)?);
    info!(
        path = %ledger_path.display(),
        transactions = db.transaction_count()?,
        "Ledger database opened"
    );

    let client = TronClient::new(
        config.network.clone(),
        config.tron_api_url.as_deref(),
        config.tron_api_key.clone(),
    )?;
    let chain: Arc<dyn ChainReader> = Arc::new(client);
    info!(
        network = config.network.name,
        usdt_contract = ?config.usdt_contract.map(|a| a.to_base58()),
        treasury = ?config.treasury.map(|a| a.to_base58()),
        replay_policy = ?config.replay_policy,
        min_confirmations = config.min_confirmations,
        "TRON verifier configured"
    );

    let verifier = TransactionVerifier::new(chain.clone(), config.verifier_settings());
    let ledger = LedgerWriter::new(db.clone(), config.replay_policy, config.subscription_period);
    let payments = PaymentService::new(
        db.clone(),
        chain.clone(),
        ChainCache::new(config.chain_cache_capacity, config.chain_cache_ttl),
        config.network.clone(),
        verifier,
        ledger,
    );

    let auth_config = AuthConfig::from_settings(&config.auth)?;
    if auth_config.hs256_secret.is_none() && auth_config.jwks.is_none() {
        warn!("No token verifier configured: accepting unsigned tokens (dev build)");
    }

    let state = AppState::new(payments, db, chain).with_auth_config(auth_config);
    let app = router(state);

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    match &config.tls {
        Some(paths) => serve_https(app, &config, paths, shutdown).await,
        None => serve_http(app, &config, shutdown).await,
    }
}

async fn serve_http(
    app: Router,
    config: &ServerConfig,
    shutdown: CancellationToken,
) -> Result<(), BoxError> {
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "CreatorPay server listening on http (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn serve_https(
    app: Router,
    config: &ServerConfig,
    paths: &TlsPaths,
    shutdown: CancellationToken,
) -> Result<(), BoxError> {
    let tls_config = RustlsConfig::from_pem_file(&paths.cert, &paths.key).await?;

    let handle: Handle<std::net::SocketAddr> = Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    info!(addr = %config.bind_addr, "CreatorPay server listening on https (docs at /docs)");
    axum_server::bind_rustls(config.bind_addr, tls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Cancel `shutdown` on SIGINT or SIGTERM.
async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    shutdown.cancel();
}
