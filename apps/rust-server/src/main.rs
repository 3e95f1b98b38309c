// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use onchain_confirm_server::{
    api::router,
    auth::{AuthLayerConfig, JwksCache, JwtAuthenticator},
    blockchain::RpcClient,
    clock::{Clock, SystemClock},
    config::{LogFormat, ServerConfig},
    hooks::{default_registry, ConfirmationLedger},
    sessions::{InMemorySessionStore, RedbSessionStore, SessionReaper, SessionStore},
    state::{AppState, ProtectedResource},
};

const SESSION_DB_FILE: &str = "sessions.redb";

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).pretty().init(),
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    shutdown.cancel();
}

#[tokio::main]
async fn main() {
    let config = ServerConfig::from_env().expect("Invalid configuration");
    init_tracing(config.log_format);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Bearer authentication
    if config.auth.jwks_url.is_none() {
        warn!("JWKS_URL is not set; protected routes will answer 500 until it is configured");
    }
    let jwks = JwksCache::new(
        config.auth.jwks_url.clone(),
        config.auth.upstream_timeout,
        clock.clone(),
    )
    .expect("Failed to build JWKS client")
    .with_ttl(config.auth.jwks_cache_ttl);
    let authenticator = JwtAuthenticator::new(Arc::new(jwks), clock.clone())
        .with_issuer(config.auth.issuer.clone());
    let auth = AuthLayerConfig::new(Arc::new(authenticator))
        .with_audience(config.auth.resource_audience.clone())
        .with_resource_metadata_url(Some(config.auth.resource_metadata_url.clone()))
        .with_skip_well_known(config.auth.skip_well_known);

    // Session store
    let store: Arc<dyn SessionStore> = match &config.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).expect("Failed to create DATA_DIR");
            let path = dir.join(SESSION_DB_FILE);
            info!(path = %path.display(), "Opening session database");
            Arc::new(RedbSessionStore::open(&path).expect("Failed to open session database"))
        }
        None => {
            warn!("DATA_DIR is not set; sessions are kept in memory only");
            Arc::new(InMemorySessionStore::new())
        }
    };

    // Domain hooks
    let hooks = default_registry(Arc::new(ConfirmationLedger::new()))
        .expect("Conflicting hook registration");
    for session_type in hooks.unclaimed_types() {
        warn!(session_type = %session_type, "No hook claims this session type");
    }

    // Chain access
    let rpc = config
        .chain
        .rpc_url
        .clone()
        .map(|url| RpcClient::with_timeout(url, config.auth.upstream_timeout).map(Arc::new))
        .transpose()
        .expect("Failed to build RPC client");
    if rpc.is_none() && config.sessions.require_ownership_proof {
        warn!("REQUIRE_OWNERSHIP_PROOF is set without RPC_URL; confirmations will fail");
    }

    let state = AppState::new(store.clone(), hooks, auth, clock.clone())
        .with_rpc(rpc)
        .with_required_ownership_proof(config.sessions.require_ownership_proof)
        .with_session_defaults(config.sessions.ttl, config.chain.chain_id)
        .with_resource(ProtectedResource {
            resource: config.auth.resource_url.clone(),
            authorization_servers: config.auth.authorization_servers.clone(),
            scopes_supported: Vec::new(),
        })
        .with_data_dir(config.data_dir.clone());

    let shutdown = CancellationToken::new();

    let reaper = config.sessions.retention.map(|retention| {
        tokio::spawn(SessionReaper::new(store, clock, retention).run(shutdown.clone()))
    });

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listener");

    info!(
        addr = %addr,
        chain_id = config.chain.chain_id,
        rpc = config.chain.rpc_url.is_some(),
        "Onchain confirm server listening (docs at /docs)"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .expect("HTTP server failed");

    shutdown.cancel();
    if let Some(handle) = reaper {
        let _ = handle.await;
    }
    info!("Server stopped");
}
