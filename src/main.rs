// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use auth_token_service::{
    api::router,
    auth::{ElevatedAccessGate, ElevatedPolicy, JwtHandle},
    config::{Settings, DEFAULT_LOG_FILTER, LOG_FORMAT_ENV},
    state::AppState,
    store::InMemorySecurityKeyStore,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Time allowed for in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    init_tracing();

    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let settings = Settings::from_env().expect("Invalid configuration");
    let snapshot = settings
        .jwt_snapshot()
        .expect("Failed to build JWT configuration");

    info!(
        algorithm = ?snapshot.signing().algorithm(),
        issuer = %snapshot.signing().issuer(),
        access_token_ttl_secs = settings.access_token_ttl.as_secs(),
        elevated_policy = %settings.elevated_policy,
        "JWT configuration loaded"
    );

    // Security keys live in the user database in a full deployment; this
    // service only needs the count lookup.
    let store = Arc::new(InMemorySecurityKeyStore::new());
    if settings.elevated_policy != ElevatedPolicy::Disabled {
        warn!(
            elevated_policy = %settings.elevated_policy,
            "Elevated access gate uses the in-memory security key store; every user has zero keys, \
             so 'recommended' never requires the elevated claim and key enrollment is always exempt"
        );
    }
    let gate = ElevatedAccessGate::new(settings.elevated_policy, store);

    let state = AppState::new(JwtHandle::new(snapshot), gate);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .expect("Failed to parse bind address");

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    match &settings.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .expect("Failed to load TLS certificate");

            let handle = axum_server::Handle::new();
            let shutdown_handle = handle.clone();
            tokio::spawn(async move {
                shutdown.cancelled().await;
                shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE_PERIOD));
            });

            info!("Auth token service listening on https://{addr} (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .expect("HTTPS server failed");
        }
        None => {
            warn!("TLS_CERT_PATH/TLS_KEY_PATH not set; serving plain HTTP");
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .expect("Failed to bind address");

            info!("Auth token service listening on http://{addr} (docs at /docs)");
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .expect("HTTP server failed");
        }
    }

    info!("Auth token service stopped");
}

/// `LOG_FORMAT=json` selects JSON output; anything else is human readable.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    if env::var(LOG_FORMAT_ENV).is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
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
