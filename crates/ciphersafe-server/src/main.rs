//! `CipherSafe` server entry point.
//!
//! Loads configuration from the environment, connects the storage backend,
//! then starts the Axum HTTP server with graceful shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use ciphersafe_server::config::{ServerConfig, StorageBackendType};
use ciphersafe_server::routes;
use ciphersafe_server::state::AppState;
use ciphersafe_storage::{MemoryStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("invalid configuration")?;

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(storage = ?config.storage_backend, "CipherSafe starting");

    let store = build_store(&config.storage_backend).await?;
    let state = Arc::new(AppState::new(
        store,
        config.master_key.clone(),
        config.signing_key.clone(),
    ));

    let app = routes::router(state, config.cors_origin.clone());

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "CipherSafe server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("CipherSafe server stopped");
    Ok(())
}

/// Open the configured storage backend.
async fn build_store(backend: &StorageBackendType) -> anyhow::Result<Arc<dyn Store>> {
    match backend {
        StorageBackendType::Memory => {
            warn!("using in-memory storage; all data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "postgres-backend")]
        StorageBackendType::Postgres { url } => {
            let store = ciphersafe_storage::PostgresStore::connect(url)
                .await
                .context("failed to open postgres storage")?;
            info!("postgres storage ready");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres-backend"))]
        StorageBackendType::Postgres { .. } => {
            anyhow::bail!("postgres storage requested but the `postgres-backend` feature is disabled")
        }
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
