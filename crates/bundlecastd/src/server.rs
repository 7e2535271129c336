//! Server setup and lifecycle management

use anyhow::{Context, Result};
use bundlecast_core::{Consistency, UpdateService, METRICS};
use tokio::net::TcpListener;

use crate::config::Config;
use crate::routes::{create_router, AppState};

/// Open the stores, bind, and serve until a shutdown signal arrives.
pub async fn run(config: Config) -> Result<()> {
    let api_token = config.api_token()?.to_string();

    let (manifests, blobs) = config
        .open_stores()
        .await
        .context("Failed to open Bundlecast stores")?;
    let service = UpdateService::new(manifests, blobs);
    if service.consistency() == Consistency::LastWriterWins {
        tracing::warn!(
            backend = ?config.manifest_backend,
            "manifest store is unsynchronized; concurrent push/delete may lose updates"
        );
    }

    let app = create_router(AppState::new(service, api_token), config.max_body_bytes);
    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;

    tracing::info!("bundlecastd listening on {}", config.listen);
    tracing::info!(
        manifest_backend = ?config.manifest_backend,
        blob_backend = ?config.blob_backend,
        "storage configured"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("bundlecastd shutting down");
    METRICS.flush();
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
