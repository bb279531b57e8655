//! HTTP server for the conversion, defaulting and validation webhooks.

mod admission;
mod conversion;

use crate::{
    config::Config,
    consts::{CONVERT_PATH, DEFAULTING_PATH, HEALTH_PATH, VALIDATION_PATH},
    conversion::{DowngradeFallback, GitRepositoryStore},
};
use axum::{
    routing::{get, post},
    Router,
};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use thiserror::Error as ThisError;

const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WebhookState {
    pub config: Config,
    pub repositories: Arc<dyn GitRepositoryStore>,
    pub fallback: DowngradeFallback,
}

/// PEM encoded serving certificate and key.
#[derive(Debug, Clone)]
pub struct TlsFiles {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(ThisError, Debug)]
pub enum WebhookError {
    #[error("Failed to load TLS certificate: {0}")]
    Tls(#[source] std::io::Error),
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route(CONVERT_PATH, post(conversion::convert))
        .route(DEFAULTING_PATH, post(admission::defaulting))
        .route(VALIDATION_PATH, post(admission::validation))
        .route(HEALTH_PATH, get(health))
        .with_state(Arc::new(state))
}

async fn health() -> &'static str {
    "ok"
}

async fn shutdown_on_signal(handle: Handle) {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal.");
    }

    tracing::info!("Shutting down.");
    handle.graceful_shutdown(Some(GRACEFUL_SHUTDOWN_TIMEOUT));
}

/// Serves the webhooks until a shutdown signal arrives.
///
/// Uses TLS when `tls` is given. The API server only calls webhooks over
/// HTTPS; plain HTTP is meant for local testing behind a proxy.
pub async fn serve(
    state: WebhookState,
    address: SocketAddr,
    tls: Option<TlsFiles>,
) -> Result<(), WebhookError> {
    let app = router(state).into_make_service();

    let handle = Handle::new();
    tokio::spawn(shutdown_on_signal(handle.clone()));

    match tls {
        Some(TlsFiles { cert, key }) => {
            let config = RustlsConfig::from_pem_file(cert, key)
                .await
                .map_err(WebhookError::Tls)?;

            tracing::info!(%address, "Serving webhooks over TLS.");
            axum_server::bind_rustls(address, config)
                .handle(handle)
                .serve(app)
                .await
                .map_err(WebhookError::Serve)?;
        }
        None => {
            tracing::warn!(%address, "Serving webhooks without TLS.");
            axum_server::bind(address)
                .handle(handle)
                .serve(app)
                .await
                .map_err(WebhookError::Serve)?;
        }
    }

    tracing::info!("Terminated.");

    Ok(())
}
