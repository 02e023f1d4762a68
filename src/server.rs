//! Webhook HTTPS server

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tracing::{error, info};

use crate::error::Error;
use crate::webhook::{webhook_router, WebhookState};

/// How long in-flight reviews get to finish after a shutdown signal
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address to bind the server
    pub addr: SocketAddr,
    /// Path to the PEM certificate chain
    pub cert_file: PathBuf,
    /// Path to the PEM private key matching `cert_file`
    pub key_file: PathBuf,
}

impl ServerConfig {
    /// Listen on all interfaces at `port`
    pub fn new(port: u16, cert_file: impl Into<PathBuf>, key_file: impl Into<PathBuf>) -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], port)),
            cert_file: cert_file.into(),
            key_file: key_file.into(),
        }
    }
}

/// Load the TLS certificate and key
pub async fn load_tls_config(config: &ServerConfig) -> Result<RustlsConfig, Error> {
    RustlsConfig::from_pem_file(&config.cert_file, &config.key_file)
        .await
        .map_err(|e| {
            Error::tls(format!(
                "failed to load key pair ({}, {}): {}",
                config.cert_file.display(),
                config.key_file.display(),
                e
            ))
        })
}

/// Start the webhook server and run until SIGINT or SIGTERM
pub async fn start_server(config: ServerConfig, state: Arc<WebhookState>) -> Result<(), Error> {
    let tls_config = load_tls_config(&config).await?;
    let app = webhook_router(state);

    let handle = Handle::new();
    tokio::spawn(shutdown_on_signal(handle.clone()));

    info!(addr = %config.addr, "Starting webhook server");

    axum_server::bind_rustls(config.addr, tls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .map_err(|e| Error::server(format!("failed to listen and serve webhook server: {e}")))?;

    info!("Webhook server stopped");
    Ok(())
}

/// Wait for a shutdown signal, then drain the server
async fn shutdown_on_signal(handle: Handle) {
    wait_for_signal().await;
    info!("Got OS shutdown signal, shutting down webhook server gracefully");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE_PERIOD));
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for ctrl-c");
    }
}
