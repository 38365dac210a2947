//! OS signal handling.
//!
//! SIGINT and SIGTERM end the process gracefully. SIGHUP re-reads the
//! configuration file and feeds it into the same update channel the file
//! watcher uses.

use std::path::PathBuf;

use tokio::signal;
use tokio::sync::{broadcast, mpsc};

use crate::config::{load_config, GatewayConfig};
use crate::observability::metrics;

/// Resolves on the first SIGINT or SIGTERM.
pub async fn wait_for_termination() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT received"),
        _ = terminate => tracing::info!("SIGTERM received"),
    }
}

/// Reload configuration on every SIGHUP until shutdown.
#[cfg(unix)]
pub async fn reload_on_hangup(
    path: PathBuf,
    branch: Option<String>,
    updates: mpsc::UnboundedSender<GatewayConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut hangup = match signal::unix::signal(signal::unix::SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGHUP handler");
            return;
        }
    };

    loop {
        tokio::select! {
            _ = hangup.recv() => {
                tracing::info!(path = ?path, "SIGHUP received, reloading configuration");
                match load_config(&path, branch.as_deref()) {
                    Ok(config) => {
                        if updates.send(config).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        metrics::record_config_reload("rejected");
                        tracing::error!(error = %e, "Reload rejected. Keeping current configuration.");
                    }
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

#[cfg(not(unix))]
pub async fn reload_on_hangup(
    _path: PathBuf,
    _branch: Option<String>,
    _updates: mpsc::UnboundedSender<GatewayConfig>,
    _shutdown: broadcast::Receiver<()>,
) {
}
