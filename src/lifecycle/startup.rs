//! Startup orchestration.
//!
//! Order: configuration, logging, metrics, config watcher, listener, server.
//! Any error before the listener accepts traffic is fatal.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::watcher::ConfigWatcher;
use crate::config::{load_config, ConfigError};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::observability::{logging, metrics};
use crate::snapshot::SnapshotError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("config watcher: {0}")]
    Watch(#[from] notify::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where to load configuration from.
#[derive(Debug, Clone)]
pub struct StartupOptions {
    pub config_path: PathBuf,
    pub branch: Option<String>,
}

/// Run the gateway until SIGINT or SIGTERM.
pub async fn run(options: StartupOptions) -> Result<(), StartupError> {
    let config = load_config(&options.config_path, options.branch.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        branch = config.deployment.branch.as_deref().unwrap_or("<none>"),
        backend_version = config.deployment.backend_version.as_deref().unwrap_or("<unpinned>"),
        "issuance-gateway starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new(Duration::from_secs(config.listener.shutdown_grace_secs));

    let (watcher, updates) = ConfigWatcher::new(&options.config_path, options.branch.clone());
    tokio::spawn(signals::reload_on_hangup(
        options.config_path.clone(),
        options.branch.clone(),
        watcher.sender(),
        shutdown.subscribe(),
    ));
    // Dropping the watcher stops it.
    let _watcher = watcher.run()?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;
    let server = tokio::spawn(server.run(listener, updates, shutdown.subscribe()));

    signals::wait_for_termination().await;
    shutdown.trigger();

    match shutdown.drain(server).await {
        Some(Err(e)) => return Err(e.into()),
        Some(Ok(())) => {}
        None => tracing::warn!("Server did not drain cleanly"),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
