//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (tracing, body limit, request ID)
//! - Bind server to listener
//! - Run the health monitor and apply configuration reloads
//! - Serve the admin API when enabled

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin::{setup_admin_router, AdminState};
use crate::config::GatewayConfig;
use crate::health::HealthMonitor;
use crate::http::proxy::Gateway;
use crate::http::request::MakeRequestUuid;
use crate::load_balancer::{BackendRegistry, StaticRegistry};
use crate::observability::metrics;
use crate::snapshot::{GatewaySnapshot, SnapshotError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    gateway: Arc<Gateway>,
    registry: Arc<StaticRegistry>,
}

impl HttpServer {
    /// Create a new HTTP server from a validated configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, SnapshotError> {
        let registry = Arc::new(StaticRegistry::from_config(&config.pools)?);
        let snapshot = GatewaySnapshot::from_config(&config)?;
        let gateway = Arc::new(Gateway::new(
            snapshot,
            registry.clone() as Arc<dyn BackendRegistry>,
        ));

        let state = AppState {
            gateway: gateway.clone(),
        };
        let router = Self::build_router(&config, state);

        Ok(Self {
            router,
            config,
            gateway,
            registry,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub fn gateway(&self) -> Arc<Gateway> {
        self.gateway.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Validated configurations arriving on `config_updates` replace the
    /// routing snapshot and reconcile backend pools.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.gateway.snapshot().routes.len(),
            "HTTP server starting"
        );

        let monitor = HealthMonitor::new(
            self.registry.clone() as Arc<dyn BackendRegistry>,
            self.config.health_check.clone(),
        );
        tokio::spawn(monitor.run(shutdown.resubscribe()));

        tokio::spawn(apply_updates(
            self.gateway.clone(),
            self.registry.clone(),
            self.config.clone(),
            config_updates,
            shutdown.resubscribe(),
        ));

        if self.config.admin.enabled {
            let admin = AdminState::new(self.gateway.clone(), self.config.admin.api_key.clone());
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");
            let mut admin_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                let result = axum::serve(admin_listener, setup_admin_router(admin))
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = result {
                    tracing::error!(error = %e, "Admin server failed");
                }
            });
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.gateway.handle(request).await
}

/// Apply configuration updates until the channel closes or shutdown fires.
async fn apply_updates(
    gateway: Arc<Gateway>,
    registry: Arc<StaticRegistry>,
    mut running: GatewayConfig,
    mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(config) = update else { break };
                match reload(&gateway, &registry, &config) {
                    Ok(()) => {
                        let ignored = config.restart_required(&running);
                        if !ignored.is_empty() {
                            tracing::warn!(
                                sections = ?ignored,
                                "Configuration sections changed that only take effect after a restart"
                            );
                        }
                        metrics::record_config_reload("applied");
                        tracing::info!(
                            routes = gateway.snapshot().routes.len(),
                            pools = config.pools.len(),
                            "Configuration reloaded"
                        );
                        // Startup-only sections keep comparing against what is live.
                        running = GatewayConfig {
                            listener: running.listener,
                            health_check: running.health_check,
                            observability: running.observability,
                            admin: running.admin,
                            ..config
                        };
                    }
                    Err(e) => {
                        metrics::record_config_reload("rejected");
                        tracing::error!(error = %e, "Failed to apply config. Keeping current configuration.");
                    }
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

/// Compile and install `config`. Nothing changes if compilation fails.
pub fn reload(
    gateway: &Gateway,
    registry: &StaticRegistry,
    config: &GatewayConfig,
) -> Result<(), SnapshotError> {
    let snapshot = GatewaySnapshot::from_config(config)?;
    registry.reconcile(&config.pools)?;
    gateway.swap_snapshot(snapshot);
    Ok(())
}
