//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every target of every pool
//! - Update target health state based on results

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::schema::{HealthCheckConfig, ProbeKind};
use crate::load_balancer::{BackendRegistry, BackendTarget};
use crate::observability::metrics;

pub struct HealthMonitor {
    registry: Arc<dyn BackendRegistry>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(registry: Arc<dyn BackendRegistry>, config: HealthCheckConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            registry,
            config,
            client,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            probe = ?self.config.probe,
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every target once.
    pub async fn check_all(&self) {
        for (pool, target) in self.registry.all_targets() {
            let healthy = self.probe(&target).await;

            let flipped = if healthy {
                target.mark_success(self.config.healthy_threshold as usize)
            } else {
                target.mark_failure(self.config.unhealthy_threshold as usize)
            };
            if flipped {
                tracing::info!(
                    pool = %pool,
                    target = %target.origin(),
                    healthy = target.is_healthy(),
                    "Target health changed"
                );
            }

            metrics::record_backend_health(&pool, target.origin(), target.is_healthy());
        }
    }

    async fn probe(&self, target: &BackendTarget) -> bool {
        let timeout = Duration::from_secs(self.config.timeout_secs);

        match self.config.probe {
            ProbeKind::Tcp => {
                match time::timeout(timeout, TcpStream::connect((target.host(), target.port()))).await {
                    Ok(Ok(_)) => true,
                    Ok(Err(e)) => {
                        tracing::warn!(target = %target.origin(), error = %e, "Health check failed: connection error");
                        false
                    }
                    Err(_) => {
                        tracing::warn!(target = %target.origin(), "Health check failed: timeout");
                        false
                    }
                }
            }
            ProbeKind::Http => {
                let uri = format!("{}{}", target.origin(), self.config.path);
                let request = match Request::builder()
                    .method("GET")
                    .uri(uri)
                    .header("user-agent", "issuance-gateway-health-check")
                    .body(Body::empty())
                {
                    Ok(req) => req,
                    Err(e) => {
                        tracing::error!("Failed to build health check request: {}", e);
                        return false;
                    }
                };

                match time::timeout(timeout, self.client.request(request)).await {
                    Ok(Ok(response)) => {
                        let success = response.status().is_success();
                        if !success {
                            tracing::warn!(target = %target.origin(), status = %response.status(), "Health check failed: non-success status");
                        }
                        success
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(target = %target.origin(), error = %e, "Health check failed: connection error");
                        false
                    }
                    Err(_) => {
                        tracing::warn!(target = %target.origin(), "Health check failed: timeout");
                        false
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::PoolConfig;
    use crate::load_balancer::StaticRegistry;
    use tokio::net::TcpListener;

    fn config(probe: ProbeKind) -> HealthCheckConfig {
        HealthCheckConfig {
            enabled: true,
            probe,
            interval_secs: 1,
            timeout_secs: 1,
            path: "/".into(),
            unhealthy_threshold: 2,
            healthy_threshold: 1,
        }
    }

    #[tokio::test]
    async fn tcp_probe_marks_closed_port_unhealthy() {
        let open = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open_addr = open.local_addr().unwrap();

        // Bind then drop to get a port with nothing listening.
        let closed_addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();

        let registry = Arc::new(
            StaticRegistry::from_config(&[PoolConfig {
                name: "issuance".into(),
                targets: vec![open_addr.to_string(), closed_addr.to_string()],
            }])
            .unwrap(),
        );
        let monitor = HealthMonitor::new(registry.clone(), config(ProbeKind::Tcp));

        monitor.check_all().await;
        monitor.check_all().await;

        let targets = registry.pool("issuance").unwrap().targets();
        assert!(targets[0].is_healthy());
        assert!(!targets[1].is_healthy());

        drop(open);
    }

    #[tokio::test]
    async fn http_probe_requires_success_status() {
        let closed_addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
        let registry = Arc::new(
            StaticRegistry::from_config(&[PoolConfig {
                name: "issuance".into(),
                targets: vec![closed_addr.to_string()],
            }])
            .unwrap(),
        );
        let monitor = HealthMonitor::new(registry.clone(), config(ProbeKind::Http));

        monitor.check_all().await;
        assert!(registry.pick("issuance").is_ok(), "one failure is below threshold");
        monitor.check_all().await;
        assert!(registry.pick("issuance").is_err());
    }
}
