use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::config::schema::{AuthMode, RouteMethod};
use crate::load_balancer::{BackendTarget, HealthState};
use crate::observability::metrics;

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub branch: Option<String>,
    pub backend_version: Option<String>,
    pub backend_checksum: Option<String>,
    pub routes: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteView {
    pub name: String,
    pub method: RouteMethod,
    pub path: String,
    pub auth: AuthMode,
    pub pool: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackendStatus {
    pub pool: String,
    pub address: String,
    pub healthy: bool,
}

/// Body of `POST /admin/health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthOverride {
    pub pool: String,
    pub address: String,
    pub healthy: bool,
}

pub async fn liveness() -> &'static str {
    "OK"
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let snapshot = state.gateway.snapshot();
    let deployment = &snapshot.deployment;

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        branch: deployment.branch.clone(),
        backend_version: deployment.backend_version.clone(),
        backend_checksum: deployment.backend_checksum.clone(),
        routes: snapshot.routes.len(),
    })
}

pub async fn get_routes(State(state): State<AdminState>) -> Json<Vec<RouteView>> {
    let snapshot = state.gateway.snapshot();
    let routes = snapshot
        .routes
        .routes()
        .iter()
        .map(|r| RouteView {
            name: r.name.clone(),
            method: r.method,
            path: r.pattern.as_str().to_string(),
            auth: r.auth,
            pool: r.pool.clone(),
            timeout_ms: r.timeout.as_millis() as u64,
        })
        .collect();

    Json(routes)
}

pub async fn get_backends(State(state): State<AdminState>) -> Json<Vec<BackendStatus>> {
    let statuses = state
        .gateway
        .registry()
        .all_targets()
        .into_iter()
        .map(|(pool, target)| BackendStatus {
            pool,
            address: target.origin().to_string(),
            healthy: target.is_healthy(),
        })
        .collect();

    Json(statuses)
}

/// Out-of-band health override.
pub async fn set_health(
    State(state): State<AdminState>,
    Json(update): Json<HealthOverride>,
) -> Result<Json<BackendStatus>, (StatusCode, String)> {
    let origin = BackendTarget::parse(&update.address)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
        .origin()
        .to_string();

    let target = state
        .gateway
        .registry()
        .all_targets()
        .into_iter()
        .find(|(pool, target)| *pool == update.pool && target.origin() == origin)
        .map(|(_, target)| target)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                format!("no target {} in pool '{}'", origin, update.pool),
            )
        })?;

    let next = if update.healthy {
        HealthState::Healthy
    } else {
        HealthState::Unhealthy
    };
    target.force_state(next);
    metrics::record_backend_health(&update.pool, &origin, update.healthy);
    tracing::info!(pool = %update.pool, target = %origin, healthy = update.healthy, "Health overridden via admin API");

    Ok(Json(BackendStatus {
        pool: update.pool,
        address: origin,
        healthy: target.is_healthy(),
    }))
}
