//! Immutable routing and access configuration in effect for a request.
//!
//! A snapshot is compiled from a validated [`GatewayConfig`] and swapped in as a
//! whole. Requests load it once on entry, so a reload never changes the rules
//! halfway through a request.

use axum::http::header::InvalidHeaderName;
use thiserror::Error;

use crate::config::schema::{DeploymentConfig, GatewayConfig};
use crate::load_balancer::TargetError;
use crate::routing::{PatternError, RouteTable};
use crate::security::{AccessPolicy, HeaderAllowList};

/// Errors compiling configuration into runtime structures.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid route pattern: {0}")]
    Pattern(#[from] PatternError),

    #[error("invalid header name: {0}")]
    Header(#[from] InvalidHeaderName),

    #[error("invalid backend target: {0}")]
    Target(#[from] TargetError),
}

#[derive(Debug)]
pub struct GatewaySnapshot {
    pub routes: RouteTable,
    pub access: AccessPolicy,
    pub forward_headers: HeaderAllowList,
    pub deployment: DeploymentConfig,
}

impl GatewaySnapshot {
    pub fn from_config(config: &GatewayConfig) -> Result<Self, SnapshotError> {
        Ok(Self {
            routes: RouteTable::from_config(config.active_routes())?,
            access: AccessPolicy::from_config(&config.access)?,
            forward_headers: HeaderAllowList::parse(&config.forwarding.allowed_headers)?,
            deployment: config.deployment.clone(),
        })
    }
}
