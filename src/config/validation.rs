//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference declared pools)
//! - Validate value ranges and formats (timeouts, addresses, checksums)
//! - Detect conflicting routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Only routes active under the current feature flags take part in conflict checks
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{AuthMode, GatewayConfig};
use crate::load_balancer::BackendTarget;
use crate::routing::PathPattern;
use crate::security::{AllowList, HeaderAllowList};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("route '{route}': invalid path pattern '{path}': {reason}")]
    InvalidPattern { route: String, path: String, reason: String },

    #[error("route '{route}' duplicates {method} {path}")]
    DuplicateRoute { route: String, method: String, path: String },

    #[error("route '{route}' references undeclared pool '{pool}'")]
    UnknownPool { route: String, pool: String },

    #[error("route '{route}' has a zero timeout")]
    ZeroTimeout { route: String },

    #[error("pool '{0}' declared more than once")]
    DuplicatePool(String),

    #[error("pool '{pool}': invalid target '{target}': {reason}")]
    InvalidTarget { pool: String, target: String, reason: String },

    #[error("allow-list routes are active but the allow-list is empty")]
    EmptyAllowList,

    #[error("invalid header name '{0}'")]
    InvalidHeader(String),

    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("backend checksum must be 64 hex characters, got '{0}'")]
    InvalidChecksum(String),

    #[error("admin API enabled without an API key")]
    MissingAdminKey,

    #[error("health check thresholds and interval must be greater than zero")]
    InvalidHealthCheck,
}

/// Validate a fully resolved (profile applied) configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Pools
    let mut pools = HashSet::new();
    for pool in &config.pools {
        if !pools.insert(pool.name.as_str()) {
            errors.push(ValidationError::DuplicatePool(pool.name.clone()));
        }
        for target in &pool.targets {
            if let Err(e) = BackendTarget::parse(target) {
                errors.push(ValidationError::InvalidTarget {
                    pool: pool.name.clone(),
                    target: target.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    // Routes
    let mut seen = HashSet::new();
    let mut needs_allow_list = false;
    for route in config.active_routes() {
        match PathPattern::parse(&route.path) {
            Ok(pattern) => {
                if !seen.insert((route.method, pattern.canonical())) {
                    errors.push(ValidationError::DuplicateRoute {
                        route: route.name.clone(),
                        method: route.method.to_string(),
                        path: route.path.clone(),
                    });
                }
            }
            Err(e) => errors.push(ValidationError::InvalidPattern {
                route: route.name.clone(),
                path: route.path.clone(),
                reason: e.to_string(),
            }),
        }

        if !pools.contains(route.pool.as_str()) {
            errors.push(ValidationError::UnknownPool {
                route: route.name.clone(),
                pool: route.pool.clone(),
            });
        }
        if route.timeout_ms == 0 {
            errors.push(ValidationError::ZeroTimeout {
                route: route.name.clone(),
            });
        }
        needs_allow_list |= route.auth == AuthMode::PrincipalAllowlist;
    }

    // Access
    if needs_allow_list
        && config.access.require_allow_list
        && AllowList::from_config(&config.access).is_empty()
    {
        errors.push(ValidationError::EmptyAllowList);
    }
    if HeaderAllowList::parse([&config.access.principal_header]).is_err() {
        errors.push(ValidationError::InvalidHeader(config.access.principal_header.clone()));
    }
    for name in &config.forwarding.allowed_headers {
        if HeaderAllowList::parse([name]).is_err() {
            errors.push(ValidationError::InvalidHeader(name.clone()));
        }
    }

    // Deployment
    if let Some(checksum) = &config.deployment.backend_checksum {
        if checksum.len() != 64 || !checksum.chars().all(|c| c.is_ascii_hexdigit()) {
            errors.push(ValidationError::InvalidChecksum(checksum.clone()));
        }
    }

    // Listeners
    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::MissingAdminKey);
        }
    }

    let hc = &config.health_check;
    if hc.enabled && (hc.interval_secs == 0 || hc.healthy_threshold == 0 || hc.unhealthy_threshold == 0) {
        errors.push(ValidationError::InvalidHealthCheck);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
