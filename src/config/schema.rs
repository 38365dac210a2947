//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the issuance gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Route definitions mapping requests to backend pools.
    pub routes: Vec<RouteConfig>,

    /// Backend pool definitions.
    pub pools: Vec<PoolConfig>,

    /// Caller allow-list and deny posture.
    pub access: AccessConfig,

    /// Header forwarding policy.
    pub forwarding: ForwardingConfig,

    /// Feature flags for optional routes.
    pub features: BTreeMap<String, bool>,

    /// Active deployment branch and backend artifact pin.
    pub deployment: DeploymentConfig,

    /// Per-branch overlays, keyed by branch name.
    pub profiles: BTreeMap<String, DeploymentProfile>,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            routes: default_routes(),
            pools: vec![PoolConfig {
                name: DEFAULT_POOL.to_string(),
                targets: vec!["http://127.0.0.1:8088".to_string()],
            }],
            access: AccessConfig::default(),
            forwarding: ForwardingConfig::default(),
            features: BTreeMap::new(),
            deployment: DeploymentConfig::default(),
            profiles: BTreeMap::new(),
            health_check: HealthCheckConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Returns true if the named feature flag is switched on.
    /// Flags that were never declared are off.
    pub fn feature_enabled(&self, name: &str) -> bool {
        self.features.get(name).copied().unwrap_or(false)
    }

    /// Routes that are active under the current feature flags.
    pub fn active_routes(&self) -> impl Iterator<Item = &RouteConfig> {
        self.routes.iter().filter(move |r| match &r.feature {
            Some(flag) => self.feature_enabled(flag),
            None => true,
        })
    }

    /// Sections that differ from `running` but are only read at startup.
    pub fn restart_required(&self, running: &GatewayConfig) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.listener != running.listener {
            changed.push("listener");
        }
        if self.health_check != running.health_check {
            changed.push("health_check");
        }
        if self.observability != running.observability {
            changed.push("observability");
        }
        if self.admin != running.admin {
            changed.push("admin");
        }
        changed
    }
}

/// Name of the pool serving the issuance backend in the default table.
pub const DEFAULT_POOL: &str = "issuance";

/// Default upstream timeout for every route.
pub const DEFAULT_TIMEOUT_MS: u64 = 6_000;

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,

    /// How long in-flight requests may take to drain after a shutdown signal.
    pub shutdown_grace_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 1024 * 1024,
            shutdown_grace_secs: 30,
        }
    }
}

/// HTTP method a route answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RouteMethod {
    Get,
    Post,
    Delete,
    Any,
}

impl std::fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RouteMethod::Get => "GET",
            RouteMethod::Post => "POST",
            RouteMethod::Delete => "DELETE",
            RouteMethod::Any => "ANY",
        };
        f.write_str(s)
    }
}

/// Authentication requirement of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Anyone may call the route.
    Public,
    /// Only principals on the allow-list may call the route.
    PrincipalAllowlist,
}

/// Route configuration mapping requests to a backend pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Method to match.
    pub method: RouteMethod,

    /// Path pattern, e.g. `/session/{token}/status` or `/irma/*`.
    pub path: String,

    /// Authentication requirement.
    pub auth: AuthMode,

    /// Backend pool to forward to.
    #[serde(default = "default_pool")]
    pub pool: String,

    /// Upstream timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Feature flag gating this route. The route is inactive unless the flag is on.
    #[serde(default)]
    pub feature: Option<String>,
}

fn default_pool() -> String {
    DEFAULT_POOL.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// The issuance server's HTTP surface.
pub fn default_routes() -> Vec<RouteConfig> {
    let route = |name: &str, method, path: &str, auth, feature: Option<&str>| RouteConfig {
        name: name.to_string(),
        method,
        path: path.to_string(),
        auth,
        pool: default_pool(),
        timeout_ms: DEFAULT_TIMEOUT_MS,
        feature: feature.map(str::to_string),
    };

    vec![
        route("irma", RouteMethod::Any, "/irma/*", AuthMode::Public, None),
        route("session-create", RouteMethod::Post, "/session", AuthMode::PrincipalAllowlist, None),
        route(
            "session-delete",
            RouteMethod::Delete,
            "/session/{token}",
            AuthMode::PrincipalAllowlist,
            Some("session_delete"),
        ),
        route(
            "session-result",
            RouteMethod::Get,
            "/session/{token}/result",
            AuthMode::PrincipalAllowlist,
            Some("session_result"),
        ),
        route(
            "session-status",
            RouteMethod::Get,
            "/session/{token}/status",
            AuthMode::PrincipalAllowlist,
            None,
        ),
        route(
            "session-statusevents",
            RouteMethod::Get,
            "/session/{token}/statusevents",
            AuthMode::PrincipalAllowlist,
            Some("session_status_events"),
        ),
    ]
}

/// A named pool of interchangeable backend targets.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Pool identifier referenced by routes.
    pub name: String,

    /// Target base URLs (e.g., "http://10.0.1.12:8088"). May be empty.
    #[serde(default)]
    pub targets: Vec<String>,
}

/// Caller allow-list configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Principals allowed to call allow-list routes.
    pub allow_list: Vec<String>,

    /// Request header carrying the caller's asserted principal.
    pub principal_header: String,

    /// Add the same-deployment caller to the allow-list.
    pub service_local_caller: bool,

    /// Principal name used for the same-deployment caller.
    pub service_local_principal: String,

    /// Answer denied requests with 404 instead of 403.
    pub strict_deny_as_not_found: bool,

    /// Refuse to start when an allow-list route is active but nobody is allowed.
    pub require_allow_list: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            allow_list: Vec::new(),
            principal_header: "x-caller-principal".to_string(),
            service_local_caller: false,
            service_local_principal: "service-local-caller".to_string(),
            strict_deny_as_not_found: false,
            require_allow_list: true,
        }
    }
}

/// Header forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Inbound headers passed to the backend. Everything else is dropped.
    pub allowed_headers: Vec<String>,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            allowed_headers: vec!["authorization".to_string(), "content-type".to_string()],
        }
    }
}

/// Active deployment branch and the backend artifact it runs.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Branch whose profile is applied on load. None runs the base config as-is.
    pub branch: Option<String>,

    /// Version of the issuance server packed in the backend image.
    pub backend_version: Option<String>,

    /// SHA-256 checksum of the issuance server binary.
    pub backend_checksum: Option<String>,
}

/// Per-branch overlay on top of the base configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DeploymentProfile {
    pub backend_version: Option<String>,
    pub backend_checksum: Option<String>,

    /// Replaces `access.allow_list` when set.
    pub allow_list: Option<Vec<String>>,

    /// Replaces `access.service_local_caller` when set.
    pub service_local_caller: Option<bool>,

    /// Merged over the base feature flags.
    pub features: BTreeMap<String, bool>,
}

/// How the active health monitor probes targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// Succeeds when a TCP connection can be opened.
    Tcp,
    /// Succeeds on a 2xx answer to `GET <path>`.
    Http,
}

/// Health check configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Probe type.
    pub probe: ProbeKind,

    /// Health check interval in seconds.
    pub interval_secs: u64,

    /// Health check timeout in seconds.
    pub timeout_secs: u64,

    /// Path to probe for HTTP health checks.
    pub path: String,

    /// Number of consecutive failures before marking unhealthy.
    pub unhealthy_threshold: u32,

    /// Number of consecutive successes before marking healthy.
    pub healthy_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            probe: ProbeKind::Tcp,
            interval_secs: 10,
            timeout_secs: 5,
            path: "/".to_string(),
            unhealthy_threshold: 3,
            healthy_threshold: 2,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    /// Overridden by `GATEWAY_ADMIN_API_KEY` when that is set.
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
