//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → profiles.rs (apply the active branch's overlay)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → compiled into a GatewaySnapshot
//!
//! On reload:
//!     watcher.rs detects change
//!     → loader.rs loads, resolves, and validates
//!     → atomic swap of the snapshot
//!     → in-flight requests finish on the old snapshot
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Errors at startup are fatal; errors on reload keep the running config
//! - A reload applies routes, pools, access, forwarding, features and the
//!   deployment pin. `listener`, `health_check`, `observability` and `admin`
//!   are read once at startup; changing them logs a warning and needs a restart

pub mod loader;
pub mod profiles;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AccessConfig, AuthMode, GatewayConfig, HealthCheckConfig, ObservabilityConfig, PoolConfig,
    RouteConfig, RouteMethod,
};
