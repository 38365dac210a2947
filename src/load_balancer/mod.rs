//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → backend pool identified
//!     → pool.rs (registry looks up the pool's current targets)
//!     → random.rs (uniform pick among healthy targets)
//!     → backend.rs (target origin for the upstream URI)
//!     → Return target or NoHealthyTarget
//! ```
//!
//! # Design Decisions
//! - Health is written by health collaborators only; selection just reads it
//! - Target lists are swapped atomically, so `pick` never blocks
//! - Any discovery mechanism can sit behind `BackendRegistry`

use std::sync::Arc;

use thiserror::Error;

pub mod backend;
pub mod pool;
pub mod random;

pub use backend::{BackendTarget, HealthState, TargetError};
pub use pool::{BackendPool, StaticRegistry};

/// No target of the pool can take traffic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no healthy target in pool '{pool}'")]
pub struct NoHealthyTarget {
    pub pool: String,
}

impl NoHealthyTarget {
    pub fn new(pool: impl Into<String>) -> Self {
        Self { pool: pool.into() }
    }
}

/// Strategy choosing one target out of a pool.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Returns a healthy target, or None if there is none.
    fn next_server(&self, targets: &[Arc<BackendTarget>]) -> Option<Arc<BackendTarget>>;
}

/// Source of backend targets for the router.
///
/// Implementations that cannot determine health for a pool must report
/// `NoHealthyTarget` rather than guess.
pub trait BackendRegistry: Send + Sync + std::fmt::Debug {
    /// Select a target of `pool_id`.
    fn pick(&self, pool_id: &str) -> Result<Arc<BackendTarget>, NoHealthyTarget>;

    /// Every target with its pool name, for health checking and inspection.
    fn all_targets(&self) -> Vec<(String, Arc<BackendTarget>)>;
}
