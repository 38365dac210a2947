//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe each target (TCP connect or HTTP GET)
//!     → mark_success / mark_failure on the target
//!
//! Admin override (admin::handlers):
//!     POST /admin/health
//!     → force_state on the target
//! ```
//!
//! # Design Decisions
//! - The router never writes health; it only reads it when picking
//! - State transitions require consecutive successes/failures
//! - Probe errors are logged and counted as failures, never fatal

pub mod active;

pub use active::HealthMonitor;
