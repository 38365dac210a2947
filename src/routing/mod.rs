//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → table.rs (route lookup)
//!     → matcher.rs (evaluate path pattern)
//!     → Return: matched Route or RouteNotFound
//!
//! Route Compilation (at load):
//!     RouteConfig[] (feature flags applied)
//!     → Parse path patterns
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at load, immutable at runtime
//! - Reconfiguration replaces the whole table, never patches it
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod table;

pub use matcher::{PathPattern, PatternError};
pub use table::{Route, RouteNotFound, RouteTable};
