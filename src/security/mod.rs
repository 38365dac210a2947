//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Routed request:
//!     → access_control.rs (principal vs. allow-list)
//!     → headers.rs (forward only allow-listed headers)
//!     → Pass to upstream
//! ```
//!
//! # Design Decisions
//! - Fail closed: a missing principal is denied on protected routes
//! - No trust in client input beyond the asserted principal header

pub mod access_control;
pub mod headers;

pub use access_control::{AccessPolicy, AllowList, Decision};
pub use headers::HeaderAllowList;
