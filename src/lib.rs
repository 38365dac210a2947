//! Issuance gateway.
//!
//! A routing and access-control front door for a credential issuance backend.
//!
//! ```text
//!  client ──▶ http::server ──▶ routing::RouteTable ──▶ security::AccessPolicy
//!                                                           │
//!                                                           ▼
//!  client ◀── http::response ◀── backend ◀── load_balancer::BackendRegistry
//! ```
//!
//! Routing rules, the caller allow-list and the header policy live in an
//! immutable [`snapshot::GatewaySnapshot`] swapped atomically on reload.
//! Backend health is maintained by [`health::HealthMonitor`] and the admin API.

// Core subsystems
pub mod config;
pub mod http;
pub mod routing;
pub mod snapshot;

// Traffic management
pub mod health;
pub mod load_balancer;

// Cross-cutting concerns
pub mod admin;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::{Gateway, HttpServer};
pub use lifecycle::Shutdown;
