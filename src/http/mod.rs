//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, body limit, tracing)
//!     → proxy.rs (resolve route, authorize, pick target)
//!     → request.rs (rewrite URI, filter headers)
//!     → forward with the route timeout
//!     → response.rs (strip hop-by-hop, stream body back)
//! ```
//!
//! `state.rs` tracks each request from RECEIVED to its terminal state.

pub mod proxy;
pub mod request;
pub mod response;
pub mod server;
pub mod state;

pub use proxy::Gateway;
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::HttpServer;
pub use state::{RequestLifecycle, RequestState};
