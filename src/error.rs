//! Error types for request handling.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::load_balancer::NoHealthyTarget;
use crate::routing::RouteNotFound;

/// Body shared by "no such route" and strict-mode denials, so the two are
/// indistinguishable on the wire.
pub const NOT_FOUND_BODY: &str = "Not Found";

/// Everything that can stop a request from being relayed.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    RouteNotFound(#[from] RouteNotFound),

    /// The principal is not allowed on this route.
    #[error("principal not allowed on route '{route}'")]
    AuthDenied { route: String, as_not_found: bool },

    #[error(transparent)]
    NoHealthyTarget(#[from] NoHealthyTarget),

    /// The backend did not answer within the route timeout.
    #[error("upstream did not respond within {timeout_ms} ms")]
    UpstreamTimeout { timeout_ms: u64 },

    /// The connection to the backend was refused or reset.
    #[error("upstream connection failed: {0}")]
    UpstreamConnection(String),

    /// Any other failure talking to the backend.
    #[error("upstream protocol error: {0}")]
    UpstreamProtocol(String),

    /// The client streamed more than `listener.max_body_bytes`.
    #[error("request body exceeded the configured limit")]
    PayloadTooLarge,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::AuthDenied { as_not_found: true, .. } => StatusCode::NOT_FOUND,
            GatewayError::AuthDenied { .. } => StatusCode::FORBIDDEN,
            GatewayError::NoHealthyTarget(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamConnection(_) | GatewayError::UpstreamProtocol(_) => {
                StatusCode::BAD_GATEWAY
            }
            GatewayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    fn client_message(&self) -> &'static str {
        match self {
            GatewayError::RouteNotFound(_) => NOT_FOUND_BODY,
            GatewayError::AuthDenied { as_not_found: true, .. } => NOT_FOUND_BODY,
            GatewayError::AuthDenied { .. } => "Forbidden",
            GatewayError::NoHealthyTarget(_) => "No healthy backends",
            GatewayError::UpstreamTimeout { .. } => "Upstream timed out",
            GatewayError::UpstreamConnection(_) | GatewayError::UpstreamProtocol(_) => {
                "Upstream request failed"
            }
            GatewayError::PayloadTooLarge => "Payload Too Large",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        // Internal details stay in the logs.
        (self.status(), self.client_message()).into_response()
    }
}
