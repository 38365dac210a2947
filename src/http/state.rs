//! Per-request lifecycle.
//!
//! ```text
//! RECEIVED → ROUTED → AUTHORIZED → DISPATCHED → COMPLETED
//!     ↓         ↓          ↓            ↓
//! NOT_FOUND   DENIED   UNAVAILABLE   TIMED_OUT | BACKEND_ERROR | BODY_TOO_LARGE
//! ```
//!
//! Transitions only move forward and every request ends in exactly one
//! terminal state.

use std::fmt;

use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Routed,
    Authorized,
    Dispatched,
    Completed,
    TimedOut,
    BackendError,
    Denied,
    NotFound,
    Unavailable,
    BodyTooLarge,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            RequestState::Received
                | RequestState::Routed
                | RequestState::Authorized
                | RequestState::Dispatched
        )
    }

    pub fn can_advance_to(self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Received, Routed | NotFound)
                | (Routed, Authorized | Denied)
                | (Authorized, Dispatched | Unavailable)
                | (Dispatched, Completed | TimedOut | BackendError | BodyTooLarge)
        )
    }

    /// Label used for the `outcome` metric dimension and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            RequestState::Received => "received",
            RequestState::Routed => "routed",
            RequestState::Authorized => "authorized",
            RequestState::Dispatched => "dispatched",
            RequestState::Completed => "completed",
            RequestState::TimedOut => "timed_out",
            RequestState::BackendError => "backend_error",
            RequestState::Denied => "denied",
            RequestState::NotFound => "not_found",
            RequestState::Unavailable => "unavailable",
            RequestState::BodyTooLarge => "body_too_large",
        }
    }

    /// Terminal state reached when `err` stops a request.
    pub fn for_error(err: &GatewayError) -> RequestState {
        match err {
            GatewayError::RouteNotFound(_) => RequestState::NotFound,
            GatewayError::AuthDenied { .. } => RequestState::Denied,
            GatewayError::NoHealthyTarget(_) => RequestState::Unavailable,
            GatewayError::UpstreamTimeout { .. } => RequestState::TimedOut,
            GatewayError::UpstreamConnection(_) | GatewayError::UpstreamProtocol(_) => {
                RequestState::BackendError
            }
            GatewayError::PayloadTooLarge => RequestState::BodyTooLarge,
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks one request through its states.
#[derive(Debug)]
pub struct RequestLifecycle {
    request_id: String,
    state: RequestState,
    route: Option<String>,
}

impl RequestLifecycle {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            state: RequestState::Received,
            route: None,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Name of the matched route, once routed.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    pub fn set_route(&mut self, name: &str) {
        self.route = Some(name.to_string());
    }

    /// Move to `next`. Returns false and stays put on an illegal transition.
    pub fn advance(&mut self, next: RequestState) -> bool {
        if !self.state.can_advance_to(next) {
            tracing::warn!(
                request_id = %self.request_id,
                from = %self.state,
                to = %next,
                "Illegal request state transition"
            );
            return false;
        }
        tracing::trace!(request_id = %self.request_id, from = %self.state, to = %next, "Request state");
        self.state = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::NoHealthyTarget;

    #[test]
    fn happy_path() {
        let mut lifecycle = RequestLifecycle::new("r1");
        for next in [
            RequestState::Routed,
            RequestState::Authorized,
            RequestState::Dispatched,
            RequestState::Completed,
        ] {
            assert!(lifecycle.advance(next));
        }
        assert!(lifecycle.state().is_terminal());
    }

    #[test]
    fn terminal_states_are_final() {
        let mut lifecycle = RequestLifecycle::new("r2");
        assert!(lifecycle.advance(RequestState::NotFound));
        assert!(!lifecycle.advance(RequestState::Routed));
        assert!(!lifecycle.advance(RequestState::Completed));
        assert_eq!(lifecycle.state(), RequestState::NotFound);
    }

    #[test]
    fn no_skipping_or_going_back() {
        let mut lifecycle = RequestLifecycle::new("r3");
        assert!(!lifecycle.advance(RequestState::Dispatched));
        assert!(lifecycle.advance(RequestState::Routed));
        assert!(!lifecycle.advance(RequestState::Received));
        assert!(!lifecycle.advance(RequestState::Unavailable));
        assert!(!lifecycle.advance(RequestState::TimedOut));
        assert_eq!(lifecycle.state(), RequestState::Routed);
    }

    #[test]
    fn errors_map_to_their_stage() {
        let unavailable = GatewayError::from(NoHealthyTarget::new("p"));
        assert_eq!(RequestState::for_error(&unavailable), RequestState::Unavailable);
        assert!(RequestState::Authorized.can_advance_to(RequestState::for_error(&unavailable)));

        let timeout = GatewayError::UpstreamTimeout { timeout_ms: 1 };
        assert!(RequestState::Dispatched.can_advance_to(RequestState::for_error(&timeout)));

        let denied = GatewayError::AuthDenied { route: "r".into(), as_not_found: true };
        assert!(RequestState::Routed.can_advance_to(RequestState::for_error(&denied)));

        let too_large = RequestState::for_error(&GatewayError::PayloadTooLarge);
        assert_eq!(too_large, RequestState::BodyTooLarge);
        assert!(RequestState::Dispatched.can_advance_to(too_large));
        assert_ne!(too_large, RequestState::BackendError);
    }
}
