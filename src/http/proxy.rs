//! Request pipeline: resolve, authorize, select, forward.

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::error::GatewayError;
use crate::http::request::{request_id, upstream_request};
use crate::http::response::{classify_upstream_error, relay};
use crate::http::state::{RequestLifecycle, RequestState};
use crate::load_balancer::BackendRegistry;
use crate::observability::metrics;
use crate::security::Decision;
use crate::snapshot::GatewaySnapshot;

/// The gateway core, shared by every connection.
#[derive(Debug)]
pub struct Gateway {
    snapshot: ArcSwap<GatewaySnapshot>,
    registry: Arc<dyn BackendRegistry>,
    client: Client<HttpConnector, Body>,
}

impl Gateway {
    pub fn new(snapshot: GatewaySnapshot, registry: Arc<dyn BackendRegistry>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            snapshot: ArcSwap::from_pointee(snapshot),
            registry,
            client,
        }
    }

    /// Rules currently in effect.
    pub fn snapshot(&self) -> Arc<GatewaySnapshot> {
        self.snapshot.load_full()
    }

    /// Install new rules. In-flight requests finish under the old ones.
    pub fn swap_snapshot(&self, snapshot: GatewaySnapshot) {
        self.snapshot.store(Arc::new(snapshot));
    }

    pub fn registry(&self) -> &Arc<dyn BackendRegistry> {
        &self.registry
    }

    /// Handle one request to completion. Never fails; errors become responses.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let method = request.method().to_string();
        let path = request.uri().path().to_string();
        let mut lifecycle = RequestLifecycle::new(request_id(&request));

        tracing::debug!(
            request_id = %lifecycle.request_id(),
            method = %method,
            path = %path,
            "Proxying request"
        );

        let snapshot = self.snapshot();
        let response = match self.process(&snapshot, request, &mut lifecycle).await {
            Ok(response) => {
                lifecycle.advance(RequestState::Completed);
                tracing::debug!(
                    request_id = %lifecycle.request_id(),
                    route = lifecycle.route().unwrap_or("none"),
                    status = response.status().as_u16(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Request completed"
                );
                response
            }
            Err(err) => {
                lifecycle.advance(RequestState::for_error(&err));
                log_failure(&lifecycle, &method, &path, &err);
                err.into_response()
            }
        };

        metrics::record_request(
            &method,
            response.status().as_u16(),
            lifecycle.route().unwrap_or("none"),
            lifecycle.state().as_str(),
            start,
        );
        response
    }

    async fn process(
        &self,
        snapshot: &GatewaySnapshot,
        request: Request<Body>,
        lifecycle: &mut RequestLifecycle,
    ) -> Result<Response, GatewayError> {
        // 1. Resolve
        let route = snapshot.routes.resolve(request.method(), request.uri().path())?;
        lifecycle.set_route(&route.name);
        lifecycle.advance(RequestState::Routed);

        // 2. Authorize
        let principal = snapshot.access.principal(request.headers());
        let decision = snapshot.access.authorize(&route, principal);
        metrics::record_auth_decision(decision.as_str());
        if decision == Decision::Deny {
            tracing::debug!(
                request_id = %lifecycle.request_id(),
                route = %route.name,
                principal = principal.unwrap_or("<none>"),
                "Principal not allowed"
            );
            return Err(GatewayError::AuthDenied {
                route: route.name.clone(),
                as_not_found: snapshot.access.strict_deny_as_not_found(),
            });
        }
        lifecycle.advance(RequestState::Authorized);

        // 3. Select
        let target = self.registry.pick(&route.pool)?;

        // 4. Forward
        lifecycle.advance(RequestState::Dispatched);
        let upstream = upstream_request(
            request,
            &target,
            &snapshot.forward_headers,
            lifecycle.request_id(),
        )?;
        tracing::debug!(
            request_id = %lifecycle.request_id(),
            route = %route.name,
            target = %target.origin(),
            "Dispatching to backend"
        );

        // Dropping the pending future on timeout closes the backend connection.
        match tokio::time::timeout(route.timeout, self.client.request(upstream)).await {
            Ok(Ok(response)) => Ok(relay(response)),
            Ok(Err(err)) => Err(classify_upstream_error(err)),
            Err(_) => Err(GatewayError::UpstreamTimeout {
                timeout_ms: route.timeout.as_millis() as u64,
            }),
        }
    }
}

fn log_failure(lifecycle: &RequestLifecycle, method: &str, path: &str, err: &GatewayError) {
    let request_id = lifecycle.request_id();
    let route = lifecycle.route().unwrap_or("none");
    match err {
        GatewayError::RouteNotFound(_) | GatewayError::AuthDenied { .. } => {
            tracing::warn!(request_id = %request_id, method = %method, path = %path, route = %route, error = %err, "Request rejected");
        }
        GatewayError::NoHealthyTarget(_) => {
            tracing::warn!(request_id = %request_id, route = %route, error = %err, "No healthy backends");
        }
        GatewayError::PayloadTooLarge => {
            tracing::warn!(request_id = %request_id, method = %method, path = %path, route = %route, "Request body too large");
        }
        GatewayError::UpstreamTimeout { .. }
        | GatewayError::UpstreamConnection(_)
        | GatewayError::UpstreamProtocol(_) => {
            tracing::error!(request_id = %request_id, route = %route, error = %err, "Upstream error");
        }
    }
}
