//! Request identification and upstream request construction.
//!
//! # Responsibilities
//! - Assign a request ID to every inbound request (honouring one already set)
//! - Build the request sent to the backend from the inbound one
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Only allow-listed headers travel upstream; the body is streamed, not buffered
//! - The upstream always speaks HTTP/1.1 regardless of the inbound version

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request, Uri};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::load_balancer::BackendTarget;
use crate::security::HeaderAllowList;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates v4 UUID request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// The request ID assigned to `request`, or "unknown" outside the ID layer.
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Rewrite an inbound request for `target`.
///
/// The path and query are kept verbatim. Headers are replaced by the
/// allow-listed subset plus the request ID.
pub fn upstream_request(
    request: Request<Body>,
    target: &BackendTarget,
    allowed: &HeaderAllowList,
    request_id: &str,
) -> Result<Request<Body>, GatewayError> {
    let (parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let uri: Uri = format!("{}{}", target.origin(), path_and_query)
        .parse()
        .map_err(|e| GatewayError::UpstreamProtocol(format!("invalid upstream uri: {e}")))?;

    let mut headers = allowed.filter(&parts.headers);
    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert(X_REQUEST_ID, value);
    }

    let mut upstream = Request::builder()
        .method(parts.method)
        .uri(uri)
        .body(body)
        .map_err(|e| GatewayError::UpstreamProtocol(e.to_string()))?;
    *upstream.headers_mut() = headers;

    Ok(upstream)
}
