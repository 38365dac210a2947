//! Backend response relay and upstream error classification.
//!
//! # Design Decisions
//! - Streaming responses avoid buffering the entire body
//! - Hop-by-hop headers stripped automatically
//! - Refused or reset connections map to a connection error, anything else
//!   that goes wrong on the wire is a protocol error
//! - A client body cut off by the size limit is the client's fault, not the
//!   backend's

use std::error::Error as StdError;
use std::io;

use axum::body::Body;
use axum::response::Response;
use http_body_util::LengthLimitError;
use hyper::body::Incoming;

use crate::error::GatewayError;
use crate::security::headers::strip_hop_by_hop;

/// Turn a backend response into the client response, status and body unchanged.
pub fn relay(response: hyper::Response<Incoming>) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}

pub fn classify_upstream_error(err: hyper_util::client::legacy::Error) -> GatewayError {
    if exceeded_body_limit(&err) {
        return GatewayError::PayloadTooLarge;
    }
    let detail = error_chain(&err);
    if err.is_connect() || has_connection_io_error(&err) {
        GatewayError::UpstreamConnection(detail)
    } else {
        GatewayError::UpstreamProtocol(detail)
    }
}

fn has_connection_io_error(err: &(dyn StdError + 'static)) -> bool {
    let mut source = err.source();
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<io::Error>() {
            if matches!(
                io.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            ) {
                return true;
            }
        }
        source = e.source();
    }
    false
}

/// The request body stream was cut off by `RequestBodyLimitLayer`.
fn exceeded_body_limit(err: &(dyn StdError + 'static)) -> bool {
    let mut source = err.source();
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// "outer: inner: root" rendering for logs.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(e) = source {
        out.push_str(": ");
        out.push_str(&e.to_string());
        source = e.source();
    }
    out
}
