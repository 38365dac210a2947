//! Header filtering between client, gateway, and backend.
//!
//! # Responsibilities
//! - Forward only allow-listed inbound headers to the backend
//! - Strip hop-by-hop headers from backend responses
//!
//! # Design Decisions
//! - Default deny: an inbound header reaches the backend only when listed
//! - Host and framing headers are produced by the upstream client, never copied

use axum::http::header::{self, HeaderMap, HeaderName, InvalidHeaderName};

/// Headers that describe a single connection and must not be relayed.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    HeaderName::from_static("keep-alive"),
];

/// Set of inbound header names that may be forwarded upstream.
#[derive(Debug, Clone, Default)]
pub struct HeaderAllowList {
    names: Vec<HeaderName>,
}

impl HeaderAllowList {
    /// Parse header names. Names are case-insensitive; duplicates collapse.
    pub fn parse<I, S>(names: I) -> Result<Self, InvalidHeaderName>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed: Vec<HeaderName> = Vec::new();
        for name in names {
            let name = HeaderName::from_bytes(name.as_ref().trim().as_bytes())?;
            if !parsed.contains(&name) {
                parsed.push(name);
            }
        }
        Ok(Self { names: parsed })
    }

    pub fn contains(&self, name: &HeaderName) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> &[HeaderName] {
        &self.names
    }

    /// Copy the allow-listed headers (all values of each) into a fresh map.
    pub fn filter(&self, inbound: &HeaderMap) -> HeaderMap {
        let mut out = HeaderMap::new();
        for name in &self.names {
            if HOP_BY_HOP.contains(name) {
                continue;
            }
            for value in inbound.get_all(name) {
                out.append(name.clone(), value.clone());
            }
        }
        out
    }
}

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}
