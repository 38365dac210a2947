//! Caller authorization.
//! Decides whether the asserted principal may call a route.

use std::collections::BTreeSet;

use axum::http::header::{HeaderMap, HeaderName, InvalidHeaderName};

use crate::config::schema::{AccessConfig, AuthMode};
use crate::routing::Route;

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Deny => "deny",
        }
    }
}

/// Principals permitted to call allow-list routes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    principals: BTreeSet<String>,
}

impl AllowList {
    pub fn new<I, S>(principals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            principals: principals
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    /// Build the effective allow-list, including the service-local caller when enabled.
    pub fn from_config(config: &AccessConfig) -> Self {
        let mut list = Self::new(config.allow_list.iter().cloned());
        if config.service_local_caller {
            list.principals.insert(config.service_local_principal.clone());
        }
        list
    }

    pub fn contains(&self, principal: &str) -> bool {
        self.principals.contains(principal)
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.principals.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.principals.iter().map(String::as_str)
    }
}

/// Authorization policy shared by every route in a snapshot.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    allow_list: AllowList,
    principal_header: HeaderName,
    strict_deny_as_not_found: bool,
}

impl AccessPolicy {
    pub fn new(allow_list: AllowList, principal_header: HeaderName, strict: bool) -> Self {
        Self {
            allow_list,
            principal_header,
            strict_deny_as_not_found: strict,
        }
    }

    pub fn from_config(config: &AccessConfig) -> Result<Self, InvalidHeaderName> {
        let header = HeaderName::from_bytes(config.principal_header.as_bytes())?;
        Ok(Self::new(
            AllowList::from_config(config),
            header,
            config.strict_deny_as_not_found,
        ))
    }

    /// Read the caller's principal from the request headers.
    /// Missing, empty, or non-UTF-8 values yield no principal.
    pub fn principal<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        headers
            .get(&self.principal_header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// Check `principal` against the route's auth mode.
    pub fn authorize(&self, route: &Route, principal: Option<&str>) -> Decision {
        match route.auth {
            AuthMode::Public => Decision::Allow,
            AuthMode::PrincipalAllowlist => match principal {
                Some(p) if self.allow_list.contains(p) => Decision::Allow,
                _ => Decision::Deny,
            },
        }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    pub fn principal_header(&self) -> &HeaderName {
        &self.principal_header
    }

    /// Denials are answered as if the route did not exist.
    pub fn strict_deny_as_not_found(&self) -> bool {
        self.strict_deny_as_not_found
    }
}
