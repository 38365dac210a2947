//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the matching route for a method and path
//! - Return the matched route or an explicit not-found
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan over routes (acceptable for typical route counts)
//! - Most specific path wins, then exact method over ANY, then declaration order

use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use thiserror::Error;

use crate::config::schema::{AuthMode, RouteConfig, RouteMethod};
use crate::routing::matcher::{has_dot_segment, PathPattern, PatternError};

/// No route covers the requested method and path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no route for {method} {path}")]
pub struct RouteNotFound {
    pub method: Method,
    pub path: String,
}

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    pub method: RouteMethod,
    pub pattern: PathPattern,
    pub auth: AuthMode,
    pub pool: String,
    pub timeout: Duration,
}

impl Route {
    /// Compile a route from its configuration.
    pub fn from_config(config: &RouteConfig) -> Result<Self, PatternError> {
        Ok(Self {
            name: config.name.clone(),
            method: config.method,
            pattern: PathPattern::parse(&config.path)?,
            auth: config.auth,
            pool: config.pool.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }

    fn method_rank(&self, method: &Method) -> Option<u8> {
        match self.method {
            RouteMethod::Any => Some(0),
            RouteMethod::Get if method == Method::GET => Some(1),
            RouteMethod::Post if method == Method::POST => Some(1),
            RouteMethod::Delete if method == Method::DELETE => Some(1),
            _ => None,
        }
    }
}

/// Immutable table of compiled routes in declaration order.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    /// Build a table from routes already compiled and validated.
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            routes: routes.into_iter().map(Arc::new).collect(),
        }
    }

    /// Compile the given route configs in order.
    pub fn from_config<'a>(
        configs: impl IntoIterator<Item = &'a RouteConfig>,
    ) -> Result<Self, PatternError> {
        let routes = configs
            .into_iter()
            .map(Route::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(routes))
    }

    /// Find the route for a request.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<Arc<Route>, RouteNotFound> {
        let not_found = || RouteNotFound {
            method: method.clone(),
            path: path.to_string(),
        };
        if has_dot_segment(path) {
            return Err(not_found());
        }

        let mut best: Option<(&Arc<Route>, Vec<u8>, u8)> = None;

        for route in &self.routes {
            let Some(method_rank) = route.method_rank(method) else {
                continue;
            };
            if !route.pattern.matches(path) {
                continue;
            }

            let specificity = route.pattern.specificity();
            let better = match &best {
                None => true,
                // Strictly greater only: on a tie the earlier route stays.
                Some((_, best_spec, best_method)) => {
                    (&specificity, method_rank) > (best_spec, *best_method)
                }
            };
            if better {
                best = Some((route, specificity, method_rank));
            }
        }

        best.map(|(route, _, _)| route.clone()).ok_or_else(not_found)
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
