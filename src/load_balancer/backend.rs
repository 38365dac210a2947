//! Backend target abstraction.
//!
//! # Responsibilities
//! - Represent a single backend target of a pool
//! - Track health state (Healthy/Unhealthy) with hysteresis
//! - Provide the origin used to build upstream URIs

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use thiserror::Error;
use url::Url;

/// Health State enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            2 => HealthState::Unhealthy,
            _ => HealthState::Healthy,
        }
    }
}

/// Errors for target addresses that cannot be proxied to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("unsupported scheme '{0}' (only http)")]
    Scheme(String),

    #[error("missing host")]
    MissingHost,

    #[error("target must not carry a path or query")]
    HasPath,
}

/// A single backend target.
#[derive(Debug)]
pub struct BackendTarget {
    /// Origin as `http://host:port`, used as the upstream URI prefix.
    origin: String,
    host: String,
    port: u16,

    /// Current health state.
    state: AtomicU8,
    /// Consecutive failure count.
    consecutive_failures: AtomicUsize,
    /// Consecutive success count.
    consecutive_successes: AtomicUsize,
}

impl BackendTarget {
    /// Parse a target address such as `http://10.0.1.12:8088`.
    /// A bare `host:port` is read as `http://host:port`.
    pub fn parse(address: &str) -> Result<Self, TargetError> {
        let address = address.trim();
        let url = if address.contains("://") {
            Url::parse(address)?
        } else {
            Url::parse(&format!("http://{}", address))?
        };

        if url.scheme() != "http" {
            return Err(TargetError::Scheme(url.scheme().to_string()));
        }
        if !(url.path().is_empty() || url.path() == "/") || url.query().is_some() {
            return Err(TargetError::HasPath);
        }
        let host = url.host_str().ok_or(TargetError::MissingHost)?.to_string();
        let port = url.port_or_known_default().unwrap_or(80);

        Ok(Self {
            origin: url.origin().ascii_serialization(),
            host,
            port,
            state: AtomicU8::new(HealthState::Healthy as u8),
            consecutive_failures: AtomicUsize::new(0),
            consecutive_successes: AtomicUsize::new(0),
        })
    }

    /// `http://host[:port]`, without trailing slash.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Relaxed))
    }

    // --- Health Logic ---

    pub fn is_healthy(&self) -> bool {
        self.state() == HealthState::Healthy
    }

    /// Report a successful check. Returns true when this flips the target to healthy.
    pub fn mark_success(&self, healthy_threshold: usize) -> bool {
        self.consecutive_failures.store(0, Ordering::Relaxed);

        if self.is_healthy() {
            return false;
        }

        let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
        if successes >= healthy_threshold {
            self.force_state(HealthState::Healthy);
            return true;
        }
        false
    }

    /// Report a failed check. Returns true when this flips the target to unhealthy.
    pub fn mark_failure(&self, unhealthy_threshold: usize) -> bool {
        self.consecutive_successes.store(0, Ordering::Relaxed);

        if !self.is_healthy() {
            return false;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= unhealthy_threshold {
            self.force_state(HealthState::Unhealthy);
            return true;
        }
        false
    }

    /// Set the state directly and reset the counters.
    pub fn force_state(&self, state: HealthState) {
        self.state.store(state as u8, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.consecutive_successes.store(0, Ordering::Relaxed);
    }
}
