//! Uniform random selection strategy.

use std::sync::Arc;

use rand::seq::IteratorRandom;

use crate::load_balancer::{backend::BackendTarget, LoadBalancer};

/// Picks uniformly at random among the healthy targets.
#[derive(Debug, Default)]
pub struct UniformRandom;

impl UniformRandom {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for UniformRandom {
    fn next_server(&self, targets: &[Arc<BackendTarget>]) -> Option<Arc<BackendTarget>> {
        targets
            .iter()
            .filter(|t| t.is_healthy())
            .choose(&mut rand::thread_rng())
            .cloned()
    }
}
