//! Backend pool management.
//!
//! # Responsibilities
//! - Manage pools of backend targets grouped by name
//! - Apply the load balancing strategy to select a target
//! - Reconcile pools with new configuration without losing health state

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::schema::PoolConfig;
use crate::load_balancer::{
    backend::{BackendTarget, TargetError},
    random::UniformRandom,
    BackendRegistry, LoadBalancer, NoHealthyTarget,
};

/// An ordered set of interchangeable targets.
///
/// The target list is swapped as a whole; readers never wait on writers.
#[derive(Debug)]
pub struct BackendPool {
    name: String,
    targets: ArcSwap<Vec<Arc<BackendTarget>>>,
}

impl BackendPool {
    pub fn new(name: impl Into<String>, targets: Vec<Arc<BackendTarget>>) -> Self {
        Self {
            name: name.into(),
            targets: ArcSwap::from_pointee(targets),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current target list.
    pub fn targets(&self) -> Arc<Vec<Arc<BackendTarget>>> {
        self.targets.load_full()
    }

    /// Replace the target list (targets added or removed as the backend scales).
    pub fn replace_targets(&self, targets: Vec<Arc<BackendTarget>>) {
        self.targets.store(Arc::new(targets));
    }
}

/// Registry built from static configuration.
#[derive(Debug)]
pub struct StaticRegistry {
    pools: ArcSwap<HashMap<String, Arc<BackendPool>>>,
    balancer: Box<dyn LoadBalancer>,
}

impl StaticRegistry {
    /// Create a registry from configuration.
    pub fn from_config(configs: &[PoolConfig]) -> Result<Self, TargetError> {
        let registry = Self {
            pools: ArcSwap::from_pointee(HashMap::new()),
            balancer: Box::new(UniformRandom::new()),
        };
        registry.reconcile(configs)?;
        Ok(registry)
    }

    /// Bring pools in line with `configs`.
    ///
    /// Targets whose address is unchanged keep their health state. Pools and
    /// targets that disappeared are dropped. On error nothing is changed.
    pub fn reconcile(&self, configs: &[PoolConfig]) -> Result<(), TargetError> {
        let current = self.pools.load();

        let mut existing: HashMap<String, Arc<BackendTarget>> = HashMap::new();
        for pool in current.values() {
            for target in pool.targets().iter() {
                existing.insert(target.origin().to_string(), target.clone());
            }
        }

        // Parse everything before touching any pool.
        let mut parsed = Vec::with_capacity(configs.len());
        for config in configs {
            let mut targets = Vec::with_capacity(config.targets.len());
            for address in &config.targets {
                let target = BackendTarget::parse(address)?;
                let target = match existing.get(target.origin()) {
                    Some(known) => known.clone(),
                    None => Arc::new(target),
                };
                targets.push(target);
            }
            parsed.push((config.name.clone(), targets));
        }

        let mut next = HashMap::with_capacity(parsed.len());
        for (name, targets) in parsed {
            let pool = match current.get(&name) {
                Some(pool) => {
                    pool.replace_targets(targets);
                    pool.clone()
                }
                None => Arc::new(BackendPool::new(name.clone(), targets)),
            };
            next.insert(name, pool);
        }

        self.pools.store(Arc::new(next));
        Ok(())
    }

    pub fn pool(&self, name: &str) -> Option<Arc<BackendPool>> {
        self.pools.load().get(name).cloned()
    }
}

impl BackendRegistry for StaticRegistry {
    fn pick(&self, pool_id: &str) -> Result<Arc<BackendTarget>, NoHealthyTarget> {
        let Some(pool) = self.pool(pool_id) else {
            tracing::debug!(pool = %pool_id, "Pool not found in registry");
            return Err(NoHealthyTarget::new(pool_id));
        };

        let targets = pool.targets();
        match self.balancer.next_server(&targets) {
            Some(target) => Ok(target),
            None => {
                tracing::debug!(pool = %pool_id, target_count = targets.len(), "No healthy targets in pool");
                Err(NoHealthyTarget::new(pool_id))
            }
        }
    }

    fn all_targets(&self) -> Vec<(String, Arc<BackendTarget>)> {
        let pools = self.pools.load();
        let mut names: Vec<&String> = pools.keys().collect();
        names.sort();

        names
            .into_iter()
            .flat_map(|name| {
                pools[name]
                    .targets()
                    .iter()
                    .map(|t| (name.clone(), t.clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}
