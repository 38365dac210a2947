//! Per-branch deployment profiles.
//!
//! Each deployed branch (acceptance, main, ...) pins its own backend artifact,
//! caller allow-list, and optional routes. The active branch's profile is laid
//! over the base configuration at load time.

use crate::config::loader::ConfigError;
use crate::config::schema::GatewayConfig;

/// Apply the profile of `config.deployment.branch`, if a branch is set.
///
/// Fails when the branch has no profile, so a typo never falls back to the
/// base allow-list silently.
pub fn apply_profile(mut config: GatewayConfig) -> Result<GatewayConfig, ConfigError> {
    let Some(branch) = config.deployment.branch.clone() else {
        return Ok(config);
    };

    let profile = config
        .profiles
        .get(&branch)
        .cloned()
        .ok_or_else(|| ConfigError::UnknownBranch(branch.clone()))?;

    if profile.backend_version.is_some() {
        config.deployment.backend_version = profile.backend_version;
    }
    if profile.backend_checksum.is_some() {
        config.deployment.backend_checksum = profile.backend_checksum;
    }
    if let Some(allow_list) = profile.allow_list {
        config.access.allow_list = allow_list;
    }
    if let Some(service_local) = profile.service_local_caller {
        config.access.service_local_caller = service_local;
    }
    config.features.extend(profile.features);

    tracing::debug!(branch = %branch, "Deployment profile applied");
    Ok(config)
}
