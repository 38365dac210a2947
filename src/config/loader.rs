//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::profiles::apply_profile;
use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable that overrides `admin.api_key`.
pub const ADMIN_KEY_ENV: &str = "GATEWAY_ADMIN_API_KEY";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No configuration for branch '{0}' found")]
    UnknownBranch(String),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse TOML without resolving profiles or validating.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load, resolve, and validate configuration from a TOML file.
///
/// `branch` overrides `deployment.branch` from the file.
pub fn load_config(path: &Path, branch: Option<&str>) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    finalize_config(config, branch)
}

/// Apply the branch profile and environment overrides, then validate.
pub fn finalize_config(
    mut config: GatewayConfig,
    branch: Option<&str>,
) -> Result<GatewayConfig, ConfigError> {
    if let Some(branch) = branch {
        config.deployment.branch = Some(branch.to_string());
    }
    let mut config = apply_profile(config)?;

    if let Ok(key) = std::env::var(ADMIN_KEY_ENV) {
        if !key.is_empty() {
            config.admin.api_key = key;
        }
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
