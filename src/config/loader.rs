//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::SyncConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable holding the orchestration API user.
pub const ENV_USER: &str = "DOCKERCLOUD_USER";
/// Environment variable holding the orchestration API key.
pub const ENV_API_KEY: &str = "DOCKERCLOUD_APIKEY";
/// Environment variable naming the infrastructure stack hosting etcd.
pub const ENV_STACK: &str = "STACK_ENV";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply process environment
/// overrides and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<SyncConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an injectable environment lookup.
pub fn load_config_with_env<F>(path: Option<&Path>, env: F) -> Result<SyncConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    load(path, env, true)
}

/// Load configuration for tools that only talk to the store, where missing
/// orchestration credentials are not an error.
pub fn load_store_config(path: Option<&Path>) -> Result<SyncConfig, ConfigError> {
    load(path, |key| std::env::var(key).ok(), false)
}

fn load<F>(path: Option<&Path>, env: F, require_credentials: bool) -> Result<SyncConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => SyncConfig::default(),
    };

    let config = apply_env_overrides(config.with_default_listeners(), env);
    if let Err(errors) = validate_config(&config) {
        let errors: Vec<_> = errors
            .into_iter()
            .filter(|e| require_credentials || !matches!(e, ValidationError::MissingCredential(..)))
            .collect();
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }
    }

    Ok(config)
}

/// Overlay credentials and stack name from the environment.
///
/// Empty variables are ignored so a blank export does not wipe a value from
/// the config file.
pub fn apply_env_overrides<F>(mut config: SyncConfig, env: F) -> SyncConfig
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| env(key).filter(|v| !v.is_empty());

    if let Some(user) = non_empty(ENV_USER) {
        config.orchestration.user = user;
    }
    if let Some(api_key) = non_empty(ENV_API_KEY) {
        config.orchestration.api_key = api_key;
    }
    if let Some(stack) = non_empty(ENV_STACK) {
        config.store.stack = stack;
    }
    config
}
