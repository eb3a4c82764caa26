//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check required credentials are present
//! - Validate value ranges (timeouts > 0, URLs parse)
//! - Detect duplicate listener names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SyncConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::SyncConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must be set (environment variable {1})")]
    MissingCredential(&'static str, &'static str),

    #[error("{field} is not a valid URL: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("duplicate listener name '{0}'")]
    DuplicateListener(String),
}

/// Validate a fully assembled configuration.
pub fn validate_config(config: &SyncConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.orchestration.user.is_empty() {
        errors.push(ValidationError::MissingCredential(
            "orchestration.user",
            "DOCKERCLOUD_USER",
        ));
    }
    if config.orchestration.api_key.is_empty() {
        errors.push(ValidationError::MissingCredential(
            "orchestration.api_key",
            "DOCKERCLOUD_APIKEY",
        ));
    }

    check_url(&mut errors, "store endpoint", &config.store.endpoint_url());
    check_url(&mut errors, "events.url", &config.events.url);
    check_url(&mut errors, "orchestration.api_url", &config.orchestration.api_url);

    if config.store.timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("store.timeout_secs"));
    }
    if config.store.known_keys_cache && config.store.known_keys_ttl_secs == 0 {
        errors.push(ValidationError::ZeroValue("store.known_keys_ttl_secs"));
    }
    if config.events.event_timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("events.event_timeout_secs"));
    }
    if config.events.channel_capacity == 0 {
        errors.push(ValidationError::ZeroValue("events.channel_capacity"));
    }
    if config.orchestration.timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("orchestration.timeout_secs"));
    }

    if config.routing.route_key.is_empty() {
        errors.push(ValidationError::Empty("routing.route_key"));
    }
    if config.routing.port_key.is_empty() {
        errors.push(ValidationError::Empty("routing.port_key"));
    }

    if config.middleware.rate_limit_enabled {
        if config.middleware.rate_requests == 0 {
            errors.push(ValidationError::ZeroValue("middleware.rate_requests"));
        }
        if config.middleware.rate_period_secs == 0 {
            errors.push(ValidationError::ZeroValue("middleware.rate_period_secs"));
        }
    }

    let mut seen = HashSet::new();
    for listener in &config.listeners {
        if listener.name.is_empty() {
            errors.push(ValidationError::Empty("listeners.name"));
        } else if !seen.insert(listener.name.as_str()) {
            errors.push(ValidationError::DuplicateListener(listener.name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if url::Url::parse(value).is_err() {
        errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        });
    }
}
