//! Route fact extraction.
//!
//! # Responsibilities
//! - Derive the backend grouping name from a container name
//! - Read route pattern and target port from the container environment
//! - Build the target hostname, qualified by stack when declared
//!
//! # Design Decisions
//! - No defaulting: a missing route or port skips the container
//! - Empty environment values count as missing

use thiserror::Error;

use crate::config::RoutingConfig;
use crate::facts::descriptor::ContainerDescriptor;

/// Required facts absent from a container descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactError {
    #[error("no route found for container {container} (env {key})")]
    MissingRoute { container: String, key: String },

    #[error("no port found for container {container} (env {key})")]
    MissingPort { container: String, key: String },
}

/// Routing facts derived from one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteFacts {
    pub service_name: String,
    pub backend_name: String,
    pub route_pattern: String,
    pub target_port: String,
    pub target_host: String,
}

impl RouteFacts {
    /// Target URL of the server record.
    pub fn target_url(&self) -> String {
        format!("http://{}:{}", self.target_host, self.target_port)
    }
}

/// Backend name: the prefix of `service_name` before the first `separator`.
///
/// ```
/// use vulcand_sync::facts::backend_name;
///
/// assert_eq!(backend_name("web-1", '-'), "web");
/// assert_eq!(backend_name("api", '-'), "api");
/// ```
pub fn backend_name(service_name: &str, separator: char) -> &str {
    match service_name.split_once(separator) {
        Some((prefix, _)) => prefix,
        None => service_name,
    }
}

/// Extracts [`RouteFacts`] using the configured environment keys.
#[derive(Debug, Clone, Default)]
pub struct FactExtractor {
    settings: RoutingConfig,
}

impl FactExtractor {
    pub fn new(settings: RoutingConfig) -> Self {
        Self { settings }
    }

    /// Backend name of a container using the configured separator.
    pub fn backend_name<'a>(&self, service_name: &'a str) -> &'a str {
        backend_name(service_name, self.settings.separator)
    }

    pub fn route_pattern<'a>(&self, descriptor: &'a ContainerDescriptor) -> Option<&'a str> {
        lookup(descriptor, &self.settings.route_key)
    }

    pub fn target_port<'a>(&self, descriptor: &'a ContainerDescriptor) -> Option<&'a str> {
        lookup(descriptor, &self.settings.port_key)
    }

    /// Container name, or `name.stack` when the container declares a stack.
    pub fn target_host(&self, descriptor: &ContainerDescriptor) -> String {
        match lookup(descriptor, &self.settings.stack_key) {
            Some(stack) => format!("{}.{}", descriptor.name, stack),
            None => descriptor.name.clone(),
        }
    }

    /// Derive all route facts, or report which required fact is missing.
    pub fn extract(&self, descriptor: &ContainerDescriptor) -> Result<RouteFacts, FactError> {
        let route_pattern =
            self.route_pattern(descriptor)
                .ok_or_else(|| FactError::MissingRoute {
                    container: descriptor.name.clone(),
                    key: self.settings.route_key.clone(),
                })?;
        let target_port =
            self.target_port(descriptor)
                .ok_or_else(|| FactError::MissingPort {
                    container: descriptor.name.clone(),
                    key: self.settings.port_key.clone(),
                })?;

        Ok(RouteFacts {
            service_name: descriptor.name.clone(),
            backend_name: self.backend_name(&descriptor.name).to_string(),
            route_pattern: route_pattern.to_string(),
            target_port: target_port.to_string(),
            target_host: self.target_host(descriptor),
        })
    }
}

fn lookup<'a>(descriptor: &'a ContainerDescriptor, key: &str) -> Option<&'a str> {
    descriptor.env(key).filter(|value| !value.is_empty())
}
