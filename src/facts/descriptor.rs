//! Container descriptors as returned by the orchestration API.

use serde::{Deserialize, Serialize};

/// One environment entry of a container.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

/// Snapshot of one container, fetched by resource locator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContainerDescriptor {
    /// Container name, e.g. `web-1`.
    pub name: String,

    /// Environment entries in declaration order.
    #[serde(rename = "container_envvars", default)]
    pub envvars: Vec<EnvVar>,

    /// Locator used to re-fetch this container.
    #[serde(default)]
    pub resource_uri: String,
}

impl ContainerDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            envvars: Vec::new(),
            resource_uri: String::new(),
        }
    }

    /// Add an environment entry.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envvars.push(EnvVar {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_resource_uri(mut self, uri: impl Into<String>) -> Self {
        self.resource_uri = uri.into();
        self
    }

    /// Look up an environment value. The first matching entry wins.
    pub fn env(&self, key: &str) -> Option<&str> {
        self.envvars
            .iter()
            .find(|var| var.key == key)
            .map(|var| var.value.as_str())
    }
}
