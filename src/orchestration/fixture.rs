//! Fetcher serving descriptors from memory.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::facts::ContainerDescriptor;
use crate::orchestration::client::{container_id, ContainerFetcher, FetchError};

/// Serves descriptors keyed by container id, for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    containers: HashMap<String, ContainerDescriptor>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor under the id taken from its resource URI.
    pub fn insert(&mut self, descriptor: ContainerDescriptor) -> Result<(), FetchError> {
        let id = container_id(&descriptor.resource_uri)
            .ok_or_else(|| FetchError::InvalidResourceUri(descriptor.resource_uri.clone()))?
            .to_string();
        self.containers.insert(id, descriptor);
        Ok(())
    }

    pub fn with(mut self, descriptor: ContainerDescriptor) -> Result<Self, FetchError> {
        self.insert(descriptor)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}

#[async_trait]
impl ContainerFetcher for StaticFetcher {
    async fn fetch(&self, resource_uri: &str) -> Result<ContainerDescriptor, FetchError> {
        let id = container_id(resource_uri)
            .ok_or_else(|| FetchError::InvalidResourceUri(resource_uri.to_string()))?;
        self.containers
            .get(id)
            .cloned()
            .ok_or_else(|| FetchError::UnknownContainer(resource_uri.to_string()))
    }
}
