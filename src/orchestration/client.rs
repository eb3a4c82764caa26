//! Docker Cloud REST client for container lookups.
//!
//! # Responsibilities
//! - Resolve an event's resource URI against the API base URL
//! - Authenticate with HTTP basic auth (user + API key)
//! - Decode the container document into a [`ContainerDescriptor`]

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::config::OrchestrationConfig;
use crate::facts::ContainerDescriptor;

/// Errors fetching a container descriptor.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid resource uri '{0}'")]
    InvalidResourceUri(String),

    #[error("invalid API base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("request for {uri} failed: {reason}")]
    Transport { uri: String, reason: String },

    #[error("API returned status {status} for {uri}")]
    Status { uri: String, status: u16 },

    #[error("invalid container document from {uri}: {reason}")]
    Decode { uri: String, reason: String },

    #[error("no container known for {0}")]
    UnknownContainer(String),
}

/// Resolves resource locators into container descriptors.
#[async_trait]
pub trait ContainerFetcher: Send + Sync {
    async fn fetch(&self, resource_uri: &str) -> Result<ContainerDescriptor, FetchError>;
}

/// Container id from a resource URI such as `/api/app/v1/container/{id}/`.
pub fn container_id(resource_uri: &str) -> Option<&str> {
    resource_uri
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
}

/// `Authorization` header value for HTTP basic auth.
pub fn basic_auth_value(user: &str, api_key: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{api_key}")))
}

/// HTTP client for the orchestration API.
#[derive(Clone)]
pub struct DockerCloudClient {
    http: Client,
    base: Url,
    auth: String,
}

impl DockerCloudClient {
    pub fn new(config: &OrchestrationConfig) -> Result<Self, FetchError> {
        let base = Url::parse(&config.api_url).map_err(|e| FetchError::InvalidBaseUrl {
            url: config.api_url.clone(),
            reason: e.to_string(),
        })?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::Transport {
                uri: config.api_url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            base,
            auth: basic_auth_value(&config.user, &config.api_key),
        })
    }

    /// Absolute URL for a resource URI.
    pub fn resolve(&self, resource_uri: &str) -> Result<Url, FetchError> {
        if container_id(resource_uri).is_none() {
            return Err(FetchError::InvalidResourceUri(resource_uri.to_string()));
        }
        self.base
            .join(resource_uri)
            .map_err(|_| FetchError::InvalidResourceUri(resource_uri.to_string()))
    }
}

impl std::fmt::Debug for DockerCloudClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerCloudClient")
            .field("base", &self.base.as_str())
            .finish()
    }
}

#[async_trait]
impl ContainerFetcher for DockerCloudClient {
    async fn fetch(&self, resource_uri: &str) -> Result<ContainerDescriptor, FetchError> {
        let url = self.resolve(resource_uri)?;
        let transport = |e: reqwest::Error| FetchError::Transport {
            uri: resource_uri.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, &self.auth)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                uri: resource_uri.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(transport)?;
        let mut descriptor: ContainerDescriptor =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode {
                uri: resource_uri.to_string(),
                reason: e.to_string(),
            })?;
        if descriptor.resource_uri.is_empty() {
            descriptor.resource_uri = resource_uri.to_string();
        }

        tracing::debug!(
            container = %descriptor.name,
            resource_uri = %resource_uri,
            envvars = descriptor.envvars.len(),
            "Fetched container"
        );
        Ok(descriptor)
    }
}
