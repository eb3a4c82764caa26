//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the adapter.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the sync daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SyncConfig {
    /// Key-value store (etcd) connection settings.
    pub store: StoreConfig,

    /// Event stream subscription settings.
    pub events: EventsConfig,

    /// Orchestration API settings (container lookups).
    pub orchestration: OrchestrationConfig,

    /// How routing facts are read from container environments.
    pub routing: RoutingConfig,

    /// Middleware records attached to every frontend.
    pub middleware: MiddlewareConfig,

    /// Listeners written once at startup.
    pub listeners: Vec<ListenerConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl SyncConfig {
    /// Config with the default listener set filled in.
    ///
    /// `Default` leaves `listeners` empty so that a config file declaring its
    /// own list does not get the default appended by serde.
    pub fn with_default_listeners(mut self) -> Self {
        if self.listeners.is_empty() {
            self.listeners.push(ListenerConfig::default());
        }
        self
    }
}

/// Key-value store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Stack suffix used to build the store hostname (`etcd.<stack>`).
    pub stack: String,

    /// Store port.
    pub port: u16,

    /// URL scheme for the store.
    pub scheme: String,

    /// Full endpoint URL; overrides `scheme`, `stack` and `port` when set.
    pub endpoint: Option<String>,

    /// Per-operation timeout in seconds.
    pub timeout_secs: u64,

    /// Cache keys known to exist to skip read round-trips.
    pub known_keys_cache: bool,

    /// Lifetime of a known-keys cache entry in seconds.
    pub known_keys_ttl_secs: u64,
}

impl StoreConfig {
    /// Resolve the store endpoint URL.
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("{}://etcd.{}:{}", self.scheme, self.stack, self.port),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            stack: "infra".to_string(),
            port: 4001,
            scheme: "http".to_string(),
            endpoint: None,
            timeout_secs: 5,
            known_keys_cache: false,
            known_keys_ttl_secs: 60,
        }
    }
}

/// Event stream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Websocket URL of the event stream.
    pub url: String,

    /// Capacity of the channel between the event source and the dispatcher.
    pub channel_capacity: usize,

    /// Deadline for handling one event (fetch + reconcile) in seconds.
    pub event_timeout_secs: u64,

    /// Reconnect after the stream closes or fails.
    pub reconnect: bool,

    /// Base delay for reconnect backoff in milliseconds.
    pub reconnect_base_delay_ms: u64,

    /// Maximum delay for reconnect backoff in milliseconds.
    pub reconnect_max_delay_ms: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            url: "wss://ws.cloud.docker.com/api/audit/v1/events/".to_string(),
            channel_capacity: 256,
            event_timeout_secs: 30,
            reconnect: true,
            reconnect_base_delay_ms: 500,
            reconnect_max_delay_ms: 30_000,
        }
    }
}

/// Orchestration API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// Base URL that resource URIs are resolved against.
    pub api_url: String,

    /// API user. Usually supplied through `DOCKERCLOUD_USER`.
    pub user: String,

    /// API key. Usually supplied through `DOCKERCLOUD_APIKEY`.
    pub api_key: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            api_url: "https://cloud.docker.com".to_string(),
            user: String::new(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

/// Environment keys and naming rules for route facts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Environment variable holding the route path prefix.
    pub route_key: String,

    /// Environment variable holding the target port.
    pub port_key: String,

    /// Environment variable holding the stack qualifier.
    pub stack_key: String,

    /// Separator between backend name and instance suffix.
    pub separator: char,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            route_key: "ROUTE".to_string(),
            port_key: "PORT".to_string(),
            stack_key: "DOCKERCLOUD_STACK_NAME".to_string(),
            separator: '-',
        }
    }
}

/// Middleware configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MiddlewareConfig {
    /// Attach the rate-limit middleware.
    pub rate_limit_enabled: bool,

    /// Requests allowed per period.
    pub rate_requests: u32,

    /// Rate period in seconds.
    pub rate_period_secs: u32,

    /// Burst allowance.
    pub rate_burst: u32,

    /// Variable the limit is keyed on.
    pub rate_variable: String,

    /// Attach the http -> https redirect middleware.
    pub https_redirect_enabled: bool,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            rate_limit_enabled: true,
            rate_requests: 100,
            rate_period_secs: 1,
            rate_burst: 3,
            rate_variable: "client.ip".to_string(),
            https_redirect_enabled: true,
        }
    }
}

/// Listener record written at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ListenerConfig {
    /// Listener name (last key segment).
    pub name: String,

    /// Protocol served by the proxy on this listener.
    pub protocol: String,

    /// Bind address (e.g., "0.0.0.0:80").
    pub address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            name: "http".to_string(),
            protocol: "http".to_string(),
            address: "0.0.0.0:80".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_endpoint_from_stack() {
        let config = StoreConfig::default();
        assert_eq!(config.endpoint_url(), "http://etcd.infra:4001");

        let config = StoreConfig {
            stack: "prod".to_string(),
            ..StoreConfig::default()
        };
        assert_eq!(config.endpoint_url(), "http://etcd.prod:4001");
    }

    #[test]
    fn test_store_endpoint_override() {
        let config = StoreConfig {
            endpoint: Some("http://127.0.0.1:2379/".to_string()),
            ..StoreConfig::default()
        };
        assert_eq!(config.endpoint_url(), "http://127.0.0.1:2379");
    }

    #[test]
    fn test_default_listeners() {
        let config = SyncConfig::default();
        assert!(config.listeners.is_empty());

        let config = config.with_default_listeners();
        assert_eq!(config.listeners, vec![ListenerConfig::default()]);
        assert_eq!(config.listeners[0].address, "0.0.0.0:80");
    }

    #[test]
    fn test_partial_toml() {
        let config: SyncConfig = toml::from_str(
            r#"
            [store]
            stack = "staging"

            [middleware]
            rate_burst = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.store.stack, "staging");
        assert_eq!(config.store.port, 4001);
        assert_eq!(config.middleware.rate_burst, 10);
        assert_eq!(config.middleware.rate_requests, 100);
        assert_eq!(config.routing.separator, '-');
    }
}
