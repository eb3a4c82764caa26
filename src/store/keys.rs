//! Key namespace and record values read by vulcand.
//!
//! ```text
//! /vulcand/backends/{backend}/backend
//! /vulcand/backends/{backend}/servers/{server}
//! /vulcand/frontends/{backend}/frontend
//! /vulcand/frontends/{backend}/middlewares/{rate|http2https}
//! /vulcand/listeners/{name}
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ListenerConfig, MiddlewareConfig};
use crate::store::types::{StoreError, StoreResult};

/// Root of everything this adapter writes.
pub const ROOT: &str = "/vulcand";

pub fn backend_key(backend: &str) -> String {
    format!("{ROOT}/backends/{backend}/backend")
}

pub fn server_key(backend: &str, server: &str) -> String {
    format!("{ROOT}/backends/{backend}/servers/{server}")
}

pub fn frontend_key(backend: &str) -> String {
    format!("{ROOT}/frontends/{backend}/frontend")
}

pub fn middleware_key(backend: &str, kind: MiddlewareKind) -> String {
    format!("{ROOT}/frontends/{backend}/middlewares/{}", kind.id())
}

pub fn listener_key(name: &str) -> String {
    format!("{ROOT}/listeners/{name}")
}

/// Middlewares attached to every frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MiddlewareKind {
    RateLimit,
    HttpsRedirect,
}

impl MiddlewareKind {
    /// Last key segment.
    pub fn id(self) -> &'static str {
        match self {
            MiddlewareKind::RateLimit => "rate",
            MiddlewareKind::HttpsRedirect => "http2https",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendRecord {
    #[serde(rename = "Type")]
    pub kind: String,
}

impl BackendRecord {
    pub fn http() -> Self {
        Self { kind: "http".into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecord {
    #[serde(rename = "URL")]
    pub url: String,
}

impl ServerRecord {
    pub fn new(host: &str, port: &str) -> Self {
        Self {
            url: format!("http://{host}:{port}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendRecord {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "BackendId")]
    pub backend_id: String,
    #[serde(rename = "Route")]
    pub route: String,
}

impl FrontendRecord {
    /// HTTP frontend matching every path that starts with `route`.
    pub fn path_prefix(backend: &str, route: &str) -> Self {
        Self {
            kind: "http".into(),
            backend_id: backend.into(),
            route: format!("PathRegexp(`{route}.*`)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiddlewareRecord<T> {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Middleware")]
    pub spec: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSpec {
    #[serde(rename = "Requests")]
    pub requests: u32,
    #[serde(rename = "PeriodSeconds")]
    pub period_seconds: u32,
    #[serde(rename = "Burst")]
    pub burst: u32,
    #[serde(rename = "Variable")]
    pub variable: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteSpec {
    #[serde(rename = "Regexp")]
    pub regexp: String,
    #[serde(rename = "Replacement")]
    pub replacement: String,
    #[serde(rename = "Redirect")]
    pub redirect: bool,
}

/// Rate limit keyed by the configured variable.
pub fn rate_limit_record(config: &MiddlewareConfig) -> MiddlewareRecord<RateLimitSpec> {
    MiddlewareRecord {
        kind: "ratelimit".into(),
        spec: RateLimitSpec {
            requests: config.rate_requests,
            period_seconds: config.rate_period_secs,
            burst: config.rate_burst,
            variable: config.rate_variable.clone(),
        },
    }
}

/// Redirect plain http requests to https.
pub fn https_redirect_record() -> MiddlewareRecord<RewriteSpec> {
    MiddlewareRecord {
        kind: "rewrite".into(),
        spec: RewriteSpec {
            regexp: "^http://(.*)$".into(),
            replacement: "https://$1".into(),
            redirect: true,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerRecord {
    #[serde(rename = "Protocol")]
    pub protocol: String,
    #[serde(rename = "Address")]
    pub address: ListenerAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerAddress {
    #[serde(rename = "Network")]
    pub network: String,
    #[serde(rename = "Address")]
    pub address: String,
}

impl From<&ListenerConfig> for ListenerRecord {
    fn from(config: &ListenerConfig) -> Self {
        Self {
            protocol: config.protocol.clone(),
            address: ListenerAddress {
                network: "tcp".into(),
                address: config.address.clone(),
            },
        }
    }
}

/// Serialize a record for storage under `key`.
pub fn encode<T: Serialize>(key: &str, record: &T) -> StoreResult<String> {
    serde_json::to_string(record).map_err(|source| StoreError::Encode {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_json<T: Serialize>(record: &T) -> serde_json::Value {
        serde_json::from_str(&encode("/test", record).unwrap()).unwrap()
    }

    #[test]
    fn test_key_layout() {
        assert_eq!(backend_key("web"), "/vulcand/backends/web/backend");
        assert_eq!(server_key("web", "web-1"), "/vulcand/backends/web/servers/web-1");
        assert_eq!(frontend_key("web"), "/vulcand/frontends/web/frontend");
        assert_eq!(
            middleware_key("web", MiddlewareKind::RateLimit),
            "/vulcand/frontends/web/middlewares/rate"
        );
        assert_eq!(
            middleware_key("web", MiddlewareKind::HttpsRedirect),
            "/vulcand/frontends/web/middlewares/http2https"
        );
        assert_eq!(listener_key("http"), "/vulcand/listeners/http");
    }

    #[test]
    fn test_frontend_value() {
        let record = FrontendRecord::path_prefix("web", "/api");
        assert_eq!(
            as_json(&record),
            json!({"Type": "http", "BackendId": "web", "Route": "PathRegexp(`/api.*`)"})
        );
    }

    #[test]
    fn test_server_and_backend_values() {
        assert_eq!(as_json(&BackendRecord::http()), json!({"Type": "http"}));
        assert_eq!(
            as_json(&ServerRecord::new("web-1.prod", "8080")),
            json!({"URL": "http://web-1.prod:8080"})
        );
    }

    #[test]
    fn test_middleware_values() {
        assert_eq!(
            as_json(&rate_limit_record(&MiddlewareConfig::default())),
            json!({
                "Type": "ratelimit",
                "Middleware": {"Requests": 100, "PeriodSeconds": 1, "Burst": 3, "Variable": "client.ip"}
            })
        );
        assert_eq!(
            as_json(&https_redirect_record()),
            json!({
                "Type": "rewrite",
                "Middleware": {"Regexp": "^http://(.*)$", "Replacement": "https://$1", "Redirect": true}
            })
        );
    }

    #[test]
    fn test_listener_value() {
        let record = ListenerRecord::from(&ListenerConfig::default());
        assert_eq!(
            as_json(&record),
            json!({"Protocol": "http", "Address": {"Network": "tcp", "Address": "0.0.0.0:80"}})
        );
    }
}
