//! etcd v2 keys API client.
//!
//! # Responsibilities
//! - Map read/write/delete onto `GET`/`PUT`/`DELETE /v2/keys{key}`
//! - Translate etcd's "Key not found" (errorCode 100) into absence
//! - Flatten recursive directory listings into key/value pairs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::config::StoreConfig;
use crate::store::client::KvStore;
use crate::store::types::{StoreError, StoreResult};

/// etcd error code for a missing key.
const KEY_NOT_FOUND: u32 = 100;

#[derive(Debug, Deserialize)]
struct EtcdResponse {
    node: Option<EtcdNode>,
}

#[derive(Debug, Deserialize)]
struct EtcdNode {
    key: String,
    value: Option<String>,
    #[serde(default)]
    dir: bool,
    #[serde(default)]
    nodes: Vec<EtcdNode>,
}

#[derive(Debug, Deserialize)]
struct EtcdErrorBody {
    #[serde(rename = "errorCode")]
    error_code: u32,
    message: String,
}

/// HTTP client for a single etcd endpoint.
#[derive(Clone)]
pub struct EtcdClient {
    http: Client,
    endpoint: String,
}

impl EtcdClient {
    /// Create a client for `endpoint` (e.g. `http://etcd.infra:4001`).
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> StoreResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        Self::new(config.endpoint_url(), Duration::from_secs(config.timeout_secs))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, key: &str) -> String {
        if key.starts_with('/') {
            format!("{}/v2/keys{}", self.endpoint, key)
        } else {
            format!("{}/v2/keys/{}", self.endpoint, key)
        }
    }

    async fn send(&self, key: &str, request: reqwest::RequestBuilder) -> StoreResult<(StatusCode, String)> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Transport(format!("{key}: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Transport(format!("{key}: {e}")))?;
        Ok((status, body))
    }
}

impl std::fmt::Debug for EtcdClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtcdClient")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[async_trait]
impl KvStore for EtcdClient {
    async fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let (status, body) = self.send(key, self.http.get(self.url(key))).await?;

        if is_not_found(status, &body) {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(status_error(key, status, &body));
        }

        let node = decode(key, &body)?.node.ok_or_else(|| StoreError::Decode {
            key: key.to_string(),
            reason: "response has no node".into(),
        })?;
        // Directories exist but carry no value.
        Ok(Some(node.value.unwrap_or_default()))
    }

    async fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        let request = self.http.put(self.url(key)).form(&[("value", value)]);
        let (status, body) = self.send(key, request).await?;

        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(key, status, &body))
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let (status, body) = self.send(key, self.http.delete(self.url(key))).await?;

        if is_not_found(status, &body) {
            Ok(false)
        } else if status.is_success() {
            Ok(true)
        } else {
            Err(status_error(key, status, &body))
        }
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<(String, String)>> {
        let request = self
            .http
            .get(self.url(prefix))
            .query(&[("recursive", "true"), ("sorted", "true")]);
        let (status, body) = self.send(prefix, request).await?;

        if is_not_found(status, &body) {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(status_error(prefix, status, &body));
        }

        let mut leaves = Vec::new();
        if let Some(node) = decode(prefix, &body)?.node {
            flatten(node, &mut leaves);
        }
        leaves.sort();
        Ok(leaves)
    }
}

fn decode(key: &str, body: &str) -> StoreResult<EtcdResponse> {
    serde_json::from_str(body).map_err(|e| StoreError::Decode {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn is_not_found(status: StatusCode, body: &str) -> bool {
    if status != StatusCode::NOT_FOUND {
        return false;
    }
    // Only etcd's own errorCode 100 means absent. A bare 404 comes from
    // something else on the path and is reported as a status error.
    serde_json::from_str::<EtcdErrorBody>(body)
        .map(|err| err.error_code == KEY_NOT_FOUND)
        .unwrap_or(false)
}

fn status_error(key: &str, status: StatusCode, body: &str) -> StoreError {
    let message = match serde_json::from_str::<EtcdErrorBody>(body) {
        Ok(err) => format!("{} (errorCode {})", err.message, err.error_code),
        Err(_) => body.trim().to_string(),
    };
    StoreError::Status {
        key: key.to_string(),
        status: status.as_u16(),
        message,
    }
}

fn flatten(node: EtcdNode, out: &mut Vec<(String, String)>) {
    if node.dir {
        for child in node.nodes {
            flatten(child, out);
        }
    } else if let Some(value) = node.value {
        out.push((node.key, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let client = EtcdClient::new("http://etcd.infra:4001/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint(), "http://etcd.infra:4001");
        assert_eq!(
            client.url("/vulcand/backends/web/backend"),
            "http://etcd.infra:4001/v2/keys/vulcand/backends/web/backend"
        );
        assert_eq!(client.url("plain"), "http://etcd.infra:4001/v2/keys/plain");
    }

    #[test]
    fn test_not_found_detection() {
        let body = r#"{"errorCode":100,"message":"Key not found","cause":"/vulcand","index":7}"#;
        assert!(is_not_found(StatusCode::NOT_FOUND, body));
        assert!(!is_not_found(StatusCode::NOT_FOUND, "404 page not found"));
        assert!(!is_not_found(StatusCode::NOT_FOUND, "{}"));
        assert!(!is_not_found(StatusCode::OK, body));

        let other = r#"{"errorCode":104,"message":"Not a directory","cause":"/x","index":7}"#;
        assert!(!is_not_found(StatusCode::NOT_FOUND, other));
    }

    #[test]
    fn test_status_error_uses_etcd_message() {
        let body = r#"{"errorCode":300,"message":"Raft Internal Error","index":7}"#;
        let err = status_error("/k", StatusCode::INTERNAL_SERVER_ERROR, body);
        assert_eq!(
            err.to_string(),
            "store returned status 500 for /k: Raft Internal Error (errorCode 300)"
        );
    }

    #[test]
    fn test_flatten_recursive_listing() {
        let body = r#"{
            "action": "get",
            "node": {
                "key": "/vulcand",
                "dir": true,
                "nodes": [
                    {"key": "/vulcand/listeners", "dir": true, "nodes": [
                        {"key": "/vulcand/listeners/http", "value": "{}"}
                    ]},
                    {"key": "/vulcand/backends", "dir": true, "nodes": [
                        {"key": "/vulcand/backends/web", "dir": true, "nodes": [
                            {"key": "/vulcand/backends/web/backend", "value": "{\"Type\":\"http\"}"}
                        ]}
                    ]}
                ]
            }
        }"#;

        let mut leaves = Vec::new();
        flatten(decode("/vulcand", body).unwrap().node.unwrap(), &mut leaves);
        leaves.sort();
        assert_eq!(
            leaves,
            vec![
                ("/vulcand/backends/web/backend".to_string(), "{\"Type\":\"http\"}".to_string()),
                ("/vulcand/listeners/http".to_string(), "{}".to_string()),
            ]
        );
    }
}
