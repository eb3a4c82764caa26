//! Shared utilities for integration tests: raw-TCP mock HTTP servers for
//! etcd and the orchestration API, and a websocket event stream.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message;

/// One request as seen by a mock server.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    /// Path including the query string.
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl MockRequest {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or_default()
    }

    pub fn query(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, q)| q)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub type RequestLog = Arc<Mutex<Vec<MockRequest>>>;

/// Start a programmable HTTP server on an ephemeral port.
///
/// Every request is recorded, then answered with `handler`'s status and JSON body.
pub async fn start_programmable_server<F>(handler: F) -> (SocketAddr, RequestLog)
where
    F: Fn(&MockRequest) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let handler = Arc::new(handler);

    let requests = log.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let handler = handler.clone();
            let requests = requests.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                let (status, body) = handler(&request);
                requests.lock().unwrap().push(request);

                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason(status),
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, log)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

async fn read_request(socket: &mut TcpStream) -> Option<MockRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    Some(MockRequest {
        method,
        target,
        headers,
        body,
    })
}

pub type EtcdData = Arc<Mutex<BTreeMap<String, String>>>;

/// Start an in-memory server speaking the subset of the etcd v2 keys API the
/// store client uses.
pub async fn start_mock_etcd() -> (String, EtcdData, RequestLog) {
    let data: EtcdData = Arc::new(Mutex::new(BTreeMap::new()));
    let store = data.clone();

    let (addr, log) = start_programmable_server(move |req| {
        let Some(key) = req.path().strip_prefix("/v2/keys") else {
            return (404, "{}".into());
        };
        let key = key.to_string();
        let mut data = store.lock().unwrap();

        match req.method.as_str() {
            "GET" => {
                if let Some(value) = data.get(&key) {
                    let body = serde_json::json!({
                        "action": "get",
                        "node": {"key": key, "value": value}
                    });
                    return (200, body.to_string());
                }
                let dir = format!("{}/", key.trim_end_matches('/'));
                let nodes: Vec<_> = data
                    .iter()
                    .filter(|(k, _)| k.starts_with(&dir))
                    .map(|(k, v)| serde_json::json!({"key": k, "value": v}))
                    .collect();
                if nodes.is_empty() {
                    (404, key_not_found(&key))
                } else {
                    let body = serde_json::json!({
                        "action": "get",
                        "node": {"key": key, "dir": true, "nodes": nodes}
                    });
                    (200, body.to_string())
                }
            }
            "PUT" => {
                let value = url::form_urlencoded::parse(req.body.as_bytes())
                    .find(|(k, _)| k == "value")
                    .map(|(_, v)| v.into_owned())
                    .unwrap_or_default();
                let created = data.insert(key.clone(), value.clone()).is_none();
                let body = serde_json::json!({
                    "action": "set",
                    "node": {"key": key, "value": value}
                });
                (if created { 201 } else { 200 }, body.to_string())
            }
            "DELETE" => match data.remove(&key) {
                Some(_) => {
                    let body = serde_json::json!({"action": "delete", "node": {"key": key}});
                    (200, body.to_string())
                }
                None => (404, key_not_found(&key)),
            },
            _ => (405, "{}".into()),
        }
    })
    .await;

    (format!("http://{addr}"), data, log)
}

fn key_not_found(key: &str) -> String {
    serde_json::json!({
        "errorCode": 100,
        "message": "Key not found",
        "cause": key,
        "index": 7
    })
    .to_string()
}

/// Start an orchestration API serving `containers`, keyed by resource URI.
pub async fn start_mock_orchestration(
    containers: Vec<(&'static str, serde_json::Value)>,
) -> (String, RequestLog) {
    let containers: BTreeMap<String, serde_json::Value> = containers
        .into_iter()
        .map(|(uri, doc)| (uri.to_string(), doc))
        .collect();

    let (addr, log) = start_programmable_server(move |req| match containers.get(req.path()) {
        Some(doc) => (200, doc.to_string()),
        None => (404, r#"{"detail":"Not found"}"#.into()),
    })
    .await;

    (format!("http://{addr}"), log)
}

/// Start a websocket server that sends `frames` to each client, then closes.
///
/// Returns the `ws://` URL and the `Authorization` header of every handshake.
pub async fn start_event_stream(frames: Vec<String>) -> (String, Arc<Mutex<Vec<Option<String>>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let auth_seen = Arc::new(Mutex::new(Vec::new()));

    let seen = auth_seen.clone();
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let frames = frames.clone();
            let seen = seen.clone();
            tokio::spawn(async move {
                let record = seen.clone();
                let callback = move |req: &Request, resp: Response| {
                    let auth = req
                        .headers()
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    record.lock().unwrap().push(auth);
                    Ok(resp)
                };
                let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(socket, callback).await else {
                    return;
                };
                for frame in frames {
                    if ws.send(Message::text(frame)).await.is_err() {
                        return;
                    }
                }
                let _ = ws.close(None).await;
                // Drain until the client acknowledges the close.
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });

    (format!("ws://{addr}/api/audit/v1/events/"), auth_seen)
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

/// A container document as the orchestration API returns it.
pub fn container_doc(name: &str, env: &[(&str, &str)]) -> serde_json::Value {
    let envvars: Vec<_> = env
        .iter()
        .map(|(k, v)| serde_json::json!({"key": k, "value": v, "origin": "IMAGE"}))
        .collect();
    serde_json::json!({
        "name": name,
        "state": "Running",
        "container_envvars": envvars,
    })
}

/// A lifecycle event payload.
pub fn event(action: &str, state: &str, resource_uri: &str) -> String {
    serde_json::json!({
        "type": "container",
        "action": action,
        "state": state,
        "resource_uri": resource_uri,
    })
    .to_string()
}
