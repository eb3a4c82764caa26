//! Websocket subscription to the container event stream.
//!
//! # Responsibilities
//! - Connect with basic auth and forward every text frame as a payload
//! - Report connection lifecycle (opened, error, closed) on the same channel
//! - Reconnect with jittered exponential backoff until shutdown
//!
//! # Design Decisions
//! - The channel is bounded; a slow dispatcher stops reads, which leaves
//!   flow control to the websocket transport
//! - Ping/pong is handled by tungstenite while reading

use futures_util::StreamExt;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::config::{EventsConfig, SyncConfig};
use crate::events::types::SourceSignal;
use crate::observability::metrics;
use crate::orchestration::basic_auth_value;
use crate::resilience::ReconnectBackoff;

/// Errors of one subscription attempt.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid event stream request: {0}")]
    Request(String),

    #[error("failed to connect to event stream: {0}")]
    Connect(#[source] tungstenite::Error),

    #[error("event stream failed: {0}")]
    Stream(#[source] tungstenite::Error),
}

enum SessionEnd {
    /// The server closed the stream.
    Closed,
    /// The dispatcher dropped its receiver.
    ReceiverGone,
}

/// Event stream client.
#[derive(Debug, Clone)]
pub struct EventSource {
    url: String,
    auth: Option<String>,
    reconnect: bool,
    backoff: ReconnectBackoff,
}

impl EventSource {
    pub fn new(config: &EventsConfig, auth: Option<String>) -> Self {
        Self {
            url: config.url.clone(),
            auth,
            reconnect: config.reconnect,
            backoff: ReconnectBackoff::from_config(config),
        }
    }

    /// Source authenticated with the orchestration credentials.
    pub fn from_config(config: &SyncConfig) -> Self {
        let auth = basic_auth_value(&config.orchestration.user, &config.orchestration.api_key);
        Self::new(&config.events, Some(auth))
    }

    /// Stream signals into `tx` until shutdown, the receiver is dropped, or
    /// the stream ends with reconnects disabled.
    pub async fn run(self, tx: mpsc::Sender<SourceSignal>, mut shutdown: broadcast::Receiver<()>) {
        let mut attempt: u32 = 0;

        loop {
            let mut opened = false;
            let ended = tokio::select! {
                result = self.session(&tx, &mut opened) => result,
                _ = shutdown.recv() => {
                    tracing::info!("Event source received shutdown signal");
                    let _ = tx.send(SourceSignal::Closed).await;
                    return;
                }
            };

            if opened {
                attempt = 0;
            }
            match ended {
                Ok(SessionEnd::ReceiverGone) => {
                    tracing::debug!("Dispatcher gone, stopping event source");
                    return;
                }
                Ok(SessionEnd::Closed) => {}
                Err(e) => {
                    if !opened {
                        metrics::record_source_connection("error");
                    }
                    if tx.send(SourceSignal::Error(e.to_string())).await.is_err() {
                        return;
                    }
                }
            }
            if tx.send(SourceSignal::Closed).await.is_err() || !self.reconnect {
                return;
            }

            attempt = attempt.saturating_add(1);
            let delay = self.backoff.delay(attempt);
            tracing::info!(attempt, delay = ?delay, "Reconnecting to event stream");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                // Closed for the last session was already sent above.
                _ = shutdown.recv() => {
                    tracing::info!("Event source received shutdown signal");
                    return;
                }
            }
        }
    }

    async fn session(
        &self,
        tx: &mpsc::Sender<SourceSignal>,
        opened: &mut bool,
    ) -> Result<SessionEnd, SourceError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| SourceError::Request(e.to_string()))?;
        if let Some(auth) = &self.auth {
            let value = HeaderValue::from_str(auth).map_err(|e| SourceError::Request(e.to_string()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (mut stream, _) = connect_async(request).await.map_err(SourceError::Connect)?;
        *opened = true;
        metrics::record_source_connection("ok");
        tracing::info!(url = %self.url, "Connected to event stream");
        if tx.send(SourceSignal::Opened).await.is_err() {
            return Ok(SessionEnd::ReceiverGone);
        }

        while let Some(frame) = stream.next().await {
            let payload = match frame.map_err(SourceError::Stream)? {
                Message::Text(text) => text.as_str().to_owned(),
                Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => text,
                    Err(_) => {
                        tracing::warn!(len = bytes.len(), "Dropping non-UTF-8 binary frame");
                        continue;
                    }
                },
                Message::Close(frame) => {
                    tracing::info!(frame = ?frame, "Event stream closed by server");
                    return Ok(SessionEnd::Closed);
                }
                _ => continue,
            };
            if tx.send(SourceSignal::Message(payload)).await.is_err() {
                return Ok(SessionEnd::ReceiverGone);
            }
        }

        Ok(SessionEnd::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;

    #[tokio::test]
    async fn test_unreachable_stream_reports_error_then_closed() {
        let config = EventsConfig {
            url: "ws://127.0.0.1:1/events".into(),
            reconnect: false,
            ..EventsConfig::default()
        };
        let source = EventSource::new(&config, None);
        let (tx, mut rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        source.run(tx, shutdown_rx).await;

        assert!(matches!(rx.recv().await, Some(SourceSignal::Error(_))));
        assert_eq!(rx.recv().await, Some(SourceSignal::Closed));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_shutdown_during_backoff_sends_no_extra_closed() {
        let config = EventsConfig {
            url: "ws://127.0.0.1:1/events".into(),
            reconnect: true,
            reconnect_base_delay_ms: 60_000,
            reconnect_max_delay_ms: 60_000,
            ..EventsConfig::default()
        };
        let source = EventSource::new(&config, None);
        let (tx, mut rx) = mpsc::channel(8);
        let shutdown = Shutdown::new();
        let task = tokio::spawn(source.run(tx, shutdown.subscribe()));

        assert!(matches!(rx.recv().await, Some(SourceSignal::Error(_))));
        assert_eq!(rx.recv().await, Some(SourceSignal::Closed));

        // The source is now waiting out the backoff.
        shutdown.trigger();
        tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_invalid_url_is_request_error() {
        let config = EventsConfig {
            url: "not a url".into(),
            reconnect: false,
            ..EventsConfig::default()
        };
        let source = EventSource::new(&config, None);
        let (tx, mut rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        source.run(tx, shutdown_rx).await;

        match rx.recv().await {
            Some(SourceSignal::Error(message)) => {
                assert!(message.starts_with("invalid event stream request"))
            }
            other => panic!("unexpected signal: {other:?}"),
        }
    }
}
