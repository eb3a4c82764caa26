//! Structured logging.
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level when set
//! - JSON output for log shipping, pretty output otherwise
//! - The daemon logs to stdout; tools that print results log to stderr

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Unknown names fall back to pretty.
    pub fn parse(name: &str) -> Self {
        if name.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Filter from `RUST_LOG`, falling back to `default_level`.
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Subscriber for `config` writing every line to `writer`.
pub fn subscriber<W>(config: &ObservabilityConfig, writer: W) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry().with(env_filter(&config.log_level));
    match LogFormat::parse(&config.log_format) {
        LogFormat::Json => Box::new(
            registry.with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(writer),
            ),
        ),
        LogFormat::Pretty => Box::new(
            registry.with(fmt::layer().with_target(false).with_writer(writer)),
        ),
    }
}

/// Install the global subscriber on stdout. Fails if one is already installed.
pub fn init(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    init_with_writer(config, std::io::stdout)
}

/// Install the global subscriber on `writer`.
pub fn init_with_writer<W>(config: &ObservabilityConfig, writer: W) -> Result<(), TryInitError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    subscriber(config, writer).try_init()
}

/// In-memory log sink for asserting on emitted lines.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl CapturedLogs {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Scoped subscriber at `level` writing into this sink.
    pub(crate) fn install(&self, level: &str) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::registry()
            .with(EnvFilter::new(level))
            .with(fmt::layer().with_ansi(false).with_writer(self.clone()));
        tracing::subscriber::set_default(subscriber)
    }
}

#[cfg(test)]
impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("xml"), LogFormat::Pretty);
    }

    #[test]
    fn test_subscriber_writes_to_given_writer() {
        let logs = CapturedLogs::default();
        let config = ObservabilityConfig {
            log_level: "warn".into(),
            log_format: "json".into(),
            ..ObservabilityConfig::default()
        };

        tracing::subscriber::with_default(subscriber(&config, logs.clone()), || {
            tracing::warn!(key = "/vulcand/listeners/http", "Store unreachable");
        });

        let out = logs.contents();
        assert!(out.contains("\"level\":\"WARN\""), "got: {out}");
        assert!(out.contains("Store unreachable"));
    }
}
