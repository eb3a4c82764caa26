//! OS signal handling.
//!
//! SIGINT and SIGTERM both request a graceful stop. There is no reload
//! signal; configuration is read once at startup.

use crate::lifecycle::shutdown::Shutdown;

/// Resolve on the first SIGINT or SIGTERM.
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
            _ = term.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.map(|_| "SIGINT")
    }
}

/// Trigger `shutdown` when a stop signal arrives.
pub async fn shutdown_on_signal(shutdown: Shutdown) {
    match wait_for_signal().await {
        Ok(name) => tracing::info!(signal = name, "Received stop signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for signals, shutting down"),
    }
    shutdown.trigger();
}
