//! `dockwatch watch` — Run the notification daemon.

use std::sync::Arc;

use dockwatch_engine::EngineClient;
use dockwatch_notify::transport::HttpTransport;
use dockwatch_notify::watch::Watcher;
use tokio_util::sync::CancellationToken;

use super::Settings;
use crate::output::redact_url;

/// Executes the `watch` command.
///
/// Runs until SIGINT or SIGTERM, then waits for in-flight notifications
/// for at most the configured grace period.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or an HTTP client
/// cannot be built.
pub async fn execute(settings: &Settings) -> anyhow::Result<()> {
    let config = settings.watch_config()?;
    let sinks: Vec<_> = config
        .sinks
        .active()
        .map(|s| format!("{}={}", s.name, redact_url(&s.url)))
        .collect();
    tracing::info!(
        engine = %config.engine_url,
        api_version = %config.api_version,
        sinks = %sinks.join(","),
        log_window_secs = config.log_window.as_secs(),
        shutdown_grace_secs = config.shutdown_grace.as_secs(),
        "starting dockwatch"
    );

    let engine = Arc::new(EngineClient::from_config(&config)?);
    let transport = Arc::new(HttpTransport::new()?);
    let mut watcher = Watcher::new(engine, transport, &config);

    let shutdown = CancellationToken::new();
    let signals = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_signal().await;
            tracing::info!("termination signal received");
            shutdown.cancel();
        }
    });

    watcher.run(shutdown).await;
    signals.abort();
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn wait_for_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                let _ = stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {}
        () = terminate => {}
    }
}
