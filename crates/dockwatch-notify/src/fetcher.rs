//! Trailing-output retrieval for terminated containers.

use std::sync::Arc;
use std::time::Duration;

use dockwatch_common::constants::DEFAULT_LOG_WINDOW_SECS;
use dockwatch_common::error::{Result, WatchError};
use dockwatch_common::types::ContainerId;
use dockwatch_engine::LogSource;

/// Fetches the output a container produced within a fixed trailing window.
///
/// No timeout is applied beyond the one the underlying engine client uses
/// for its own requests.
#[derive(Debug)]
pub struct LogFetcher<L> {
    source: Arc<L>,
    window: Duration,
}

impl<L> Clone for LogFetcher<L> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            window: self.window,
        }
    }
}

impl<L: LogSource> LogFetcher<L> {
    /// Creates a fetcher with the default 30-second window.
    pub const fn new(source: Arc<L>) -> Self {
        Self {
            source,
            window: Duration::from_secs(DEFAULT_LOG_WINDOW_SECS),
        }
    }

    /// Overrides the trailing window.
    #[must_use]
    pub const fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Returns the recent stdout and stderr of `id`, interleaved.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::LogUnavailable`] if the source cannot produce
    /// or finish reading the output.
    pub async fn fetch(&self, id: &ContainerId) -> Result<Vec<u8>> {
        self.source
            .fetch_logs(id, self.window)
            .await
            .map_err(|e| match e {
                unavailable @ WatchError::LogUnavailable { .. } => unavailable,
                other => WatchError::LogUnavailable {
                    container: id.to_string(),
                    message: other.to_string(),
                },
            })
    }
}
