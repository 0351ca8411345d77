//! HTTP client for the container engine API.

use std::time::Duration;

use dockwatch_common::config::WatchConfig;
use dockwatch_common::constants::APP_NAME;
use dockwatch_common::error::{Result, WatchError};
use dockwatch_common::types::ContainerId;

use crate::events::{EVENT_FILTERS, EventDecoder};
use crate::logs::demux;
use crate::source::{EventSource, LogSource, Subscription, SubscriptionFeed};

/// Number of decoded events buffered ahead of the watch loop.
const EVENT_BUFFER: usize = 64;

/// Talks to one engine endpoint at a fixed API version.
#[derive(Debug, Clone)]
pub struct EngineClient {
    http: reqwest::Client,
    base: String,
}

impl EngineClient {
    /// Creates a client for `engine_url` (an `http(s)://` base URL) using
    /// API version `api_version` in every request path.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Configuration`] if the HTTP client cannot be
    /// built.
    pub fn new(engine_url: &str, api_version: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WatchError::config(format!("cannot build engine client: {e}")))?;
        Ok(Self {
            http,
            base: format!(
                "{}/v{}",
                engine_url.trim_end_matches('/'),
                api_version.trim_start_matches('v')
            ),
        })
    }

    /// Creates a client from the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Configuration`] if the HTTP client cannot be
    /// built.
    pub fn from_config(config: &WatchConfig) -> Result<Self> {
        Self::new(&config.engine_url, &config.api_version)
    }

    /// Returns the versioned base URL requests are made against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }
}

impl EventSource for EngineClient {
    async fn subscribe(&self) -> Result<Subscription> {
        let response = self
            .http
            .get(self.url("/events"))
            .query(&[("filters", EVENT_FILTERS)])
            .send()
            .await
            .map_err(|e| WatchError::subscription(format!("cannot reach engine: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::subscription(format!(
                "engine answered {status} to event subscription"
            )));
        }

        let (feed, subscription) = Subscription::channel(EVENT_BUFFER);
        drop(tokio::spawn(pump_events(response, feed)));
        tracing::debug!(base = %self.base, "event subscription opened");
        Ok(subscription)
    }
}

impl LogSource for EngineClient {
    async fn fetch_logs(&self, id: &ContainerId, since: Duration) -> Result<Vec<u8>> {
        let unavailable = |message: String| WatchError::LogUnavailable {
            container: id.to_string(),
            message,
        };

        let window = i64::try_from(since.as_secs()).unwrap_or(i64::MAX);
        let since = chrono::Utc::now().timestamp().saturating_sub(window);

        let response = self
            .http
            .get(self.url(&format!("/containers/{id}/logs")))
            .query(&[("stdout", "1"), ("stderr", "1")])
            .query(&[("since", since)])
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("engine answered {status}")));
        }

        let raw = response
            .bytes()
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        tracing::debug!(container = %id.short(), bytes = raw.len(), "fetched container logs");
        Ok(demux(&raw))
    }
}

/// Reads the event stream until it ends or the subscription is cancelled.
async fn pump_events(mut response: reqwest::Response, feed: SubscriptionFeed) {
    let mut decoder = EventDecoder::default();
    loop {
        let chunk = tokio::select! {
            biased;

            () = feed.cancelled() => {
                tracing::debug!("event subscription cancelled");
                return;
            }
            chunk = response.chunk() => chunk,
        };

        match chunk {
            Ok(Some(bytes)) => {
                let decoded = match decoder.push(&bytes) {
                    Ok(decoded) => decoded,
                    Err(e) => {
                        feed.fail(e);
                        return;
                    }
                };
                for decoded in decoded {
                    match decoded {
                        Ok(event) => {
                            if !feed.send(event).await {
                                return;
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "skipping undecodable event"),
                    }
                }
            }
            Ok(None) => {
                if decoder.has_pending() {
                    tracing::warn!("event stream ended in the middle of an event");
                }
                feed.fail(WatchError::subscription("engine closed the event stream"));
                return;
            }
            Err(e) => {
                feed.fail(WatchError::subscription(format!("event stream read failed: {e}")));
                return;
            }
        }
    }
}
