//! Immutable runtime configuration.
//!
//! The configuration is assembled once at startup, validated, and then
//! shared read-only with the watch loop and the dispatcher.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    API_VERSION_ENV, DEFAULT_DOCKER_HOST, DEFAULT_LOG_WINDOW_SECS, DEFAULT_RECONNECT_DELAY_MS,
    DEFAULT_SHUTDOWN_GRACE_SECS, DISCORD_URL_ENV, SLACK_URL_ENV,
};
use crate::error::{Result, WatchError};

/// A named webhook endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sink {
    /// Label used in log lines (`slack`, `discord`, ...).
    pub name: String,
    /// Webhook URL. Empty means the slot is unset.
    pub url: String,
}

impl Sink {
    /// Creates a sink slot.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Returns whether this slot holds a URL.
    #[must_use]
    pub fn is_set(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// The set of webhook endpoints notifications are fanned out to.
///
/// Always holds at least one non-empty endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkConfig {
    sinks: Vec<Sink>,
}

impl SinkConfig {
    /// Builds a sink set from named slots.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Configuration`] when every slot is empty.
    pub fn new(sinks: Vec<Sink>) -> Result<Self> {
        if !sinks.iter().any(Sink::is_set) {
            return Err(WatchError::config(format!(
                "{SLACK_URL_ENV} and/or {DISCORD_URL_ENV} must be set"
            )));
        }
        Ok(Self { sinks })
    }

    /// Builds the sink set from the Slack and Discord slots.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Configuration`] when neither URL is set.
    pub fn from_urls(slack: Option<String>, discord: Option<String>) -> Result<Self> {
        Self::new(vec![
            Sink::new("slack", slack.unwrap_or_default()),
            Sink::new("discord", discord.unwrap_or_default()),
        ])
    }

    /// Iterates over the endpoints that hold a URL.
    pub fn active(&self) -> impl Iterator<Item = &Sink> {
        self.sinks.iter().filter(|s| s.is_set())
    }

    /// Number of endpoints that hold a URL.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active().count()
    }
}

/// Root configuration of the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Engine API version selected in request paths, without the `v`.
    pub api_version: String,
    /// Base URL of the engine HTTP API.
    pub engine_url: String,
    /// Where notifications go.
    pub sinks: SinkConfig,
    /// How much trailing output to attach to termination notices.
    pub log_window: Duration,
    /// Pause between reconnect attempts.
    pub reconnect_delay: Duration,
    /// How long shutdown waits for in-flight notifications.
    pub shutdown_grace: Duration,
}

impl WatchConfig {
    /// Validates raw settings into a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Configuration`] if the API version is empty,
    /// the engine endpoint cannot be used, or no sink is set.
    pub fn new(api_version: &str, docker_host: Option<&str>, sinks: SinkConfig) -> Result<Self> {
        let api_version = normalize_api_version(api_version)?;
        let engine_url = engine_base_url(docker_host.unwrap_or(DEFAULT_DOCKER_HOST))?;
        Ok(Self {
            api_version,
            engine_url,
            sinks,
            log_window: Duration::from_secs(DEFAULT_LOG_WINDOW_SECS),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
        })
    }

    /// Overrides the log window.
    #[must_use]
    pub const fn with_log_window(mut self, window: Duration) -> Self {
        self.log_window = window;
        self
    }

    /// Overrides the reconnect delay.
    #[must_use]
    pub const fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Overrides the shutdown grace period.
    #[must_use]
    pub const fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

/// Strips an optional leading `v` and rejects empty versions.
fn normalize_api_version(raw: &str) -> Result<String> {
    let version = raw.trim().trim_start_matches('v');
    if version.is_empty() {
        return Err(WatchError::config(format!(
            "{API_VERSION_ENV} must be set as your engine API version"
        )));
    }
    Ok(version.to_owned())
}

/// Converts a `DOCKER_HOST` value into an HTTP base URL.
///
/// # Errors
///
/// Returns [`WatchError::Configuration`] for unix sockets and unknown schemes.
pub fn engine_base_url(host: &str) -> Result<String> {
    let host = host.trim().trim_end_matches('/');
    if let Some(rest) = host.strip_prefix("tcp://") {
        return Ok(format!("http://{rest}"));
    }
    if host.starts_with("http://") || host.starts_with("https://") {
        return Ok(host.to_owned());
    }
    if host.starts_with("unix://") || host.starts_with("npipe://") {
        return Err(WatchError::config(format!(
            "unsupported engine endpoint {host}: expose the engine API over tcp"
        )));
    }
    Err(WatchError::config(format!("unrecognized engine endpoint: {host}")))
}
