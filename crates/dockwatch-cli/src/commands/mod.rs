//! CLI command definitions and dispatch.

pub mod ping;
pub mod watch;

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use dockwatch_common::config::{SinkConfig, WatchConfig};
use dockwatch_common::constants::{
    API_VERSION_ENV, DEFAULT_LOG_WINDOW_SECS, DEFAULT_RECONNECT_DELAY_MS,
    DEFAULT_SHUTDOWN_GRACE_SECS, DISCORD_URL_ENV, DOCKER_HOST_ENV, SLACK_URL_ENV,
};
use dockwatch_common::error::{Result, WatchError};

/// dockwatch — container lifecycle notifications for chat webhooks.
#[derive(Parser, Debug)]
#[command(name = "dockwatch", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute. Defaults to `watch`.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Engine and sink settings.
    #[command(flatten)]
    pub settings: Settings,

    /// Log line format.
    #[arg(long, env = "DOCKWATCH_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Watch engine events and send notifications until interrupted.
    Watch,
    /// Send one test notification to every configured sink.
    Ping(ping::PingArgs),
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Settings shared by every subcommand, each with an environment fallback.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Engine API version used in request paths (e.g. 1.41).
    #[arg(long, env = API_VERSION_ENV, global = true)]
    pub api_version: Option<String>,

    /// Slack incoming-webhook URL.
    #[arg(long, env = SLACK_URL_ENV, hide_env_values = true, global = true)]
    pub slack_url: Option<String>,

    /// Discord webhook URL (Slack-compatible endpoint).
    #[arg(long, env = DISCORD_URL_ENV, hide_env_values = true, global = true)]
    pub discord_url: Option<String>,

    /// Engine endpoint (`tcp://host:port` or an http(s) URL).
    #[arg(long, env = DOCKER_HOST_ENV, global = true)]
    pub docker_host: Option<String>,

    /// Seconds of trailing output attached to termination notices.
    #[arg(long, env = "LOG_WINDOW_SECS", default_value_t = DEFAULT_LOG_WINDOW_SECS, global = true)]
    pub log_window_secs: u64,

    /// Milliseconds to wait between reconnect attempts.
    #[arg(long, env = "RECONNECT_DELAY_MS", default_value_t = DEFAULT_RECONNECT_DELAY_MS, global = true)]
    pub reconnect_delay_ms: u64,

    /// Seconds shutdown waits for in-flight notifications.
    #[arg(long, env = "SHUTDOWN_GRACE_SECS", default_value_t = DEFAULT_SHUTDOWN_GRACE_SECS, global = true)]
    pub shutdown_grace_secs: u64,
}

impl Settings {
    /// Validates the sink slots.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Configuration`] when no sink URL is set.
    pub fn sinks(&self) -> Result<SinkConfig> {
        SinkConfig::from_urls(self.slack_url.clone(), self.discord_url.clone())
    }

    /// Validates every setting into the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Configuration`] when the API version or every
    /// sink URL is missing, or the engine endpoint is unusable.
    pub fn watch_config(&self) -> Result<WatchConfig> {
        let api_version = self.api_version.as_deref().ok_or_else(|| {
            WatchError::config(format!(
                "{API_VERSION_ENV} must be set as your engine API version"
            ))
        })?;
        let config = WatchConfig::new(api_version, self.docker_host.as_deref(), self.sinks()?)?
            .with_log_window(Duration::from_secs(self.log_window_secs))
            .with_reconnect_delay(Duration::from_millis(self.reconnect_delay_ms))
            .with_shutdown_grace(Duration::from_secs(self.shutdown_grace_secs));
        Ok(config)
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the command fails.
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => watch::execute(&cli.settings).await,
        Command::Ping(args) => ping::execute(args, &cli.settings).await,
    }
}
