//! System-wide constants and defaults.

/// Environment key holding the engine API version (e.g. `1.41`).
pub const API_VERSION_ENV: &str = "API_VERSION";

/// Environment key holding the Slack incoming-webhook URL.
pub const SLACK_URL_ENV: &str = "SLACK_URL";

/// Environment key holding the Discord (Slack-compatible) webhook URL.
pub const DISCORD_URL_ENV: &str = "DISCORD_URL";

/// Environment key holding the engine endpoint.
pub const DOCKER_HOST_ENV: &str = "DOCKER_HOST";

/// Engine endpoint used when `DOCKER_HOST` is unset.
pub const DEFAULT_DOCKER_HOST: &str = "tcp://127.0.0.1:2375";

/// Trailing window of container output attached to termination notices.
pub const DEFAULT_LOG_WINDOW_SECS: u64 = 30;

/// Delay between reconnect attempts. Zero retries immediately.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 0;

/// Time granted to in-flight notifications once shutdown is requested.
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;

/// Attachment color for started containers.
pub const STARTED_COLOR: &str = "#9ccc65";

/// Attachment color for terminated containers.
pub const TERMINATED_COLOR: &str = "#c62828";

/// Marker wrapped around log excerpts so receivers render them verbatim.
pub const VERBATIM_FENCE: &str = "```";

/// Content type of every webhook POST.
pub const WEBHOOK_CONTENT_TYPE: &str = "application/json";

/// Attribute carrying the container name on lifecycle events.
pub const NAME_ATTRIBUTE: &str = "name";

/// Attribute carrying the exit status on termination events.
pub const EXIT_CODE_ATTRIBUTE: &str = "exitCode";

/// Attribute carrying the image reference on newer engine API versions.
pub const IMAGE_ATTRIBUTE: &str = "image";

/// Application name used in log output and the user agent.
pub const APP_NAME: &str = "dockwatch";
