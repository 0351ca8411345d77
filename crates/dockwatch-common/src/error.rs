//! Unified error types for the dockwatch workspace.
//!
//! Every variant except [`WatchError::Configuration`] is recoverable: the
//! component that produces it logs it and carries on. Only configuration
//! errors at startup terminate the process.

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The event subscription could not be opened, errored, or closed.
    #[error("event subscription failed: {message}")]
    Subscription {
        /// Description of the failure.
        message: String,
    },

    /// A lifecycle event lacks an attribute required to describe it.
    #[error("event for container {container} is missing attribute `{attribute}`")]
    MissingAttribute {
        /// Name of the absent attribute.
        attribute: &'static str,
        /// Identifier of the container the event refers to.
        container: String,
    },

    /// Recent output of a container could not be retrieved.
    #[error("logs unavailable for container {container}: {message}")]
    LogUnavailable {
        /// Identifier of the container.
        container: String,
        /// Description of the failure.
        message: String,
    },

    /// A payload could not be delivered to one sink.
    #[error("delivery to {sink} failed: {message}")]
    Delivery {
        /// Name of the sink.
        sink: String,
        /// Description of the failure.
        message: String,
    },

    /// A configuration value is missing or invalid.
    #[error("invalid configuration: {message}")]
    Configuration {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl WatchError {
    /// Shorthand for a [`WatchError::Configuration`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Shorthand for a [`WatchError::Subscription`].
    pub fn subscription(message: impl Into<String>) -> Self {
        Self::Subscription {
            message: message.into(),
        }
    }

    /// Returns whether this error must abort the process.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, WatchError>;
