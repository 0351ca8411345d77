//! Domain primitive types used across the dockwatch workspace.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{EXIT_CODE_ATTRIBUTE, NAME_ATTRIBUTE};
use crate::error::{Result, WatchError};

/// Engine-assigned identifier of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the conventional 12-character short form.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle transition reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LifecycleStatus {
    /// The container process started.
    Started,
    /// The container process exited.
    Terminated,
    /// Any transition this system does not notify about.
    Other(String),
}

impl LifecycleStatus {
    /// Maps an engine status tag onto a lifecycle status.
    ///
    /// The engine reports `start` and `die`; the longer spellings are
    /// accepted as well.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "start" | "started" => Self::Started,
            "die" | "terminated" => Self::Terminated,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::Terminated => write!(f, "terminated"),
            Self::Other(tag) => write!(f, "{tag}"),
        }
    }
}

/// A single container lifecycle event read from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    /// What happened.
    pub status: LifecycleStatus,
    /// Image the container was created from.
    pub from: String,
    /// Unix timestamp (seconds) at which the engine observed the event.
    pub time: i64,
    /// Container the event refers to.
    pub actor_id: ContainerId,
    /// Free-form attributes attached by the engine.
    pub attributes: HashMap<String, String>,
}

impl LifecycleEvent {
    /// Returns an attribute value, if present.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Returns an attribute value or a [`WatchError::MissingAttribute`].
    ///
    /// # Errors
    ///
    /// Returns an error if the attribute is absent.
    pub fn require(&self, key: &'static str) -> Result<&str> {
        self.attribute(key)
            .ok_or_else(|| WatchError::MissingAttribute {
                attribute: key,
                container: self.actor_id.to_string(),
            })
    }

    /// Returns the human-readable container name.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine did not attach a name.
    pub fn name(&self) -> Result<&str> {
        self.require(NAME_ATTRIBUTE)
    }

    /// Returns the exit status of a terminated container.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine did not attach an exit code.
    pub fn exit_code(&self) -> Result<&str> {
        self.require(EXIT_CODE_ATTRIBUTE)
    }
}
