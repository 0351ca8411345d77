//! Decoding of the engine's lifecycle event stream.
//!
//! The engine answers `GET /events` with newline-delimited JSON objects,
//! split across HTTP chunks at arbitrary byte boundaries.

use std::collections::HashMap;

use dockwatch_common::constants::IMAGE_ATTRIBUTE;
use dockwatch_common::error::{Result, WatchError};
use dockwatch_common::types::{ContainerId, LifecycleEvent, LifecycleStatus};
use serde::Deserialize;

/// Server-side filter restricting the stream to container start/die events.
pub const EVENT_FILTERS: &str = r#"{"type":["container"],"event":["start","die"]}"#;

/// Event object as the engine serializes it.
///
/// Older API versions fill `status`, `id` and `from`; newer ones only
/// `Action` and `Actor`.
#[derive(Debug, Default, Deserialize)]
struct WireEvent {
    #[serde(default)]
    status: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    from: String,
    #[serde(rename = "Type", default)]
    kind: String,
    #[serde(rename = "Action", default)]
    action: String,
    #[serde(rename = "Actor", default)]
    actor: WireActor,
    #[serde(default)]
    time: i64,
}

#[derive(Debug, Default, Deserialize)]
struct WireActor {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(rename = "Attributes", default)]
    attributes: HashMap<String, String>,
}

impl From<WireEvent> for LifecycleEvent {
    fn from(wire: WireEvent) -> Self {
        let tag = if wire.status.is_empty() {
            wire.action.as_str()
        } else {
            wire.status.as_str()
        };
        let status = if wire.kind.is_empty() || wire.kind == "container" {
            LifecycleStatus::from_tag(tag)
        } else {
            LifecycleStatus::Other(format!("{}:{tag}", wire.kind))
        };
        let from = if wire.from.is_empty() {
            wire.actor
                .attributes
                .get(IMAGE_ATTRIBUTE)
                .cloned()
                .unwrap_or_default()
        } else {
            wire.from
        };
        let id = if wire.id.is_empty() {
            wire.actor.id
        } else {
            wire.id
        };
        Self {
            status,
            from,
            time: wire.time,
            actor_id: ContainerId::new(id),
            attributes: wire.actor.attributes,
        }
    }
}

/// Parses one JSON event object.
///
/// # Errors
///
/// Returns an error if `line` is not a JSON object.
pub fn parse_event(line: &[u8]) -> std::result::Result<LifecycleEvent, serde_json::Error> {
    serde_json::from_slice::<WireEvent>(line).map(LifecycleEvent::from)
}

/// Longest event line accepted before the stream is considered broken.
pub const MAX_EVENT_LINE: usize = 1024 * 1024;

/// Reassembles newline-delimited events from arbitrary chunks.
#[derive(Debug)]
pub struct EventDecoder {
    pending: Vec<u8>,
    max_line: usize,
}

impl Default for EventDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_EVENT_LINE)
    }
}

impl EventDecoder {
    /// Creates a decoder that gives up on lines longer than `max_line` bytes.
    #[must_use]
    pub const fn with_max_line(max_line: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line,
        }
    }

    /// Feeds a chunk and returns every event it completed, in order.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Subscription`] once an unterminated line
    /// exceeds the limit; the partial line is discarded.
    pub fn push(
        &mut self,
        chunk: &[u8],
    ) -> Result<Vec<std::result::Result<LifecycleEvent, serde_json::Error>>> {
        self.pending.extend_from_slice(chunk);
        let mut decoded = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = line.trim_ascii();
            if !line.is_empty() {
                decoded.push(parse_event(line));
            }
        }
        if self.pending.len() > self.max_line {
            let length = self.pending.len();
            self.pending = Vec::new();
            return Err(WatchError::subscription(format!(
                "event line exceeds {} bytes ({length} buffered without a newline)",
                self.max_line
            )));
        }
        Ok(decoded)
    }

    /// Returns whether a partial line is waiting for more data.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.trim_ascii().is_empty()
    }
}
