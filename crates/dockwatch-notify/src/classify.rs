//! Lifecycle event classification.
//!
//! Started and terminated containers become one-attachment payloads; every
//! other transition is ignored. Required attributes are checked before any
//! log retrieval so a malformed event never costs an engine round trip.

use dockwatch_common::error::Result;
use dockwatch_common::types::{LifecycleEvent, LifecycleStatus};
use dockwatch_engine::LogSource;

use crate::fetcher::LogFetcher;
use crate::payload::{Attachment, NotificationPayload, Severity};

/// Builds the title of a start notification.
#[must_use]
pub fn started_title(name: &str, image: &str) -> String {
    format!("Container started. name => {name} image => {image}")
}

/// Builds the title of a termination notification.
#[must_use]
pub fn terminated_title(name: &str, image: &str, exit_code: &str) -> String {
    format!("Container died. name => {name} image => {image} status code => {exit_code}")
}

/// Turns a start event into a payload.
///
/// # Errors
///
/// Returns [`WatchError::MissingAttribute`](dockwatch_common::error::WatchError::MissingAttribute)
/// if the event carries no `name`.
pub fn started_payload(event: &LifecycleEvent) -> Result<NotificationPayload> {
    let name = event.name()?;
    Ok(NotificationPayload::single(Attachment::new(
        started_title(name, &event.from),
        Severity::Success,
        event.time,
    )))
}

/// Classifies events and builds their notifications.
#[derive(Debug)]
pub struct Classifier<L> {
    logs: LogFetcher<L>,
}

impl<L> Clone for Classifier<L> {
    fn clone(&self) -> Self {
        Self {
            logs: self.logs.clone(),
        }
    }
}

impl<L: LogSource> Classifier<L> {
    /// Creates a classifier that enriches terminations through `logs`.
    pub const fn new(logs: LogFetcher<L>) -> Self {
        Self { logs }
    }

    /// Builds the notification for `event`, if it warrants one.
    ///
    /// Returns `Ok(None)` for transitions other than start and terminate.
    /// A termination whose logs cannot be fetched still yields a payload,
    /// with empty body text.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::MissingAttribute`](dockwatch_common::error::WatchError::MissingAttribute)
    /// if a required attribute is absent.
    pub async fn classify(&self, event: &LifecycleEvent) -> Result<Option<NotificationPayload>> {
        match &event.status {
            LifecycleStatus::Started => started_payload(event).map(Some),
            LifecycleStatus::Terminated => self.terminated_payload(event).await.map(Some),
            LifecycleStatus::Other(tag) => {
                tracing::trace!(status = %tag, container = %event.actor_id.short(), "ignoring event");
                Ok(None)
            }
        }
    }

    async fn terminated_payload(&self, event: &LifecycleEvent) -> Result<NotificationPayload> {
        let name = event.name()?;
        let exit_code = event.exit_code()?;
        let attachment = Attachment::new(
            terminated_title(name, &event.from, exit_code),
            Severity::Failure,
            event.time,
        );

        let attachment = match self.logs.fetch(&event.actor_id).await {
            Ok(raw) => attachment.with_excerpt(&raw),
            Err(e) => {
                tracing::warn!(
                    container = %event.actor_id.short(),
                    name,
                    error = %e,
                    "sending termination notice without logs"
                );
                attachment
            }
        };
        Ok(NotificationPayload::single(attachment))
    }
}
