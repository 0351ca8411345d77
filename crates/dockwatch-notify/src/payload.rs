//! Webhook message model.
//!
//! The wire form is the Slack incoming-webhook attachment layout, which
//! Discord also accepts on its Slack-compatible endpoint. Every field is
//! always present so receivers never see a partial object.

use std::sync::Arc;

use dockwatch_common::constants::{STARTED_COLOR, TERMINATED_COLOR, VERBATIM_FENCE};
use dockwatch_common::error::Result;
use serde::Serialize;

/// Visual severity of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// A container came up.
    Success,
    /// A container went down.
    Failure,
}

impl Severity {
    /// Hex color receivers render the attachment bar with.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Success => STARTED_COLOR,
            Self::Failure => TERMINATED_COLOR,
        }
    }
}

/// One styled block of a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Summary line.
    pub title: String,
    /// Color tag.
    pub severity: Severity,
    /// Unix timestamp copied from the source event.
    pub ts: i64,
    /// Optional body, already fenced when it holds log output.
    pub text: Option<String>,
}

impl Attachment {
    /// Creates an attachment without body text.
    #[must_use]
    pub fn new(title: impl Into<String>, severity: Severity, ts: i64) -> Self {
        Self {
            title: title.into(),
            severity,
            ts,
            text: None,
        }
    }

    /// Sets the body to `raw` wrapped in the verbatim fence.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    #[must_use]
    pub fn with_excerpt(mut self, raw: &[u8]) -> Self {
        self.text = Some(fence(&String::from_utf8_lossy(raw)));
        self
    }
}

/// Wraps `body` in the marker receivers render verbatim.
#[must_use]
pub fn fence(body: &str) -> String {
    format!("{VERBATIM_FENCE}{body}{VERBATIM_FENCE}")
}

/// A complete webhook message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    /// Top-level message text. Empty for every message this system sends.
    pub text: String,
    /// Ordered attachments.
    pub attachments: Vec<Attachment>,
}

impl NotificationPayload {
    /// Creates a payload holding exactly one attachment.
    #[must_use]
    pub fn single(attachment: Attachment) -> Self {
        Self {
            text: String::new(),
            attachments: vec![attachment],
        }
    }

    /// Serializes the payload into its wire form.
    ///
    /// Identical payloads always serialize to identical bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Serialization`](dockwatch_common::error::WatchError::Serialization)
    /// if encoding fails.
    pub fn to_wire(&self) -> Result<Arc<[u8]>> {
        let message = WireMessage {
            text: &self.text,
            attachments: self.attachments.iter().map(WireAttachment::from).collect(),
        };
        Ok(serde_json::to_vec(&message)?.into())
    }
}

/// Key/value row inside an attachment. Never populated by this system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    /// Row label.
    pub title: String,
    /// Row value.
    pub value: String,
    /// Whether receivers may place the row side by side with others.
    pub short: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    text: &'a str,
    attachments: Vec<WireAttachment<'a>>,
}

#[derive(Serialize)]
struct WireAttachment<'a> {
    fallback: &'a str,
    pretext: &'a str,
    color: &'a str,
    title: &'a str,
    title_link: &'a str,
    text: &'a str,
    author_name: &'a str,
    author_link: &'a str,
    author_icon: &'a str,
    footer: &'a str,
    footer_icon: &'a str,
    ts: i64,
    fields: &'a [Field],
}

impl<'a> From<&'a Attachment> for WireAttachment<'a> {
    fn from(a: &'a Attachment) -> Self {
        Self {
            fallback: "",
            pretext: "",
            color: a.severity.color(),
            title: &a.title,
            title_link: "",
            text: a.text.as_deref().unwrap_or_default(),
            author_name: "",
            author_link: "",
            author_icon: "",
            footer: "",
            footer_icon: "",
            ts: a.ts,
            fields: &[],
        }
    }
}
