//! # dockwatch-notify
//!
//! The notification pipeline, leaf-first:
//!
//! - [`payload`]: webhook message model and its JSON wire form.
//! - [`classify`]: turns lifecycle events into payloads.
//! - [`fetcher`]: retrieves the trailing output of terminated containers.
//! - [`dispatch`]: fans a payload out to every configured sink.
//! - [`transport`]: the HTTP POST seam used by the dispatcher.
//! - [`watch`]: the reconnecting subscription loop tying it together.

pub mod classify;
pub mod dispatch;
pub mod fetcher;
pub mod payload;
pub mod transport;
pub mod watch;
