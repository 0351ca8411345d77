//! # dockwatch-engine
//!
//! Client side of the container engine API as dockwatch needs it:
//!
//! - [`EventSource`](source::EventSource): opens a lifecycle event
//!   [`Subscription`](source::Subscription), a pair of channels carrying
//!   events and the terminal error of the stream.
//! - [`LogSource`](source::LogSource): retrieves recent container output.
//! - [`EngineClient`](client::EngineClient): the HTTP implementation of both.

pub mod client;
pub mod events;
pub mod logs;
pub mod source;

pub use client::EngineClient;
pub use source::{EventSource, LogSource, Subscription, SubscriptionFeed, SubscriptionItem};
