//! Event and log source abstractions.
//!
//! A [`Subscription`] is the consumer half of a live event stream: a
//! bounded channel of [`LifecycleEvent`]s plus a one-shot channel that
//! carries the error which ended the stream. The producer half, a
//! [`SubscriptionFeed`], is driven by whatever task reads from the engine.
//! Both halves share a cancellation token; cancelling or dropping the
//! subscription tells the producer to stop reading.

use std::future::Future;
use std::time::Duration;

use dockwatch_common::error::{Result, WatchError};
use dockwatch_common::types::{ContainerId, LifecycleEvent};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Opens lifecycle event subscriptions.
pub trait EventSource: Send + Sync {
    /// Opens a new subscription.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Subscription`] if the stream cannot be opened.
    fn subscribe(&self) -> impl Future<Output = Result<Subscription>> + Send;
}

/// Retrieves recent container output.
pub trait LogSource: Send + Sync {
    /// Returns stdout and stderr of `id`, interleaved, produced within the
    /// trailing `since` window.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::LogUnavailable`] if the output cannot be read.
    fn fetch_logs(
        &self,
        id: &ContainerId,
        since: Duration,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// What a subscription yielded next.
#[derive(Debug)]
pub enum SubscriptionItem {
    /// A lifecycle event.
    Event(LifecycleEvent),
    /// The stream ended. No further events will arrive.
    Closed(WatchError),
}

/// Consumer half of an event stream.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::Receiver<LifecycleEvent>,
    errors: oneshot::Receiver<WatchError>,
    errors_done: bool,
    cancel: CancellationToken,
}

impl Subscription {
    /// Creates a connected feed/subscription pair with room for
    /// `capacity` undelivered events.
    #[must_use]
    pub fn channel(capacity: usize) -> (SubscriptionFeed, Self) {
        let (event_tx, event_rx) = mpsc::channel(capacity.max(1));
        let (error_tx, error_rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let feed = SubscriptionFeed {
            events: event_tx,
            errors: Some(error_tx),
            cancel: cancel.clone(),
        };
        let subscription = Self {
            events: event_rx,
            errors: error_rx,
            errors_done: false,
            cancel,
        };
        (feed, subscription)
    }

    /// Waits for the next event or for the end of the stream.
    ///
    /// Events already buffered are handed out before a pending error.
    pub async fn next(&mut self) -> SubscriptionItem {
        tokio::select! {
            biased;

            event = self.events.recv() => match event {
                Some(event) => SubscriptionItem::Event(event),
                None => SubscriptionItem::Closed(self.take_error()),
            },
            result = &mut self.errors, if !self.errors_done => {
                self.errors_done = true;
                SubscriptionItem::Closed(
                    result.unwrap_or_else(|_| WatchError::subscription("event stream closed")),
                )
            }
        }
    }

    /// Tells the producer to stop reading from the engine.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    fn take_error(&mut self) -> WatchError {
        if self.errors_done {
            return WatchError::subscription("event stream closed");
        }
        self.errors_done = true;
        self.errors
            .try_recv()
            .unwrap_or_else(|_| WatchError::subscription("event stream closed"))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Producer half of an event stream.
#[derive(Debug)]
pub struct SubscriptionFeed {
    events: mpsc::Sender<LifecycleEvent>,
    errors: Option<oneshot::Sender<WatchError>>,
    cancel: CancellationToken,
}

impl SubscriptionFeed {
    /// Pushes an event to the consumer.
    ///
    /// Returns `false` once the subscription is gone or cancelled, at which
    /// point the producer should stop.
    pub async fn send(&self, event: LifecycleEvent) -> bool {
        tokio::select! {
            biased;

            () = self.cancel.cancelled() => false,
            sent = self.events.send(event) => sent.is_ok(),
        }
    }

    /// Ends the stream with `error`.
    pub fn fail(mut self, error: WatchError) {
        if let Some(tx) = self.errors.take() {
            let _ = tx.send(error);
        }
    }

    /// Resolves when the consumer cancels or drops the subscription.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Returns whether the consumer cancelled or dropped the subscription.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
