//! The reconnecting watch loop.
//!
//! ```text
//!   Connecting ──ok──▶ Streaming ──error/closed──▶ Draining ──▶ Connecting
//!       ▲  │
//!       └──┘ subscribe failed
//! ```
//!
//! The loop is the only consumer of the subscription. Each event is
//! classified in order; the resulting payload is handed to the delivery
//! group and the loop goes straight back to the stream. A termination
//! notice waits for its log fetch, a start notice does not.
//!
//! Without a shutdown signal the loop never returns. Once signalled, it
//! gives in-flight deliveries a bounded grace period and aborts the rest.
//! Reconnect attempts are unbounded; the configured delay (zero by
//! default) is the only pacing.

use std::sync::Arc;
use std::time::Duration;

use dockwatch_common::config::WatchConfig;
use dockwatch_common::types::LifecycleEvent;
use dockwatch_engine::{EventSource, LogSource, Subscription, SubscriptionItem};
use tokio_util::sync::CancellationToken;

use crate::classify::Classifier;
use crate::dispatch::{DeliveryGroup, Dispatcher};
use crate::fetcher::LogFetcher;
use crate::transport::WebhookTransport;

/// Counters describing what the loop has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    /// Subscriptions successfully opened.
    pub sessions: u64,
    /// Events read from the engine.
    pub events: u64,
    /// Payloads handed to the delivery group.
    pub notifications: u64,
    /// Events dropped because they could not be described.
    pub dropped: u64,
}

enum State {
    Connecting,
    Streaming(Subscription),
    Draining(Subscription),
    Stopped,
}

/// Watches engine events and turns them into webhook notifications.
pub struct Watcher<S, T> {
    source: Arc<S>,
    classifier: Classifier<S>,
    dispatcher: Dispatcher<T>,
    deliveries: DeliveryGroup,
    reconnect_delay: Duration,
    shutdown_grace: Duration,
    stats: WatchStats,
}

impl<S, T> Watcher<S, T>
where
    S: EventSource + LogSource,
    T: WebhookTransport,
{
    /// Wires a watcher from an engine source, a webhook transport and the
    /// startup configuration.
    pub fn new(source: Arc<S>, transport: Arc<T>, config: &WatchConfig) -> Self {
        let fetcher = LogFetcher::new(Arc::clone(&source)).with_window(config.log_window);
        Self {
            source,
            classifier: Classifier::new(fetcher),
            dispatcher: Dispatcher::new(transport, Arc::new(config.sinks.clone())),
            deliveries: DeliveryGroup::new(),
            reconnect_delay: config.reconnect_delay,
            shutdown_grace: config.shutdown_grace,
            stats: WatchStats::default(),
        }
    }

    /// Returns the counters accumulated so far.
    #[must_use]
    pub const fn stats(&self) -> WatchStats {
        self.stats
    }

    /// Number of fan-outs still running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.deliveries.in_flight()
    }

    /// Runs until `shutdown` is cancelled, then waits for in-flight
    /// deliveries for at most the configured grace period.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        let mut state = State::Connecting;
        loop {
            state = match state {
                State::Connecting => self.connect(&shutdown).await,
                State::Streaming(subscription) => self.stream(subscription, &shutdown).await,
                State::Draining(subscription) => {
                    subscription.cancel();
                    drop(subscription);
                    let _ = self.deliveries.reap();
                    if shutdown.is_cancelled() {
                        State::Stopped
                    } else {
                        State::Connecting
                    }
                }
                State::Stopped => break,
            };
        }

        let pending = self.deliveries.in_flight();
        if pending > 0 {
            tracing::info!(
                pending,
                grace_ms = self.shutdown_grace.as_millis(),
                "waiting for in-flight notifications"
            );
        }
        let abandoned = self.deliveries.drain_within(self.shutdown_grace).await;
        if abandoned > 0 {
            tracing::warn!(abandoned, "abandoned notifications still in flight at shutdown");
        }
        tracing::info!(
            sessions = self.stats.sessions,
            events = self.stats.events,
            notifications = self.stats.notifications,
            dropped = self.stats.dropped,
            "watcher stopped"
        );
    }

    async fn connect(&mut self, shutdown: &CancellationToken) -> State {
        let opened = tokio::select! {
            biased;

            () = shutdown.cancelled() => return State::Stopped,
            opened = self.source.subscribe() => opened,
        };

        match opened {
            Ok(subscription) => {
                self.stats.sessions += 1;
                tracing::info!(session = self.stats.sessions, "watching container events");
                State::Streaming(subscription)
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot subscribe to engine events, retrying");
                if self.reconnect_delay.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::select! {
                        () = shutdown.cancelled() => return State::Stopped,
                        () = tokio::time::sleep(self.reconnect_delay) => {}
                    }
                }
                State::Connecting
            }
        }
    }

    async fn stream(&mut self, mut subscription: Subscription, shutdown: &CancellationToken) -> State {
        loop {
            let item = tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    tracing::info!("shutdown requested, closing event subscription");
                    return State::Draining(subscription);
                }
                item = subscription.next() => item,
            };

            match item {
                SubscriptionItem::Event(event) => self.handle(&event).await,
                SubscriptionItem::Closed(e) => {
                    tracing::warn!(error = %e, "event stream ended, reconnecting");
                    return State::Draining(subscription);
                }
            }
        }
    }

    async fn handle(&mut self, event: &LifecycleEvent) {
        self.stats.events += 1;
        match self.classifier.classify(event).await {
            Ok(Some(payload)) => {
                self.stats.notifications += 1;
                tracing::info!(
                    status = %event.status,
                    container = %event.actor_id.short(),
                    image = %event.from,
                    "sending notification"
                );
                self.deliveries.submit(&self.dispatcher, payload);
            }
            Ok(None) => {}
            Err(e) => {
                self.stats.dropped += 1;
                tracing::warn!(error = %e, status = %event.status, "dropping event");
            }
        }
    }
}
