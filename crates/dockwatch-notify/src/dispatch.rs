//! Fan-out of notifications to webhook sinks.
//!
//! A payload is serialized once and posted to every configured sink from
//! its own task. Sinks never wait on each other and a failure stays local
//! to the sink it happened on: it is logged, not retried.
//!
//! The watch loop hands payloads to a [`DeliveryGroup`], which runs each
//! payload's fan-out as a supervised task so event intake never waits on
//! delivery.

use std::sync::Arc;
use std::time::Duration;

use dockwatch_common::config::SinkConfig;
use dockwatch_common::error::Result;
use tokio::task::JoinSet;

use crate::payload::NotificationPayload;
use crate::transport::WebhookTransport;

/// Result of delivering one payload to one sink.
#[derive(Debug)]
pub struct DeliveryOutcome {
    /// Sink name.
    pub sink: String,
    /// What happened.
    pub result: Result<()>,
}

/// Per-sink results of one fan-out, in completion order.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// One entry per attempted sink.
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DispatchReport {
    /// Number of sinks that accepted the payload.
    #[must_use]
    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Number of sinks the payload could not be delivered to.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.delivered()
    }
}

/// Delivers payloads to every active sink.
#[derive(Debug)]
pub struct Dispatcher<T> {
    transport: Arc<T>,
    sinks: Arc<SinkConfig>,
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            sinks: Arc::clone(&self.sinks),
        }
    }
}

impl<T: WebhookTransport> Dispatcher<T> {
    /// Creates a dispatcher posting through `transport` to `sinks`.
    pub const fn new(transport: Arc<T>, sinks: Arc<SinkConfig>) -> Self {
        Self { transport, sinks }
    }

    /// Posts `payload` to every active sink concurrently and waits for all
    /// attempts to finish.
    ///
    /// # Errors
    ///
    /// Returns an error only if the payload cannot be serialized; per-sink
    /// failures are logged and reported in the [`DispatchReport`].
    pub async fn deliver(&self, payload: &NotificationPayload) -> Result<DispatchReport> {
        let body = payload.to_wire()?;

        let mut attempts = JoinSet::new();
        for sink in self.sinks.active() {
            let transport = Arc::clone(&self.transport);
            let body = Arc::clone(&body);
            let name = sink.name.clone();
            let url = sink.url.clone();
            let _ = attempts.spawn(async move {
                let result = transport.post(&name, &url, body).await;
                DeliveryOutcome { sink: name, result }
            });
        }

        let mut report = DispatchReport::default();
        while let Some(joined) = attempts.join_next().await {
            match joined {
                Ok(outcome) => {
                    match &outcome.result {
                        Ok(()) => tracing::debug!(sink = %outcome.sink, "notification delivered"),
                        Err(e) => tracing::warn!(sink = %outcome.sink, error = %e, "notification lost"),
                    }
                    report.outcomes.push(outcome);
                }
                Err(e) => tracing::error!(error = %e, "delivery task failed"),
            }
        }
        Ok(report)
    }
}

/// Supervised set of in-flight fan-outs.
///
/// Finished tasks are reaped whenever a new payload is submitted; the
/// remaining ones can be awaited with [`DeliveryGroup::drain`] or, with a
/// deadline, [`DeliveryGroup::drain_within`]. Dropping the group aborts
/// whatever is still running.
#[derive(Debug, Default)]
pub struct DeliveryGroup {
    tasks: JoinSet<()>,
}

impl DeliveryGroup {
    /// Creates an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts delivering `payload` in the background and returns at once.
    pub fn submit<T: WebhookTransport>(
        &mut self,
        dispatcher: &Dispatcher<T>,
        payload: NotificationPayload,
    ) {
        let _ = self.reap();
        let dispatcher = dispatcher.clone();
        let _ = self.tasks.spawn(async move {
            match dispatcher.deliver(&payload).await {
                Ok(report) => tracing::debug!(
                    delivered = report.delivered(),
                    failed = report.failed(),
                    "fan-out finished"
                ),
                Err(e) => tracing::error!(error = %e, "cannot encode notification"),
            }
        });
    }

    /// Collects finished tasks without waiting and returns how many there
    /// were.
    pub fn reap(&mut self) -> usize {
        let mut reaped = 0;
        while let Some(joined) = self.tasks.try_join_next() {
            if let Err(e) = joined {
                tracing::error!(error = %e, "fan-out task failed");
            }
            reaped += 1;
        }
        reaped
    }

    /// Number of fan-outs that have not been reaped yet.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Waits for every in-flight fan-out to finish.
    pub async fn drain(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "fan-out task failed");
            }
        }
    }

    /// Waits up to `grace` for in-flight fan-outs, then aborts the rest.
    ///
    /// Returns how many fan-outs were abandoned.
    pub async fn drain_within(&mut self, grace: Duration) -> usize {
        if tokio::time::timeout(grace, self.drain()).await.is_ok() {
            return 0;
        }
        let abandoned = self.tasks.len();
        self.tasks.shutdown().await;
        abandoned
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use dockwatch_common::config::Sink;
    use dockwatch_common::error::WatchError;
    use tokio::sync::mpsc;

    use super::*;
    use crate::payload::{Attachment, Severity};

    type Post = (String, String, Vec<u8>);

    /// Transport recording every post; named sinks fail or never answer.
    struct FakeTransport {
        failing: HashSet<&'static str>,
        hanging: HashSet<&'static str>,
        posts: mpsc::UnboundedSender<Post>,
    }

    impl FakeTransport {
        fn new(
            failing: &[&'static str],
            hanging: &[&'static str],
        ) -> (Arc<Self>, mpsc::UnboundedReceiver<Post>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let transport = Self {
                failing: failing.iter().copied().collect(),
                hanging: hanging.iter().copied().collect(),
                posts: tx,
            };
            (Arc::new(transport), rx)
        }
    }

    impl WebhookTransport for FakeTransport {
        async fn post(&self, sink: &str, url: &str, body: Arc<[u8]>) -> Result<()> {
            if self.hanging.contains(sink) {
                std::future::pending::<()>().await;
            }
            if self.failing.contains(sink) {
                return Err(WatchError::Delivery {
                    sink: sink.to_owned(),
                    message: "connection refused".into(),
                });
            }
            let _ = self.posts.send((sink.to_owned(), url.to_owned(), body.to_vec()));
            Ok(())
        }
    }

    fn both_sinks() -> Arc<SinkConfig> {
        Arc::new(
            SinkConfig::new(vec![
                Sink::new("slack", "https://hooks.slack.example/T1"),
                Sink::new("discord", "https://discord.example/api/webhooks/1/slack"),
            ])
            .expect("valid"),
        )
    }

    fn payload() -> NotificationPayload {
        NotificationPayload::single(Attachment::new(
            "Container started. name => web1 image => nginx:latest",
            Severity::Success,
            1000,
        ))
    }

    #[tokio::test]
    async fn failing_sink_does_not_block_the_other() {
        let (transport, mut posts) = FakeTransport::new(&["slack"], &[]);
        let dispatcher = Dispatcher::new(transport, both_sinks());

        let report = dispatcher.deliver(&payload()).await.expect("encodes");
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.delivered(), 1);
        assert_eq!(report.failed(), 1);

        let (sink, url, body) = posts.recv().await.expect("discord post");
        assert_eq!(sink, "discord");
        assert_eq!(url, "https://discord.example/api/webhooks/1/slack");
        assert_eq!(body, payload().to_wire().expect("encodes").to_vec());
        assert!(posts.try_recv().is_err());
    }

    #[tokio::test]
    async fn unset_sink_is_never_posted_to() {
        let (transport, mut posts) = FakeTransport::new(&[], &[]);
        let sinks = Arc::new(
            SinkConfig::from_urls(Some("https://hooks.slack.example/T1".into()), None)
                .expect("valid"),
        );
        let dispatcher = Dispatcher::new(transport, sinks);

        let report = dispatcher.deliver(&payload()).await.expect("encodes");
        assert_eq!(report.outcomes.len(), 1);

        let (sink, url, _) = posts.recv().await.expect("slack post");
        assert_eq!(sink, "slack");
        assert_eq!(url, "https://hooks.slack.example/T1");
        drop(dispatcher);
        assert!(posts.recv().await.is_none());
    }

    #[tokio::test]
    async fn hanging_sink_does_not_delay_the_other() {
        let (transport, mut posts) = FakeTransport::new(&[], &["slack"]);
        let dispatcher = Dispatcher::new(transport, both_sinks());

        let fan_out = tokio::spawn(async move { dispatcher.deliver(&payload()).await });

        let (sink, _, _) = tokio::time::timeout(Duration::from_secs(2), posts.recv())
            .await
            .expect("discord is not held up by slack")
            .expect("discord post");
        assert_eq!(sink, "discord");
        assert!(!fan_out.is_finished());
        fan_out.abort();
    }

    #[tokio::test]
    async fn submit_returns_before_delivery_completes() {
        let (transport, _posts) = FakeTransport::new(&[], &["slack", "discord"]);
        let dispatcher = Dispatcher::new(transport, both_sinks());
        let mut group = DeliveryGroup::new();

        group.submit(&dispatcher, payload());
        group.submit(&dispatcher, payload());
        assert_eq!(group.in_flight(), 2);
        assert_eq!(group.reap(), 0);
    }

    #[tokio::test]
    async fn drain_waits_for_every_fan_out() {
        let (transport, mut posts) = FakeTransport::new(&[], &[]);
        let dispatcher = Dispatcher::new(transport, both_sinks());
        let mut group = DeliveryGroup::new();

        for _ in 0..3 {
            group.submit(&dispatcher, payload());
        }
        group.drain().await;
        assert_eq!(group.in_flight(), 0);

        let mut received = 0;
        while posts.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 6);
    }

    #[tokio::test]
    async fn drain_within_abandons_hanging_fan_outs() {
        let (transport, mut posts) = FakeTransport::new(&[], &["slack"]);
        let dispatcher = Dispatcher::new(transport, both_sinks());
        let mut group = DeliveryGroup::new();

        group.submit(&dispatcher, payload());
        group.submit(&dispatcher, payload());
        let abandoned = tokio::time::timeout(
            Duration::from_secs(5),
            group.drain_within(Duration::from_millis(50)),
        )
        .await
        .expect("grace period bounds the drain");

        assert_eq!(abandoned, 2);
        assert_eq!(group.in_flight(), 0);
        let mut received = 0;
        while posts.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 2, "discord still got both notifications");
    }

    #[tokio::test]
    async fn drain_within_reports_nothing_when_all_finish() {
        let (transport, _posts) = FakeTransport::new(&[], &[]);
        let dispatcher = Dispatcher::new(transport, both_sinks());
        let mut group = DeliveryGroup::new();

        group.submit(&dispatcher, payload());
        assert_eq!(group.drain_within(Duration::from_secs(5)).await, 0);
    }
}
