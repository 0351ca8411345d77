//! Watch loop behavior against a scripted event source.
//!
//! Each call to `subscribe` consumes the next step of a script: either an
//! immediate failure, a stream that delivers some events and then errors,
//! or a stream that delivers some events and then stays open.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dockwatch_common::config::{SinkConfig, WatchConfig};
use dockwatch_common::error::{Result, WatchError};
use dockwatch_common::types::{ContainerId, LifecycleEvent, LifecycleStatus};
use dockwatch_engine::{EventSource, LogSource, Subscription};
use dockwatch_notify::transport::WebhookTransport;
use dockwatch_notify::watch::Watcher;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

enum Step {
    Fail,
    ThenError(Vec<LifecycleEvent>),
    ThenHold(Vec<LifecycleEvent>),
}

struct ScriptedSource {
    script: Mutex<VecDeque<Step>>,
    subscribes: AtomicUsize,
    cancelled: Arc<AtomicUsize>,
}

impl ScriptedSource {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            subscribes: AtomicUsize::new(0),
            cancelled: Arc::new(AtomicUsize::new(0)),
        })
    }
}

impl EventSource for ScriptedSource {
    async fn subscribe(&self) -> Result<Subscription> {
        let _ = self.subscribes.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::ThenHold(Vec::new()));

        let (events, hold) = match step {
            Step::Fail => return Err(WatchError::subscription("connection refused")),
            Step::ThenError(events) => (events, false),
            Step::ThenHold(events) => (events, true),
        };

        let (feed, subscription) = Subscription::channel(16);
        let cancelled = Arc::clone(&self.cancelled);
        drop(tokio::spawn(async move {
            for event in events {
                if !feed.send(event).await {
                    return;
                }
            }
            if hold {
                feed.cancelled().await;
                let _ = cancelled.fetch_add(1, Ordering::SeqCst);
            } else {
                feed.fail(WatchError::subscription("engine restarted"));
            }
        }));
        Ok(subscription)
    }
}

impl LogSource for ScriptedSource {
    async fn fetch_logs(&self, _id: &ContainerId, _since: Duration) -> Result<Vec<u8>> {
        Ok(b"oom-killed".to_vec())
    }
}

struct RecordingTransport {
    posts: mpsc::UnboundedSender<String>,
}

impl WebhookTransport for RecordingTransport {
    async fn post(&self, _sink: &str, _url: &str, body: Arc<[u8]>) -> Result<()> {
        let _ = self
            .posts
            .send(String::from_utf8(body.to_vec()).expect("utf-8"));
        Ok(())
    }
}

/// Transport whose posts never complete.
#[derive(Default)]
struct StalledTransport {
    started: AtomicUsize,
}

impl WebhookTransport for StalledTransport {
    async fn post(&self, _sink: &str, _url: &str, _body: Arc<[u8]>) -> Result<()> {
        let _ = self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

fn event(status: &str, name: Option<&str>, time: i64) -> LifecycleEvent {
    let mut attributes = HashMap::new();
    if let Some(name) = name {
        let _ = attributes.insert("name".to_owned(), name.to_owned());
    }
    if status == "die" {
        let _ = attributes.insert("exitCode".to_owned(), "137".to_owned());
    }
    LifecycleEvent {
        status: LifecycleStatus::from_tag(status),
        from: "nginx:latest".into(),
        time,
        actor_id: ContainerId::new(format!("id-{time}")),
        attributes,
    }
}

fn config() -> WatchConfig {
    let sinks = SinkConfig::from_urls(Some("https://hooks.slack.example/T1".into()), None)
        .expect("one sink");
    WatchConfig::new("1.41", None, sinks).expect("config")
}

async fn next_post(posts: &mut mpsc::UnboundedReceiver<String>) -> String {
    tokio::time::timeout(Duration::from_secs(5), posts.recv())
        .await
        .expect("notification arrives")
        .expect("transport alive")
}

#[tokio::test]
async fn reconnects_after_failures_and_processes_each_event_once() {
    let source = ScriptedSource::new(vec![
        Step::Fail,
        Step::ThenError(vec![event("start", Some("web1"), 1000)]),
        Step::Fail,
        Step::ThenHold(vec![event("die", Some("web1"), 2000)]),
    ]);
    let (tx, mut posts) = mpsc::unbounded_channel();
    let transport = Arc::new(RecordingTransport { posts: tx });
    let mut watcher = Watcher::new(Arc::clone(&source), transport, &config());

    let shutdown = CancellationToken::new();
    let running = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            watcher.run(shutdown).await;
            watcher
        }
    });

    let first = next_post(&mut posts).await;
    assert!(first.contains("Container started. name => web1 image => nginx:latest"));
    assert!(first.contains(r##""color":"#9ccc65""##));

    let second = next_post(&mut posts).await;
    assert_ne!(first, second);
    assert!(second.contains("Container died. name => web1 image => nginx:latest status code => 137"));
    assert!(second.contains(r#""text":"```oom-killed```""#));

    shutdown.cancel();
    let watcher = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("watcher stops")
        .expect("watcher task");

    let stats = watcher.stats();
    assert_eq!(source.subscribes.load(Ordering::SeqCst), 4);
    assert_eq!(stats.sessions, 2);
    assert_eq!(stats.events, 2);
    assert_eq!(stats.notifications, 2);
    assert_eq!(watcher.in_flight(), 0);

    // The held stream observes the cancellation from its own task.
    tokio::time::timeout(Duration::from_secs(5), async {
        while source.cancelled.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("held stream released");
    assert_eq!(source.cancelled.load(Ordering::SeqCst), 1);

    drop(watcher);
    assert!(posts.recv().await.is_none(), "no event is notified twice");
}

#[tokio::test]
async fn malformed_event_is_dropped_and_streaming_continues() {
    let source = ScriptedSource::new(vec![Step::ThenHold(vec![
        event("start", None, 1000),
        event("pause", Some("web1"), 1500),
        event("start", Some("web2"), 2000),
    ])]);
    let (tx, mut posts) = mpsc::unbounded_channel();
    let transport = Arc::new(RecordingTransport { posts: tx });
    let mut watcher = Watcher::new(Arc::clone(&source), transport, &config());

    let shutdown = CancellationToken::new();
    let running = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            watcher.run(shutdown).await;
            watcher
        }
    });

    let only = next_post(&mut posts).await;
    assert!(only.contains("name => web2"));

    shutdown.cancel();
    let watcher = running.await.expect("watcher task");
    let stats = watcher.stats();
    assert_eq!(stats.sessions, 1);
    assert_eq!(stats.events, 3);
    assert_eq!(stats.notifications, 1);
    assert_eq!(stats.dropped, 1);
}

#[tokio::test]
async fn shutdown_while_connecting_stops_the_loop() {
    let source = ScriptedSource::new((0..1000).map(|_| Step::Fail).collect());
    let (tx, _posts) = mpsc::unbounded_channel();
    let transport = Arc::new(RecordingTransport { posts: tx });
    let config = config().with_reconnect_delay(Duration::from_millis(5));
    let mut watcher = Watcher::new(Arc::clone(&source), transport, &config);

    let shutdown = CancellationToken::new();
    let running = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            watcher.run(shutdown).await;
            watcher
        }
    });

    tokio::time::sleep(Duration::from_millis(30)).await;
    shutdown.cancel();
    let watcher = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("watcher stops")
        .expect("watcher task");

    assert_eq!(watcher.stats().sessions, 0);
    assert!(source.subscribes.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn stalled_sink_does_not_hold_up_event_intake() {
    let events = (0..50)
        .map(|i| event("start", Some(format!("web{i}").as_str()), 1000 + i))
        .collect();
    let source = ScriptedSource::new(vec![Step::ThenHold(events)]);
    let transport = Arc::new(StalledTransport::default());
    let config = config().with_shutdown_grace(Duration::from_millis(50));
    let mut watcher = Watcher::new(Arc::clone(&source), Arc::clone(&transport), &config);

    let shutdown = CancellationToken::new();
    let running = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            watcher.run(shutdown).await;
            watcher
        }
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        while transport.started.load(Ordering::SeqCst) < 50 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("every event reaches the transport while earlier posts hang");

    shutdown.cancel();
    let watcher = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("watcher stops")
        .expect("watcher task");
    let stats = watcher.stats();
    assert_eq!(stats.events, 50);
    assert_eq!(stats.notifications, 50);
    assert_eq!(watcher.in_flight(), 0);
}

#[tokio::test]
async fn shutdown_gives_up_on_stalled_sinks_after_the_grace_period() {
    let source = ScriptedSource::new(vec![Step::ThenHold(vec![event(
        "start",
        Some("web1"),
        1000,
    )])]);
    let transport = Arc::new(StalledTransport::default());
    let config = config().with_shutdown_grace(Duration::from_millis(100));
    let mut watcher = Watcher::new(Arc::clone(&source), Arc::clone(&transport), &config);

    let shutdown = CancellationToken::new();
    let running = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            watcher.run(shutdown).await;
            watcher
        }
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        while transport.started.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("post started");

    shutdown.cancel();
    let watcher = tokio::time::timeout(Duration::from_secs(3), running)
        .await
        .expect("shutdown is bounded by the grace period")
        .expect("watcher task");
    assert_eq!(watcher.stats().notifications, 1);
    assert_eq!(watcher.in_flight(), 0);
}
