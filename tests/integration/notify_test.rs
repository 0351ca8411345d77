//! Integration tests for the notification pipeline.
//!
//! These tests are implemented in:
//! `crates/dockwatch-notify/tests/webhook_http.rs`
//! `crates/dockwatch-notify/tests/watch_loop.rs`
//!
//! Covered scenarios:
//! - `started_event_reaches_the_receiver`: start event → success attachment over HTTP
//! - `terminated_event_carries_fenced_logs_to_the_receiver`: die event → fenced log excerpt
//! - `only_the_configured_url_is_posted_to`: empty sink slots are never posted to
//! - `unreachable_sink_does_not_stop_the_reachable_one`: per-sink failure isolation
//! - `rejected_post_is_a_delivery_error`: non-2xx answers are delivery errors
//! - `reconnects_after_failures_and_processes_each_event_once`: reconnect, at-most-once
//! - `malformed_event_is_dropped_and_streaming_continues`: bad events are dropped alone
//! - `shutdown_while_connecting_stops_the_loop`: shutdown during reconnect attempts
