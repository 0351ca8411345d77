//! Integration tests for the engine client.
//!
//! These tests are implemented in:
//! `crates/dockwatch-engine/tests/engine_http.rs`
//!
//! Covered scenarios:
//! - `subscription_yields_events_then_closes`: NDJSON stream decoding and closure
//! - `subscription_rejected_by_engine_is_an_error`: non-2xx on subscribe
//! - `unreachable_engine_fails_to_subscribe`: connection refused on subscribe
//! - `logs_are_demultiplexed`: framed stdout/stderr decoding
//! - `missing_container_logs_are_unavailable`: non-2xx on log retrieval
