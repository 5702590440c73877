//! Prometheus Metrics Module
//!
//! Application-wide metrics collection.
//!
//! # Metrics Collected
//! - Active connection gauge
//! - Routed message counts by route type
//! - Delivery and dispatch failure counts
//! - Unknown event counts
//! - Health probe failure counts and healthy server gauge

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Active transport connections
pub static ACTIVE_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("active_connections", "Number of active connections").namespace("chat_relay"),
    )
    .expect("Failed to create ACTIVE_CONNECTIONS metric")
});

/// Messages routed, labeled by route type
pub static ROUTED_MESSAGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("routed_messages_total", "Total messages routed").namespace("chat_relay"),
        &["route"],
    )
    .expect("Failed to create ROUTED_MESSAGES_TOTAL metric")
});

/// Per-target delivery failures
pub static DELIVERY_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("delivery_failures_total", "Per-target delivery failures")
            .namespace("chat_relay"),
        &["queue"],
    )
    .expect("Failed to create DELIVERY_FAILURES_TOTAL metric")
});

/// Handler failures during event dispatch, labeled by event name
pub static DISPATCH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("dispatch_failures_total", "Event handler failures").namespace("chat_relay"),
        &["event"],
    )
    .expect("Failed to create DISPATCH_FAILURES_TOTAL metric")
});

/// Dispatch lookups for events with no registered handler
pub static UNKNOWN_EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("unknown_events_total", "Dispatched events with no handler")
            .namespace("chat_relay"),
        &["event"],
    )
    .expect("Failed to create UNKNOWN_EVENTS_TOTAL metric")
});

/// Health probe failures, labeled by server id
pub static HEALTH_PROBE_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("health_probe_failures_total", "Failed health probes").namespace("chat_relay"),
        &["server"],
    )
    .expect("Failed to create HEALTH_PROBE_FAILURES_TOTAL metric")
});

/// Healthy servers currently in the pool
pub static POOL_HEALTHY_SERVERS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("pool_healthy_servers", "Healthy servers in the pool").namespace("chat_relay"),
    )
    .expect("Failed to create POOL_HEALTHY_SERVERS metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(ACTIVE_CONNECTIONS.clone()))
        .expect("Failed to register ACTIVE_CONNECTIONS");
    registry
        .register(Box::new(ROUTED_MESSAGES_TOTAL.clone()))
        .expect("Failed to register ROUTED_MESSAGES_TOTAL");
    registry
        .register(Box::new(DELIVERY_FAILURES_TOTAL.clone()))
        .expect("Failed to register DELIVERY_FAILURES_TOTAL");
    registry
        .register(Box::new(DISPATCH_FAILURES_TOTAL.clone()))
        .expect("Failed to register DISPATCH_FAILURES_TOTAL");
    registry
        .register(Box::new(UNKNOWN_EVENTS_TOTAL.clone()))
        .expect("Failed to register UNKNOWN_EVENTS_TOTAL");
    registry
        .register(Box::new(HEALTH_PROBE_FAILURES_TOTAL.clone()))
        .expect("Failed to register HEALTH_PROBE_FAILURES_TOTAL");
    registry
        .register(Box::new(POOL_HEALTHY_SERVERS.clone()))
        .expect("Failed to register POOL_HEALTHY_SERVERS");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Metrics should be valid UTF-8")
}

/// Helper to update the active connection gauge
pub fn set_active_connections(count: usize) {
    ACTIVE_CONNECTIONS.set(count as i64);
}

/// Helper to record a routed message
pub fn record_routed_message(route: &str) {
    ROUTED_MESSAGES_TOTAL.with_label_values(&[route]).inc();
}

/// Helper to record a per-target delivery failure
pub fn record_delivery_failure(queue: &str) {
    DELIVERY_FAILURES_TOTAL.with_label_values(&[queue]).inc();
}

/// Helper to record a handler failure
pub fn record_dispatch_failure(event: &str) {
    DISPATCH_FAILURES_TOTAL.with_label_values(&[event]).inc();
}

/// Helper to record a dispatch of an unknown event
pub fn record_unknown_event(event: &str) {
    UNKNOWN_EVENTS_TOTAL.with_label_values(&[event]).inc();
}

/// Helper to record a failed health probe
pub fn record_probe_failure(server_id: &str) {
    HEALTH_PROBE_FAILURES_TOTAL
        .with_label_values(&[server_id])
        .inc();
}

/// Helper to update the healthy server gauge
pub fn set_healthy_servers(count: usize) {
    POOL_HEALTHY_SERVERS.set(count as i64);
}
