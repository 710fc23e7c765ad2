//! Prometheus metrics for the relay pipeline

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, GaugeVec,
    HistogramVec, TextEncoder,
};

/// Relay metrics
pub struct RelayMetrics {
    /// Messages enqueued by the producer
    pub messages_enqueued: CounterVec,

    /// Messages relayed (forwarded and acknowledged)
    pub messages_relayed: CounterVec,

    /// Enqueue failures
    pub enqueue_failures: CounterVec,

    /// Receive failures in the worker loop
    pub receive_failures: CounterVec,

    /// Store forward failures (message left for redelivery)
    pub forward_failures: CounterVec,

    /// Approximate pending message depth
    pub pending_depth: GaugeVec,

    /// Store forward latency
    pub forward_latency: HistogramVec,
}

lazy_static! {
    pub static ref RELAY_METRICS: RelayMetrics = RelayMetrics {
        messages_enqueued: register_counter_vec!(
            "relay_messages_enqueued_total",
            "Total number of messages enqueued",
            &["queue"]
        )
        .unwrap(),

        messages_relayed: register_counter_vec!(
            "relay_messages_relayed_total",
            "Total number of messages forwarded to the store and acknowledged",
            &["queue"]
        )
        .unwrap(),

        enqueue_failures: register_counter_vec!(
            "relay_enqueue_failures_total",
            "Total number of enqueue failures",
            &["queue", "error"]
        )
        .unwrap(),

        receive_failures: register_counter_vec!(
            "relay_receive_failures_total",
            "Total number of receive failures",
            &["queue", "error"]
        )
        .unwrap(),

        forward_failures: register_counter_vec!(
            "relay_forward_failures_total",
            "Total number of store forward failures",
            &["queue", "error"]
        )
        .unwrap(),

        pending_depth: register_gauge_vec!(
            "relay_pending_messages",
            "Approximate number of pending messages",
            &["queue"]
        )
        .unwrap(),

        forward_latency: register_histogram_vec!(
            "relay_forward_latency_seconds",
            "Store forward latency in seconds",
            &["queue"]
        )
        .unwrap(),
    };
}

/// Initialize relay metrics
pub fn init_metrics() {
    lazy_static::initialize(&RELAY_METRICS);
}

/// Gather all registered metrics in Prometheus text exposition format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
