// Path: crates/telemetry/src/prometheus.rs
//! A concrete implementation of the metrics sinks using the Prometheus crate.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_gauge_vec, register_histogram_vec, register_int_counter_vec,
    GaugeVec, HistogramVec, IntCounterVec,
};

// --- Metric Statics ---
// We use OnceCell to hold the metric collectors. They will be initialized
// exactly once by the `install` function.

static ATTEMPTS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static RETRIES_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static EXECUTE_DURATION_SECONDS: OnceCell<HistogramVec> = OnceCell::new();
static EXECUTES_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static NODE_BLACKLISTED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static ELIGIBLE_NODE_COUNT: OnceCell<GaugeVec> = OnceCell::new();
static NODE_LIST_UPDATES_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static CACHE_HITS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static CACHE_MISSES_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

/// Helper macro to reduce boilerplate for getting a metric from OnceCell.
/// This will panic if `install()` has not been called, which is intentional
/// as it indicates a critical application setup error.
macro_rules! get_metric {
    ($metric:ident) => {
        $metric
            .get()
            .expect("Prometheus sink not initialized. Call telemetry::prometheus::install() first.")
    };
}

impl RequestMetricsSink for PrometheusSink {
    fn inc_attempts(&self, method: &str) {
        get_metric!(ATTEMPTS_TOTAL).with_label_values(&[method]).inc();
    }
    fn inc_retries(&self, method: &str, reason: &'static str) {
        get_metric!(RETRIES_TOTAL)
            .with_label_values(&[method, reason])
            .inc();
    }
    fn observe_execute_duration(&self, method: &str, outcome: &'static str, duration_secs: f64) {
        get_metric!(EXECUTE_DURATION_SECONDS)
            .with_label_values(&[method, outcome])
            .observe(duration_secs);
    }
    fn inc_executes_total(&self, method: &str, outcome: &'static str) {
        get_metric!(EXECUTES_TOTAL)
            .with_label_values(&[method, outcome])
            .inc();
    }
}

impl NodeMetricsSink for PrometheusSink {
    fn inc_node_blacklisted(&self, chain_id: u64, fault: &'static str) {
        get_metric!(NODE_BLACKLISTED_TOTAL)
            .with_label_values(&[&chain_id.to_string(), fault])
            .inc();
    }
    fn set_eligible_node_count(&self, chain_id: u64, count: f64) {
        get_metric!(ELIGIBLE_NODE_COUNT)
            .with_label_values(&[&chain_id.to_string()])
            .set(count);
    }
    fn inc_node_list_updates(&self, chain_id: u64) {
        get_metric!(NODE_LIST_UPDATES_TOTAL)
            .with_label_values(&[&chain_id.to_string()])
            .inc();
    }
}

impl CacheMetricsSink for PrometheusSink {
    fn inc_cache_hit(&self, kind: &'static str) {
        get_metric!(CACHE_HITS_TOTAL).with_label_values(&[kind]).inc();
    }
    fn inc_cache_miss(&self, kind: &'static str) {
        get_metric!(CACHE_MISSES_TOTAL).with_label_values(&[kind]).inc();
    }
}

impl ErrorMetricsSink for PrometheusSink {
    fn inc_error(&self, kind: &'static str, variant: &'static str) {
        get_metric!(ERRORS_TOTAL)
            .with_label_values(&[kind, variant])
            .inc();
    }
}

/// Initializes all Prometheus metrics collectors and returns a static reference to the sink.
/// This function must be called only once at application startup.
#[allow(clippy::expect_used)]
pub fn install() -> Result<&'static dyn MetricsSink, prometheus::Error> {
    ATTEMPTS_TOTAL
        .set(register_int_counter_vec!(
            "tmrpc_attempts_total",
            "Total number of request attempts started, labeled by method.",
            &["method"]
        )?)
        .expect("static already initialized");
    RETRIES_TOTAL
        .set(register_int_counter_vec!(
            "tmrpc_retries_total",
            "Total number of retries issued after a failed attempt.",
            &["method", "reason"]
        )?)
        .expect("static already initialized");
    EXECUTE_DURATION_SECONDS
        .set(register_histogram_vec!(
            "tmrpc_execute_duration_seconds",
            "Wall-clock duration of a completed request context.",
            &["method", "outcome"],
            exponential_buckets(0.005, 2.0, 16)?
        )?)
        .expect("static already initialized");
    EXECUTES_TOTAL
        .set(register_int_counter_vec!(
            "tmrpc_executes_total",
            "Total number of request contexts completed, labeled by method and outcome.",
            &["method", "outcome"]
        )?)
        .expect("static already initialized");
    NODE_BLACKLISTED_TOTAL
        .set(register_int_counter_vec!(
            "tmrpc_node_blacklisted_total",
            "Total number of nodes blacklisted, labeled by chain id and fault attribution.",
            &["chain_id", "fault"]
        )?)
        .expect("static already initialized");
    ELIGIBLE_NODE_COUNT
        .set(register_gauge_vec!(
            "tmrpc_eligible_node_count",
            "Current number of nodes eligible for selection on a chain.",
            &["chain_id"]
        )?)
        .expect("static already initialized");
    NODE_LIST_UPDATES_TOTAL
        .set(register_int_counter_vec!(
            "tmrpc_node_list_updates_total",
            "Total number of node-list auto-update fetches performed.",
            &["chain_id"]
        )?)
        .expect("static already initialized");
    CACHE_HITS_TOTAL
        .set(register_int_counter_vec!(
            "tmrpc_cache_hits_total",
            "Total cache lookups that found a usable entry, labeled by cache kind.",
            &["kind"]
        )?)
        .expect("static already initialized");
    CACHE_MISSES_TOTAL
        .set(register_int_counter_vec!(
            "tmrpc_cache_misses_total",
            "Total cache lookups that found nothing or a version mismatch, labeled by cache kind.",
            &["kind"]
        )?)
        .expect("static already initialized");
    ERRORS_TOTAL
        .set(register_int_counter_vec!(
            "tmrpc_errors_total",
            "Total number of errors, categorized by kind and variant.",
            &["kind", "variant"]
        )?)
        .expect("static already initialized");

    static SINK: PrometheusSink = PrometheusSink;
    Ok(&SINK)
}
