// Path: crates/telemetry/src/sinks.rs
//! Defines abstract traits for metrics reporting, decoupling core logic from the backend.

use once_cell::sync::OnceCell;

// --- Static Sink Access ---

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns a static reference to the configured error metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn error_metrics() -> &'static dyn ErrorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured request-execution metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn request_metrics() -> &'static dyn RequestMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured node-registry metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn node_metrics() -> &'static dyn NodeMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured cache metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn cache_metrics() -> &'static dyn CacheMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

// --- Trait Definitions ---

/// A sink for metrics related to request execution (the per-context retry loop).
pub trait RequestMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the number of attempts started for a method.
    fn inc_attempts(&self, method: &str);
    /// Increments the number of retries issued after a failed attempt.
    fn inc_retries(&self, method: &str, reason: &'static str);
    /// Observes the wall-clock duration of a completed context, labeled by
    /// method and outcome ("ok" or "error").
    fn observe_execute_duration(&self, method: &str, outcome: &'static str, duration_secs: f64);
    /// Increments the total number of contexts completed, labeled by method
    /// and outcome.
    fn inc_executes_total(&self, method: &str, outcome: &'static str);
}
impl RequestMetricsSink for NopSink {
    fn inc_attempts(&self, _method: &str) {}
    fn inc_retries(&self, _method: &str, _reason: &'static str) {}
    fn observe_execute_duration(&self, _method: &str, _outcome: &'static str, _duration_secs: f64) {}
    fn inc_executes_total(&self, _method: &str, _outcome: &'static str) {}
}

/// A sink for metrics related to the node registry: selection, blacklisting,
/// and node-list auto-update.
pub trait NodeMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the number of times a node was blacklisted, labeled by
    /// chain id and whether the fault was attributed to the server or the
    /// caller.
    fn inc_node_blacklisted(&self, chain_id: u64, fault: &'static str);
    /// Sets the gauge for the number of nodes currently eligible for
    /// selection on a chain.
    fn set_eligible_node_count(&self, chain_id: u64, count: f64);
    /// Increments the number of node-list auto-update fetches performed.
    fn inc_node_list_updates(&self, chain_id: u64);
}
impl NodeMetricsSink for NopSink {
    fn inc_node_blacklisted(&self, _chain_id: u64, _fault: &'static str) {}
    fn set_eligible_node_count(&self, _chain_id: u64, _count: f64) {}
    fn inc_node_list_updates(&self, _chain_id: u64) {}
}

/// A sink for metrics related to the local response/node-list cache.
pub trait CacheMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the number of cache lookups that found a usable entry.
    fn inc_cache_hit(&self, kind: &'static str);
    /// Increments the number of cache lookups that found nothing or a
    /// version-mismatched entry.
    fn inc_cache_miss(&self, kind: &'static str);
}
impl CacheMetricsSink for NopSink {
    fn inc_cache_hit(&self, _kind: &'static str) {}
    fn inc_cache_miss(&self, _kind: &'static str) {}
}

/// A sink for recording structured error metrics.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a specific error, categorized by its kind and variant.
    fn inc_error(&self, kind: &'static str, variant: &'static str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _kind: &'static str, _variant: &'static str) {}
}

/// A unified sink that implements all domain-specific traits, providing a single
/// point of implementation for metrics backends like Prometheus.
pub trait MetricsSink:
    RequestMetricsSink + NodeMetricsSink + CacheMetricsSink + ErrorMetricsSink
{
}

// Blanket implementation to allow any type that implements all sub-traits
// to be used as a `MetricsSink`.
impl<T> MetricsSink for T where
    T: RequestMetricsSink + NodeMetricsSink + CacheMetricsSink + ErrorMetricsSink
{
}
