//! Prometheus metrics for the proxy.
//!
//! Metric names follow a fixed `proxy_{subsystem}_{name}_{unit}` convention.
//! Every `record_*`/`set_*` function here is a thin wrapper over the
//! `metrics` facade macros — `install_recorder` wires the actual Prometheus
//! exporter that the router exposes at `/metrics`.

use std::time::{Duration, Instant};

use lazy_static::lazy_static;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Zero-cost timer: wrap a unit of work, then call a `record_*` function with
/// `timer.elapsed()`.
pub struct Timer {
    start: Instant,
}

impl Timer {
    #[inline]
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    pub static ref REQUEST_TOTAL: &'static str = {
        metrics::describe_counter!("proxy_requests_total", "Total requests handled, by ecosystem and status.");
        "proxy_requests_total"
    };
    pub static ref REQUEST_DURATION: &'static str = {
        metrics::describe_histogram!(
            "proxy_request_duration_seconds",
            metrics::Unit::Seconds,
            "End-to-end request duration, by ecosystem."
        );
        "proxy_request_duration_seconds"
    };
    pub static ref REQUESTS_IN_FLIGHT: &'static str = {
        metrics::describe_gauge!("proxy_requests_in_flight", "Requests currently being served.");
        "proxy_requests_in_flight"
    };
    pub static ref CACHE_HITS_TOTAL: &'static str = {
        metrics::describe_counter!("proxy_cache_hits_total", "Cache hits, by ecosystem.");
        "proxy_cache_hits_total"
    };
    pub static ref CACHE_MISSES_TOTAL: &'static str = {
        metrics::describe_counter!("proxy_cache_misses_total", "Cache misses, by ecosystem.");
        "proxy_cache_misses_total"
    };
    pub static ref CACHE_SIZE_BYTES: &'static str = {
        metrics::describe_gauge!("proxy_cache_size_bytes", "Total bytes of cached artifacts.");
        "proxy_cache_size_bytes"
    };
    pub static ref CACHE_ARTIFACT_COUNT: &'static str = {
        metrics::describe_gauge!("proxy_cache_artifact_count", "Number of cached artifacts.");
        "proxy_cache_artifact_count"
    };
    pub static ref UPSTREAM_FETCH_DURATION: &'static str = {
        metrics::describe_histogram!(
            "proxy_upstream_fetch_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of upstream fetches, by ecosystem."
        );
        "proxy_upstream_fetch_duration_seconds"
    };
    pub static ref UPSTREAM_ERRORS_TOTAL: &'static str = {
        metrics::describe_counter!("proxy_upstream_errors_total", "Upstream fetch failures, by ecosystem.");
        "proxy_upstream_errors_total"
    };
    pub static ref STORAGE_OP_DURATION: &'static str = {
        metrics::describe_histogram!(
            "proxy_storage_op_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of blob store operations, by operation."
        );
        "proxy_storage_op_duration_seconds"
    };
    pub static ref STORAGE_ERRORS_TOTAL: &'static str = {
        metrics::describe_counter!("proxy_storage_errors_total", "Blob store failures, by operation.");
        "proxy_storage_errors_total"
    };
}

#[inline]
pub fn record_request(ecosystem: &str, status: u16, duration: Duration) {
    metrics::counter!(*REQUEST_TOTAL, "ecosystem" => ecosystem.to_string(), "status" => status.to_string()).increment(1);
    metrics::histogram!(*REQUEST_DURATION, "ecosystem" => ecosystem.to_string()).record(duration.as_secs_f64());
}

#[inline]
pub fn in_flight_inc() {
    metrics::gauge!(*REQUESTS_IN_FLIGHT).increment(1.0);
}

#[inline]
pub fn in_flight_dec() {
    metrics::gauge!(*REQUESTS_IN_FLIGHT).decrement(1.0);
}

#[inline]
pub fn record_cache_hit(ecosystem: &str) {
    metrics::counter!(*CACHE_HITS_TOTAL, "ecosystem" => ecosystem.to_string()).increment(1);
}

#[inline]
pub fn record_cache_miss(ecosystem: &str) {
    metrics::counter!(*CACHE_MISSES_TOTAL, "ecosystem" => ecosystem.to_string()).increment(1);
}

#[inline]
pub fn set_cache_size_bytes(bytes: u64) {
    metrics::gauge!(*CACHE_SIZE_BYTES).set(bytes as f64);
}

#[inline]
pub fn set_cache_artifact_count(count: u64) {
    metrics::gauge!(*CACHE_ARTIFACT_COUNT).set(count as f64);
}

#[inline]
pub fn record_upstream_fetch(ecosystem: &str, duration: Duration) {
    metrics::histogram!(*UPSTREAM_FETCH_DURATION, "ecosystem" => ecosystem.to_string()).record(duration.as_secs_f64());
}

#[inline]
pub fn record_upstream_error(ecosystem: &str) {
    metrics::counter!(*UPSTREAM_ERRORS_TOTAL, "ecosystem" => ecosystem.to_string()).increment(1);
}

#[inline]
pub fn record_storage_op(operation: &str, duration: Duration) {
    metrics::histogram!(*STORAGE_OP_DURATION, "operation" => operation.to_string()).record(duration.as_secs_f64());
}

#[inline]
pub fn record_storage_error(operation: &str) {
    metrics::counter!(*STORAGE_ERRORS_TOTAL, "operation" => operation.to_string()).increment(1);
}

/// Installs the global Prometheus recorder and returns the handle the
/// `/metrics` route renders from. Call once at startup.
pub fn install_recorder() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    const LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full("proxy_request_duration_seconds".to_string()), LATENCY_BUCKETS)?
        .set_buckets_for_metric(Matcher::Full("proxy_upstream_fetch_duration_seconds".to_string()), LATENCY_BUCKETS)?
        .set_buckets_for_metric(Matcher::Full("proxy_storage_op_duration_seconds".to_string()), LATENCY_BUCKETS)?
        .install_recorder()
}
