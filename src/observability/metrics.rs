//! API call metrics and Prometheus exposition.
//!
//! # Responsibilities
//! - Count calls and accumulate latency per logical endpoint
//! - Keep a bounded window of recent latencies for percentile estimates
//! - Mirror every call into the `metrics` facade for Prometheus scraping
//!
//! # Metrics
//! - `bank_api_requests_total` (counter): calls by endpoint
//! - `bank_api_request_duration_seconds` (histogram): latency by endpoint
//! - `bank_database_available` (gauge): 1=reachable, 0=unreachable (set by the probe)
//! - `bank_db_acquire_rejected_total` (counter): fast-fail rejections
//!
//! # Design Decisions
//! - Endpoint entries are created on first call and never removed
//! - Counters are atomics; only the sample window takes a lock
//! - Percentiles cover the last `capacity` samples, not the full history

use dashmap::DashMap;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_SAMPLE_CAPACITY: usize = 100;

/// Install the Prometheus scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install Prometheus exporter"),
    }
}

/// Per-endpoint accumulator.
#[derive(Debug)]
pub struct EndpointMetric {
    calls: AtomicU64,
    total_ms: AtomicU64,
    samples: Mutex<VecDeque<u64>>,
    capacity: usize,
}

impl EndpointMetric {
    fn new(capacity: usize) -> Self {
        Self {
            calls: AtomicU64::new(0),
            total_ms: AtomicU64::new(0),
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn record(&self, elapsed_ms: u64) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.total_ms.fetch_add(elapsed_ms, Ordering::Relaxed);

        let mut samples = self.samples.lock();
        if samples.len() >= self.capacity {
            samples.pop_front();
        }
        samples.push_back(elapsed_ms);
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ms.load(Ordering::Relaxed)
    }

    /// Retained samples, oldest first.
    pub fn samples(&self) -> Vec<u64> {
        self.samples.lock().iter().copied().collect()
    }

    fn snapshot(&self) -> EndpointSnapshot {
        let calls = self.calls();
        let total = self.total_ms();
        let mut sorted = self.samples();
        sorted.sort_unstable();

        EndpointSnapshot {
            calls,
            average_time: average(total, calls),
            p50: percentile(&sorted, 50.0),
            p95: percentile(&sorted, 95.0),
            p99: percentile(&sorted, 99.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSnapshot {
    pub calls: u64,
    /// Mean latency in milliseconds over every call.
    pub average_time: f64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_api_calls: u64,
    pub average_response_time: f64,
    pub endpoints: BTreeMap<String, EndpointSnapshot>,
}

/// Process-wide API metrics. Construct once and share by `Arc`.
#[derive(Debug)]
pub struct MetricsRecorder {
    endpoints: DashMap<String, Arc<EndpointMetric>>,
    capacity: usize,
}

impl MetricsRecorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            endpoints: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, endpoint: &str, elapsed: Duration) {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.metric(endpoint).record(elapsed_ms);

        counter!("bank_api_requests_total", "endpoint" => endpoint.to_string()).increment(1);
        histogram!("bank_api_request_duration_seconds", "endpoint" => endpoint.to_string())
            .record(elapsed.as_secs_f64());
    }

    pub fn record_millis(&self, endpoint: &str, elapsed_ms: u64) {
        self.record(endpoint, Duration::from_millis(elapsed_ms));
    }

    fn metric(&self, endpoint: &str) -> Arc<EndpointMetric> {
        if let Some(existing) = self.endpoints.get(endpoint) {
            return existing.clone();
        }
        self.endpoints
            .entry(endpoint.to_string())
            .or_insert_with(|| Arc::new(EndpointMetric::new(self.capacity)))
            .clone()
    }

    pub fn endpoint(&self, endpoint: &str) -> Option<Arc<EndpointMetric>> {
        self.endpoints.get(endpoint).map(|m| m.clone())
    }

    pub fn total_calls(&self) -> u64 {
        self.endpoints.iter().map(|e| e.calls()).sum()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut endpoints = BTreeMap::new();
        let mut total_calls = 0;
        let mut total_ms = 0;

        for entry in self.endpoints.iter() {
            let snapshot = entry.value().snapshot();
            total_calls += snapshot.calls;
            total_ms += entry.value().total_ms();
            endpoints.insert(entry.key().clone(), snapshot);
        }

        MetricsSnapshot {
            total_api_calls: total_calls,
            average_response_time: average(total_ms, total_calls),
            endpoints,
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_CAPACITY)
    }
}

/// Nearest-rank percentile over ascending samples: `ceil(p/100 * n) - 1`,
/// clamped to the slice. Empty input yields 0.
pub fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = (p / 100.0 * sorted.len() as f64).ceil() as usize;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted[index]
}

fn average(total: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}
