//! Internal observability metrics for rJSON-Exporter
//!
//! Served on the configured metrics path, separately from probe output.
//!
//! # Metrics
//!
//! ## Per-module metrics
//! - `rjson_probe_success_total{module="..."}` - Counter of successful probes
//! - `rjson_probe_failure_total{module="..."}` - Counter of failed probes
//! - `rjson_probe_duration_seconds{module="..."}` - Histogram of probe durations
//! - `rjson_observations_total{module="..."}` - Counter of emitted observations
//!
//! Series are keyed by configured module names only; targets come from the
//! query string and are never used as label values.
//!
//! ## Process metrics
//! - `rjson_exporter_build_info{version="..."}` - Always 1
//! - `rjson_config_last_load_timestamp_seconds` - When the configuration was loaded

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::transformer::{MetricType, PrometheusFormatter, PrometheusMetric};

/// Default histogram buckets for probe duration (in seconds)
pub const DEFAULT_HISTOGRAM_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Thread-safe counter using atomic operations
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.inc_by(1);
    }

    pub fn inc_by(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// f64 stored as bits
#[derive(Debug, Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }

    fn add(&self, v: f64) {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let new = (f64::from_bits(current) + v).to_bits();
            match self
                .0
                .compare_exchange_weak(current, new, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }
}

/// Thread-safe histogram for measuring distributions
#[derive(Debug)]
pub struct Histogram {
    /// Bucket upper bounds, ending with +Inf
    buckets: Vec<f64>,
    /// Cumulative count per bucket
    bucket_counts: Vec<AtomicU64>,
    sum: AtomicF64,
    count: AtomicU64,
}

impl Histogram {
    /// Create a histogram; bounds are sorted and +Inf is appended when missing
    pub fn new(buckets: &[f64]) -> Self {
        let mut bounds: Vec<f64> = buckets.iter().copied().filter(|b| !b.is_nan()).collect();
        bounds.sort_by(f64::total_cmp);
        if bounds.last().map_or(true, |b| b.is_finite()) {
            bounds.push(f64::INFINITY);
        }

        Self {
            bucket_counts: bounds.iter().map(|_| AtomicU64::new(0)).collect(),
            buckets: bounds,
            sum: AtomicF64::default(),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, v: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum.add(v);
        for (bound, count) in self.buckets.iter().zip(&self.bucket_counts) {
            if v <= *bound {
                count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn sum(&self) -> f64 {
        self.sum.load()
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Bucket bounds with their cumulative counts
    pub fn buckets(&self) -> Vec<(f64, u64)> {
        self.buckets
            .iter()
            .zip(&self.bucket_counts)
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new(DEFAULT_HISTOGRAM_BUCKETS)
    }
}

/// Per-module probe metrics
#[derive(Debug, Default)]
pub struct ProbeMetrics {
    pub success_total: Counter,
    pub failure_total: Counter,
    pub duration_seconds: Histogram,
}

/// Internal metrics registry
///
/// Series are created on first use; recording on an existing series only
/// takes the read lock.
#[derive(Debug)]
pub struct InternalMetrics {
    probes: RwLock<HashMap<String, Arc<ProbeMetrics>>>,
    modules: RwLock<HashMap<String, Arc<Counter>>>,
    config_loaded_at: AtomicF64,
}

impl Default for InternalMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl InternalMetrics {
    pub fn new() -> Self {
        let metrics = Self {
            probes: RwLock::new(HashMap::new()),
            modules: RwLock::new(HashMap::new()),
            config_loaded_at: AtomicF64::default(),
        };
        metrics.record_config_load();
        metrics
    }

    /// Get or create probe metrics for a module
    pub fn probes(&self, module: &str) -> Arc<ProbeMetrics> {
        get_or_insert(&self.probes, module)
    }

    /// Record a successful probe
    pub fn record_probe_success(&self, module: &str, duration_seconds: f64) {
        let metrics = self.probes(module);
        metrics.success_total.inc();
        metrics.duration_seconds.observe(duration_seconds);
    }

    /// Record a failed probe
    pub fn record_probe_failure(&self, module: &str, duration_seconds: f64) {
        let metrics = self.probes(module);
        metrics.failure_total.inc();
        metrics.duration_seconds.observe(duration_seconds);
    }

    /// Count observations emitted for a module
    pub fn record_observations(&self, module: &str, count: usize) {
        get_or_insert(&self.modules, module).inc_by(count as u64);
    }

    /// Observations emitted so far for a module
    pub fn observations(&self, module: &str) -> u64 {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(module)
            .map_or(0, |c| c.get())
    }

    /// Stamp the configuration load time
    pub fn record_config_load(&self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        self.config_loaded_at.store(now);
    }

    /// Snapshot all series, sorted by module for stable output
    pub fn to_prometheus_metrics(&self) -> Vec<PrometheusMetric> {
        let mut metrics = vec![
            PrometheusMetric::new("rjson_exporter_build_info", 1.0)
                .with_type(MetricType::Gauge)
                .with_help("rJSON-Exporter build information")
                .with_label("version", env!("CARGO_PKG_VERSION")),
            PrometheusMetric::new(
                "rjson_config_last_load_timestamp_seconds",
                self.config_loaded_at.load(),
            )
            .with_type(MetricType::Gauge)
            .with_help("Unix timestamp of the last configuration load"),
        ];

        let probes = snapshot(&self.probes);
        for (module, probe_metrics) in &probes {
            metrics.push(
                PrometheusMetric::new(
                    "rjson_probe_success_total",
                    probe_metrics.success_total.get() as f64,
                )
                .with_type(MetricType::Counter)
                .with_help("Total number of successful probes")
                .with_label("module", module),
            );
            metrics.push(
                PrometheusMetric::new(
                    "rjson_probe_failure_total",
                    probe_metrics.failure_total.get() as f64,
                )
                .with_type(MetricType::Counter)
                .with_help("Total number of failed probes")
                .with_label("module", module),
            );
        }

        for (module, probe_metrics) in &probes {
            let histogram = &probe_metrics.duration_seconds;
            for (bound, count) in histogram.buckets() {
                let le = if bound.is_infinite() {
                    "+Inf".to_string()
                } else {
                    bound.to_string()
                };
                metrics.push(
                    PrometheusMetric::new("rjson_probe_duration_seconds_bucket", count as f64)
                        .with_help("Histogram of probe durations")
                        .with_label("module", module)
                        .with_label("le", le),
                );
            }
            metrics.push(
                PrometheusMetric::new("rjson_probe_duration_seconds_sum", histogram.sum())
                    .with_help("Total time spent probing")
                    .with_label("module", module),
            );
            metrics.push(
                PrometheusMetric::new(
                    "rjson_probe_duration_seconds_count",
                    histogram.count() as f64,
                )
                .with_help("Total number of probes")
                .with_label("module", module),
            );
        }

        for (module, counter) in snapshot(&self.modules) {
            metrics.push(
                PrometheusMetric::new("rjson_observations_total", counter.get() as f64)
                    .with_type(MetricType::Counter)
                    .with_help("Total number of observations emitted")
                    .with_label("module", module),
            );
        }

        metrics
    }

    /// Format internal metrics as Prometheus exposition format string
    pub fn format_prometheus(&self) -> String {
        PrometheusFormatter::new().format(&self.to_prometheus_metrics())
    }
}

fn get_or_insert<T: Default>(map: &RwLock<HashMap<String, Arc<T>>>, key: &str) -> Arc<T> {
    if let Some(existing) = map
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(key)
    {
        return Arc::clone(existing);
    }

    let mut map = map.write().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(map.entry(key.to_string()).or_default())
}

fn snapshot<T>(map: &RwLock<HashMap<String, Arc<T>>>) -> Vec<(String, Arc<T>)> {
    let mut entries: Vec<(String, Arc<T>)> = map
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .map(|(k, v)| (k.clone(), Arc::clone(v)))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

static INTERNAL_METRICS: OnceLock<InternalMetrics> = OnceLock::new();

/// Get the global internal metrics instance
pub fn internal_metrics() -> &'static InternalMetrics {
    INTERNAL_METRICS.get_or_init(InternalMetrics::new)
}
