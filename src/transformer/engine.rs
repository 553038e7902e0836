//! Scrape Engine - JSON document to observation conversion
//!
//! This module provides the core extraction logic: every configured
//! [`MetricDescriptor`] is evaluated against one fetched document and turned
//! into zero or more [`Observation`]s. Failures never abort a run; they are
//! logged and the affected metric or array element is skipped.

use std::iter;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::{debug, error};

use crate::error::ScrapeError;
use crate::jsonpath::{extract, extract_values, OutputMode};

use super::descriptor::{MetricDescriptor, MetricType, ScrapeKind};
use super::formatter::PrometheusMetric;
use super::labels::{resolve_labels, Scopes};
use super::value::{sanitize_int_value, sanitize_value};

/// Name of the status observation emitted by every run
pub const EXPORTER_STATUS_NAME: &str = "json_exporter_status";

static EXPORTER_STATUS: Lazy<MetricDescriptor> = Lazy::new(|| {
    MetricDescriptor::new(EXPORTER_STATUS_NAME, "", ScrapeKind::Value)
        .with_help("Up/Down Status of JSON Exporter. Should always be 0.")
        .with_metric_type(MetricType::Gauge)
});

/// One emitted metric instance
///
/// `labels` always has the same length and order as the descriptor's label
/// names.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation<'a> {
    pub descriptor: &'a MetricDescriptor,
    pub value: f64,
    pub labels: Vec<String>,
    /// Milliseconds since the Unix epoch
    pub timestamp: Option<i64>,
}

impl<'a> Observation<'a> {
    /// The fixed status observation
    pub fn exporter_status() -> Self {
        Self {
            descriptor: &*EXPORTER_STATUS,
            value: 0.0,
            labels: Vec::new(),
            timestamp: None,
        }
    }

    /// Metric name of the owning descriptor
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Convert into an exposition-ready metric
    pub fn to_prometheus(&self) -> PrometheusMetric {
        let labels = self
            .descriptor
            .label_names()
            .iter()
            .cloned()
            .zip(self.labels.iter().cloned())
            .collect();

        PrometheusMetric {
            name: self.descriptor.name().to_string(),
            metric_type: self.descriptor.metric_type(),
            help: Some(self.descriptor.help().to_string()),
            labels,
            value: self.value,
            timestamp: self.timestamp,
        }
    }
}

/// Scrape engine for one module
///
/// Holds the module's descriptors behind an `Arc`, so clones are cheap and
/// concurrent probes share the same read-only list.
#[derive(Debug, Clone)]
pub struct ScrapeEngine {
    metrics: Arc<[MetricDescriptor]>,
}

impl ScrapeEngine {
    /// Create a new ScrapeEngine with the given descriptors
    ///
    /// # Example
    ///
    /// ```ignore
    /// use rjson_exporter::transformer::{MetricDescriptor, ScrapeEngine, ScrapeKind};
    ///
    /// let engine = ScrapeEngine::new(vec![
    ///     MetricDescriptor::new("counter", "{.counter}", ScrapeKind::Value),
    /// ]);
    /// let doc = serde_json::json!({"counter": 1234});
    /// assert_eq!(engine.collect(&doc).count(), 2);
    /// ```
    pub fn new(metrics: Vec<MetricDescriptor>) -> Self {
        Self {
            metrics: metrics.into(),
        }
    }

    /// Create an engine with no descriptors
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Descriptors in configured order
    pub fn metrics(&self) -> &[MetricDescriptor] {
        &self.metrics
    }

    /// Evaluate every descriptor against `root`
    ///
    /// The status observation comes first, then observations in descriptor
    /// order, and for object scrapes in document order.
    pub fn collect<'a>(&'a self, root: &'a Value) -> impl Iterator<Item = Observation<'a>> + 'a {
        iter::once(Observation::exporter_status()).chain(
            self.metrics
                .iter()
                .flat_map(move |descriptor| scrape_descriptor(descriptor, root)),
        )
    }
}

impl Default for ScrapeEngine {
    fn default() -> Self {
        Self::empty()
    }
}

fn scrape_descriptor<'a>(descriptor: &'a MetricDescriptor, root: &'a Value) -> Vec<Observation<'a>> {
    match descriptor.kind() {
        ScrapeKind::Value => {
            debug!(metric = %descriptor.name(), "Extracting value for metric");
            match scrape_value(descriptor, root) {
                Ok(observation) => vec![observation],
                Err(e) => {
                    log_skip(descriptor, &e);
                    Vec::new()
                }
            }
        }
        ScrapeKind::Object { value_path } => {
            debug!(metric = %descriptor.name(), "Extracting object for metric");
            let elements = match extract_objects(descriptor, root) {
                Ok(elements) => elements,
                Err(e) => {
                    log_skip(descriptor, &e);
                    return Vec::new();
                }
            };

            elements
                .iter()
                .map(|element| scrape_element(descriptor, value_path, root, element))
                .filter_map(|result| result.map_err(|e| log_skip(descriptor, &e)).ok())
                .collect()
        }
    }
}

fn scrape_value<'a>(
    descriptor: &'a MetricDescriptor,
    root: &Value,
) -> Result<Observation<'a>, ScrapeError> {
    let path = descriptor.key_path();
    let text = extract(root, path, OutputMode::Text).map_err(|source| ScrapeError::Extract {
        path: path.to_string(),
        source,
    })?;

    let value = sanitize_value(&text).map_err(|source| ScrapeError::Convert {
        path: path.to_string(),
        value: text.clone(),
        source,
    })?;

    let scopes = Scopes::root(root);
    Ok(Observation {
        descriptor,
        value,
        labels: resolve_labels(descriptor.name(), descriptor.label_paths(), &scopes),
        timestamp: extract_timestamp(descriptor, &scopes),
    })
}

fn extract_objects(descriptor: &MetricDescriptor, root: &Value) -> Result<Vec<Value>, ScrapeError> {
    let path = descriptor.key_path();
    extract_values(root, path).map_err(|source| ScrapeError::Extract {
        path: path.to_string(),
        source,
    })
}

fn scrape_element<'a>(
    descriptor: &'a MetricDescriptor,
    value_path: &str,
    root: &Value,
    element: &Value,
) -> Result<Observation<'a>, ScrapeError> {
    let raw = extract(element, value_path, OutputMode::Text).map_err(|source| {
        ScrapeError::Extract {
            path: value_path.to_string(),
            source,
        }
    })?;

    let converted = descriptor.value_converter().convert(value_path, &raw);
    let value = sanitize_value(converted).map_err(|source| ScrapeError::Convert {
        path: value_path.to_string(),
        value: converted.to_string(),
        source,
    })?;

    let scopes = Scopes::nested(root, element);
    Ok(Observation {
        descriptor,
        value,
        labels: resolve_labels(descriptor.name(), descriptor.label_paths(), &scopes),
        timestamp: extract_timestamp(descriptor, &scopes),
    })
}

/// Resolve the explicit timestamp, if configured
///
/// Uses the same root / current scope choice as labels. Failures are logged
/// and leave the observation without a timestamp.
fn extract_timestamp(descriptor: &MetricDescriptor, scopes: &Scopes<'_>) -> Option<i64> {
    let path = descriptor.epoch_timestamp_path()?;

    let text = match extract(scopes.select(path), path, OutputMode::Text) {
        Ok(text) => text,
        Err(e) => {
            error!(
                metric = %descriptor.name(),
                path = %path,
                error = %e,
                "Failed to extract timestamp for metric"
            );
            return None;
        }
    };

    match sanitize_int_value(&text) {
        Ok(timestamp) => Some(timestamp),
        Err(e) => {
            error!(
                metric = %descriptor.name(),
                path = %path,
                error = %e,
                "Failed to parse timestamp for metric"
            );
            None
        }
    }
}

fn log_skip(descriptor: &MetricDescriptor, err: &ScrapeError) {
    match err {
        ScrapeError::Convert { value, .. } => error!(
            metric = %descriptor.name(),
            path = %err.path(),
            value = %value,
            error = %err,
            "Skipping metric value"
        ),
        _ => error!(
            metric = %descriptor.name(),
            path = %err.path(),
            error = %err,
            "Skipping metric value"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformer::value::ValueConverter;
    use serde_json::json;
    use std::collections::HashMap;

    fn values<'a>(observations: &[Observation<'a>], name: &str) -> Vec<f64> {
        observations
            .iter()
            .filter(|o| o.name() == name)
            .map(|o| o.value)
            .collect()
    }

    fn status_count(observations: &[Observation<'_>]) -> usize {
        observations
            .iter()
            .filter(|o| o.name() == EXPORTER_STATUS_NAME)
            .count()
    }

    #[test]
    fn test_status_first_and_only_once() {
        let engine = ScrapeEngine::empty();
        let doc = json!({});
        let observations: Vec<_> = engine.collect(&doc).collect();

        assert_eq!(observations.len(), 1);
        let status = &observations[0];
        assert_eq!(status.name(), "json_exporter_status");
        assert_eq!(status.value, 0.0);
        assert!(status.labels.is_empty());
        assert_eq!(status.descriptor.metric_type(), MetricType::Gauge);
        assert_eq!(
            status.descriptor.help(),
            "Up/Down Status of JSON Exporter. Should always be 0."
        );
    }

    #[test]
    fn test_scalar_scrape() {
        let engine = ScrapeEngine::new(vec![MetricDescriptor::new(
            "counter",
            "{.counter}",
            ScrapeKind::Value,
        )
        .with_label("zone", "{.zone}")]);
        let doc = json!({"counter": 1234, "zone": "eu"});

        let observations: Vec<_> = engine.collect(&doc).collect();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].name(), EXPORTER_STATUS_NAME);
        assert_eq!(observations[1].value, 1234.0);
        assert_eq!(observations[1].labels, vec!["eu"]);
        assert_eq!(observations[1].timestamp, None);
    }

    #[test]
    fn test_scalar_scrape_bare_path() {
        let engine = ScrapeEngine::new(vec![MetricDescriptor::new(
            "up",
            "$.healthy",
            ScrapeKind::Value,
        )]);
        let doc = json!({"healthy": true});

        let observations: Vec<_> = engine.collect(&doc).collect();
        assert_eq!(values(&observations, "up"), vec![1.0]);
    }

    #[test]
    fn test_scalar_scrape_failures_skip_descriptor() {
        let engine = ScrapeEngine::new(vec![
            MetricDescriptor::new("missing", "{.nope}", ScrapeKind::Value),
            MetricDescriptor::new("text", "{.status}", ScrapeKind::Value),
            MetricDescriptor::new("broken", "{.a[}", ScrapeKind::Value),
            MetricDescriptor::new("ok", "{.count}", ScrapeKind::Value),
        ]);
        let doc = json!({"status": "up", "count": "7"});

        let observations: Vec<_> = engine.collect(&doc).collect();
        assert_eq!(observations.len(), 2);
        assert_eq!(status_count(&observations), 1);
        assert_eq!(values(&observations, "ok"), vec![7.0]);
    }

    #[test]
    fn test_scalar_scrape_ignores_converter() {
        let mut mappings = HashMap::new();
        mappings.insert("up".to_string(), "1".to_string());
        let mut tables = HashMap::new();
        tables.insert("{.status}".to_string(), mappings);

        let engine = ScrapeEngine::new(vec![MetricDescriptor::new(
            "status",
            "{.status}",
            ScrapeKind::Value,
        )
        .with_value_converter(ValueConverter::new(tables))]);
        let doc = json!({"status": "up"});

        assert_eq!(engine.collect(&doc).count(), 1);
    }

    #[test]
    fn test_object_scrape_document_order() {
        let engine = ScrapeEngine::new(vec![MetricDescriptor::new(
            "value",
            "{.values[*]}",
            ScrapeKind::Object {
                value_path: "{.count}".to_string(),
            },
        )
        .with_label("id", "{.id}")]);
        let doc = json!({
            "values": [
                {"id": "id-A", "count": 1},
                {"id": "id-B", "count": 2},
                {"id": "id-C", "count": 3}
            ]
        });

        let observations: Vec<_> = engine.collect(&doc).collect();
        assert_eq!(values(&observations, "value"), vec![1.0, 2.0, 3.0]);
        let ids: Vec<_> = observations[1..].iter().map(|o| o.labels[0].as_str()).collect();
        assert_eq!(ids, vec!["id-A", "id-B", "id-C"]);
    }

    #[test]
    fn test_object_scrape_skips_failing_element() {
        let engine = ScrapeEngine::new(vec![MetricDescriptor::new(
            "value",
            "{.values}",
            ScrapeKind::Object {
                value_path: "{.count}".to_string(),
            },
        )]);
        let doc = json!({
            "values": [{"count": 1}, {"other": 2}, {"count": 3}]
        });

        let observations: Vec<_> = engine.collect(&doc).collect();
        assert_eq!(values(&observations, "value"), vec![1.0, 3.0]);
    }

    #[test]
    fn test_object_scrape_scalar_or_missing_key_path() {
        let engine = ScrapeEngine::new(vec![
            MetricDescriptor::new(
                "scalar_as_object",
                "{.count}",
                ScrapeKind::Object {
                    value_path: "{.v}".to_string(),
                },
            ),
            MetricDescriptor::new(
                "missing",
                "{.nope}",
                ScrapeKind::Object {
                    value_path: "{.v}".to_string(),
                },
            ),
        ]);
        let doc = json!({"count": 1});

        let observations: Vec<_> = engine.collect(&doc).collect();
        assert_eq!(observations.len(), 1);
        assert_eq!(status_count(&observations), 1);
    }

    #[test]
    fn test_object_scrape_filter() {
        let engine = ScrapeEngine::new(vec![MetricDescriptor::new(
            "active_count",
            "{.values[?(@.state == \"ACTIVE\")]}",
            ScrapeKind::Object {
                value_path: "{.count}".to_string(),
            },
        )]);
        let doc = json!({
            "values": [
                {"state": "ACTIVE", "count": 1},
                {"state": "INACTIVE", "count": 2},
                {"state": "ACTIVE", "count": 3}
            ]
        });

        let observations: Vec<_> = engine.collect(&doc).collect();
        assert_eq!(values(&observations, "active_count"), vec![1.0, 3.0]);
    }

    #[test]
    fn test_root_anchored_label_wins_over_child() {
        let engine = ScrapeEngine::new(vec![MetricDescriptor::new(
            "value",
            "{.items}",
            ScrapeKind::Object {
                value_path: "{.v}".to_string(),
            },
        )
        .with_label("name", "{$.name}")
        .with_label("own", "{.name}")]);
        let doc = json!({
            "name": "root",
            "items": [{"name": "child", "v": 1}]
        });

        let observations: Vec<_> = engine.collect(&doc).collect();
        assert_eq!(observations[1].labels, vec!["root", "child"]);
    }

    #[test]
    fn test_value_converter_applied_to_elements() {
        let mut mappings = HashMap::new();
        mappings.insert("down".to_string(), "0".to_string());
        mappings.insert("up".to_string(), "1".to_string());
        let mut tables = HashMap::new();
        tables.insert("{.state}".to_string(), mappings);

        let engine = ScrapeEngine::new(vec![MetricDescriptor::new(
            "state",
            "{.nodes}",
            ScrapeKind::Object {
                value_path: "{.state}".to_string(),
            },
        )
        .with_value_converter(ValueConverter::new(tables))]);
        let doc = json!({
            "nodes": [{"state": "UP"}, {"state": "unknown"}, {"state": "Down"}]
        });

        let observations: Vec<_> = engine.collect(&doc).collect();
        assert_eq!(values(&observations, "state"), vec![1.0, 0.0]);
    }

    #[test]
    fn test_epoch_timestamp() {
        let engine = ScrapeEngine::new(vec![
            MetricDescriptor::new(
                "value",
                "{.items}",
                ScrapeKind::Object {
                    value_path: "{.v}".to_string(),
                },
            )
            .with_epoch_timestamp("{.ts}"),
            MetricDescriptor::new("global", "{.count}", ScrapeKind::Value)
                .with_epoch_timestamp("{$.ts}"),
            MetricDescriptor::new("broken_ts", "{.count}", ScrapeKind::Value)
                .with_epoch_timestamp("{.nope}"),
        ]);
        let doc = json!({
            "ts": 1657568506000i64,
            "count": 2,
            "items": [{"v": 1, "ts": "1657568507000"}]
        });

        let observations: Vec<_> = engine.collect(&doc).collect();
        assert_eq!(observations.len(), 4);
        assert_eq!(observations[1].timestamp, Some(1657568507000));
        assert_eq!(observations[2].timestamp, Some(1657568506000));
        // failing timestamp keeps the observation
        assert_eq!(observations[3].name(), "broken_ts");
        assert_eq!(observations[3].timestamp, None);
    }

    #[test]
    fn test_status_present_when_everything_fails() {
        let engine = ScrapeEngine::new(vec![
            MetricDescriptor::new("a", "{.x}", ScrapeKind::Value),
            MetricDescriptor::new(
                "b",
                "{.y}",
                ScrapeKind::Object {
                    value_path: "{.z}".to_string(),
                },
            ),
        ]);
        let doc = json!([1, 2, 3]);

        let observations: Vec<_> = engine.collect(&doc).collect();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].name(), EXPORTER_STATUS_NAME);
    }

    #[test]
    fn test_round_trip_items_with_root_label() {
        let engine = ScrapeEngine::new(vec![MetricDescriptor::new(
            "item_value",
            "items",
            ScrapeKind::Object {
                value_path: "v".to_string(),
            },
        )
        .with_label("status", "$.status")]);
        let doc = json!({"status": "up", "items": [{"v": "3"}, {"v": "bad"}, {"v": "5"}]});

        let observations: Vec<_> = engine.collect(&doc).collect();
        assert_eq!(status_count(&observations), 1);

        let items: Vec<_> = observations
            .iter()
            .filter(|o| o.name() == "item_value")
            .collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].value, 3.0);
        assert_eq!(items[1].value, 5.0);
        assert!(items.iter().all(|o| o.labels == vec!["up".to_string()]));
    }

    #[test]
    fn test_to_prometheus_pairs_labels() {
        let descriptor = MetricDescriptor::new("m", "{.a}", ScrapeKind::Value)
            .with_help("help text")
            .with_metric_type(MetricType::Counter)
            .with_label("x", "{.x}")
            .with_label("y", "{.y}");
        let observation = Observation {
            descriptor: &descriptor,
            value: 2.0,
            labels: vec!["1".to_string(), String::new()],
            timestamp: Some(10),
        };

        let metric = observation.to_prometheus();
        assert_eq!(metric.name, "m");
        assert_eq!(metric.metric_type, MetricType::Counter);
        assert_eq!(metric.help.as_deref(), Some("help text"));
        assert_eq!(
            metric.labels,
            vec![
                ("x".to_string(), "1".to_string()),
                ("y".to_string(), String::new())
            ]
        );
        assert_eq!(metric.timestamp, Some(10));
    }

    #[test]
    fn test_engine_is_reusable() {
        let engine = ScrapeEngine::new(vec![MetricDescriptor::new(
            "counter",
            "{.counter}",
            ScrapeKind::Value,
        )]);
        let first = json!({"counter": 1});
        let second = json!({"counter": 2});

        assert_eq!(values(&engine.collect(&first).collect::<Vec<_>>(), "counter"), vec![1.0]);
        assert_eq!(values(&engine.collect(&second).collect::<Vec<_>>(), "counter"), vec![2.0]);
    }
}
