//! Metric descriptors
//!
//! A [`MetricDescriptor`] is the immutable, validated form of one configured
//! metric mapping. Descriptors are built once per module at startup and
//! shared read-only by every probe.
//!
//! # Example
//!
//! ```ignore
//! use rjson_exporter::transformer::{MetricDescriptor, MetricType, ScrapeKind};
//!
//! let descriptor = MetricDescriptor::new(
//!     "example_value",
//!     "{.values[*]}",
//!     ScrapeKind::Object { value_path: "{.count}".to_string() },
//! )
//! .with_help("Example of sub-level value scrapes")
//! .with_metric_type(MetricType::Counter)
//! .with_label("id", "{.id}");
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::value::ValueConverter;
use crate::config::{MetricConfig, ModuleConfig};

/// Prometheus metric type
///
/// Only affects how an observation is exposed, never how it is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricType {
    /// Gauge metric - a value that can go up and down
    Gauge,
    /// Counter metric - a monotonically increasing value
    Counter,
    /// Untyped metric - type is not specified
    #[default]
    Untyped,
}

impl MetricType {
    /// Returns the Prometheus type string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Counter => "counter",
            MetricType::Untyped => "untyped",
        }
    }

    /// Parse a configured type name, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gauge" => Some(MetricType::Gauge),
            "counter" => Some(MetricType::Counter),
            "untyped" => Some(MetricType::Untyped),
            _ => None,
        }
    }
}

impl Serialize for MetricType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MetricType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        MetricType::parse(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "unknown metric type '{}', expected one of: gauge, counter, untyped",
                s
            ))
        })
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a descriptor's key path is used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeKind {
    /// Key path locates the value directly in the root document
    Value,
    /// Key path locates an array; `value_path` is evaluated per element
    Object { value_path: String },
}

impl ScrapeKind {
    /// Configuration name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeKind::Value => "value",
            ScrapeKind::Object { .. } => "object",
        }
    }
}

/// Immutable per-metric mapping
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    name: String,
    help: String,
    kind: ScrapeKind,
    key_path: String,
    label_names: Vec<String>,
    label_paths: Vec<String>,
    metric_type: MetricType,
    value_converter: ValueConverter,
    epoch_timestamp_path: Option<String>,
}

impl MetricDescriptor {
    /// Create a descriptor with no labels; help defaults to the name
    pub fn new(name: impl Into<String>, key_path: impl Into<String>, kind: ScrapeKind) -> Self {
        let name = name.into();
        Self {
            help: name.clone(),
            name,
            kind,
            key_path: key_path.into(),
            label_names: Vec::new(),
            label_paths: Vec::new(),
            metric_type: MetricType::Untyped,
            value_converter: ValueConverter::default(),
            epoch_timestamp_path: None,
        }
    }

    /// Set help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Append a label; names and paths always stay aligned
    pub fn with_label(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.label_names.push(name.into());
        self.label_paths.push(path.into());
        self
    }

    /// Set the exposed metric type
    pub fn with_metric_type(mut self, metric_type: MetricType) -> Self {
        self.metric_type = metric_type;
        self
    }

    /// Set value remapping tables
    pub fn with_value_converter(mut self, converter: ValueConverter) -> Self {
        self.value_converter = converter;
        self
    }

    /// Set the epoch timestamp path
    pub fn with_epoch_timestamp(mut self, path: impl Into<String>) -> Self {
        self.epoch_timestamp_path = Some(path.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn kind(&self) -> &ScrapeKind {
        &self.kind
    }

    pub fn key_path(&self) -> &str {
        &self.key_path
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    pub fn label_paths(&self) -> &[String] {
        &self.label_paths
    }

    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    pub fn value_converter(&self) -> &ValueConverter {
        &self.value_converter
    }

    pub fn epoch_timestamp_path(&self) -> Option<&str> {
        self.epoch_timestamp_path.as_deref()
    }

    /// Build a descriptor from a configured mapping
    ///
    /// Returns `None`, after logging, when the scrape type is not recognized
    /// or an object scrape lacks a value path. Unknown metric types fall
    /// back to untyped.
    pub fn from_config(metric: &MetricConfig) -> Option<Self> {
        let kind = match metric.r#type.to_lowercase().as_str() {
            "value" => ScrapeKind::Value,
            "object" => match metric.value_path {
                Some(ref value_path) => ScrapeKind::Object {
                    value_path: value_path.clone(),
                },
                None => {
                    tracing::error!(
                        metric = %metric.name,
                        "Object scrape without value_path; skipping metric"
                    );
                    return None;
                }
            },
            _ => {
                tracing::error!(
                    metric = %metric.name,
                    scrape_type = %metric.r#type,
                    "Unknown scrape config type; skipping metric"
                );
                return None;
            }
        };

        let metric_type = MetricType::parse(&metric.valuetype).unwrap_or_else(|| {
            tracing::warn!(
                metric = %metric.name,
                value_type = %metric.valuetype,
                "Unknown metric type; defaulting to untyped"
            );
            MetricType::Untyped
        });

        let mut descriptor = MetricDescriptor::new(&metric.name, &metric.path, kind)
            .with_metric_type(metric_type)
            .with_value_converter(ValueConverter::new(metric.value_converter.clone()));

        if let Some(ref help) = metric.help {
            descriptor = descriptor.with_help(help);
        }

        for (name, path) in &metric.labels {
            descriptor = descriptor.with_label(name, path);
        }

        if let Some(ref path) = metric.epoch_timestamp {
            descriptor = descriptor.with_epoch_timestamp(path);
        }

        Some(descriptor)
    }
}

/// Build every usable descriptor of a module, in configured order
pub fn descriptors_from_module(module: &ModuleConfig) -> Vec<MetricDescriptor> {
    module
        .metrics
        .iter()
        .filter_map(MetricDescriptor::from_config)
        .collect()
}
