//! Metric extraction module
//!
//! This module turns fetched JSON documents into Prometheus observations
//! based on configured metric mappings.

pub mod descriptor;
pub mod engine;
pub mod formatter;
pub mod labels;
pub mod value;

pub use descriptor::{descriptors_from_module, MetricDescriptor, MetricType, ScrapeKind};
pub use engine::{Observation, ScrapeEngine, EXPORTER_STATUS_NAME};
pub use formatter::{PrometheusFormatter, PrometheusMetric};
pub use labels::{is_root_anchored, resolve_labels, Scopes};
pub use value::{sanitize_int_value, sanitize_value, ValueConverter};
