//! Prometheus Exposition Format output
//!
//! Renders observations into the text exposition format (version 0.0.4).
//!
//! ```text
//! # HELP <metric_name> <help_text>
//! # TYPE <metric_name> <type>
//! <metric_name>{<label1>="<value1>",<label2>="<value2>"} <value> [<timestamp>]
//! ```

use std::collections::HashMap;
use std::fmt::Write;

use super::descriptor::MetricType;

/// A single Prometheus metric ready for output
#[derive(Debug, Clone, PartialEq)]
pub struct PrometheusMetric {
    /// Metric name
    pub name: String,
    /// Metric type (gauge, counter, untyped)
    pub metric_type: MetricType,
    /// Help text
    pub help: Option<String>,
    /// Label pairs in declared order
    pub labels: Vec<(String, String)>,
    /// Metric value
    pub value: f64,
    /// Optional timestamp (milliseconds since epoch)
    pub timestamp: Option<i64>,
}

impl PrometheusMetric {
    /// Create a new metric
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            metric_type: MetricType::Untyped,
            help: None,
            labels: Vec::new(),
            value,
            timestamp: None,
        }
    }

    /// Set the metric type
    pub fn with_type(mut self, metric_type: MetricType) -> Self {
        self.metric_type = metric_type;
        self
    }

    /// Set help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self
    }

    /// Set timestamp
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Prometheus exposition format formatter
///
/// # Example
///
/// ```ignore
/// use rjson_exporter::transformer::{MetricType, PrometheusFormatter, PrometheusMetric};
///
/// let metrics = vec![
///     PrometheusMetric::new("example_global_value", 1234.0)
///         .with_type(MetricType::Gauge)
///         .with_help("Example of a top-level global value scrape in the json"),
/// ];
///
/// let output = PrometheusFormatter::new().format(&metrics);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PrometheusFormatter {
    /// Include timestamp in output
    include_timestamp: bool,
}

impl PrometheusFormatter {
    /// Create a new formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to include timestamps in output
    pub fn with_timestamps(mut self, include: bool) -> Self {
        self.include_timestamp = include;
        self
    }

    /// Format metrics into Prometheus exposition format
    ///
    /// HELP and TYPE lines are emitted once per metric name. Samples sharing
    /// a name are grouped under the position of the first one, and labels are
    /// sorted by name.
    pub fn format(&self, metrics: &[PrometheusMetric]) -> String {
        let mut output = String::with_capacity(metrics.len() * 64);

        for group in Self::group_by_name(metrics) {
            let first = group[0];

            if let Some(help) = &first.help {
                let _ = writeln!(output, "# HELP {} {}", first.name, escape_help(help));
            }
            let _ = writeln!(output, "# TYPE {} {}", first.name, first.metric_type);

            for metric in group {
                self.write_sample(&mut output, metric);
            }
        }

        output
    }

    /// Group metrics by name, preserving order of first occurrence
    fn group_by_name(metrics: &[PrometheusMetric]) -> Vec<Vec<&PrometheusMetric>> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<Vec<&PrometheusMetric>> = Vec::new();

        for metric in metrics {
            match index.get(metric.name.as_str()) {
                Some(&i) => groups[i].push(metric),
                None => {
                    index.insert(&metric.name, groups.len());
                    groups.push(vec![metric]);
                }
            }
        }

        groups
    }

    fn write_sample(&self, output: &mut String, metric: &PrometheusMetric) {
        output.push_str(&metric.name);

        if !metric.labels.is_empty() {
            let mut labels: Vec<&(String, String)> = metric.labels.iter().collect();
            labels.sort_by(|a, b| a.0.cmp(&b.0));

            output.push('{');
            for (i, (name, value)) in labels.into_iter().enumerate() {
                if i > 0 {
                    output.push(',');
                }
                let _ = write!(output, "{}=\"{}\"", name, escape_label_value(value));
            }
            output.push('}');
        }

        output.push(' ');
        output.push_str(&format_value(metric.value));

        if self.include_timestamp {
            if let Some(ts) = metric.timestamp {
                let _ = write!(output, " {}", ts);
            }
        }

        output.push('\n');
    }
}

/// Format a sample value
///
/// Integral values below 1e15 are printed without a fractional part.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let inf = if value.is_sign_positive() { "+Inf" } else { "-Inf" };
        inf.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Escapes backslash and newline
fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Escapes backslash, double-quote and newline
fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}
