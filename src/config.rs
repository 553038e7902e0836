//! Configuration management for rJSON-Exporter
//!
//! Handles loading and validating configuration from YAML files.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::cli::Cli;
use crate::jsonpath::Template;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Error parsing the configuration file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Outbound request settings
    #[serde(default)]
    pub request: RequestConfig,

    /// Named scrape modules, selected with `?module=`
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleConfig>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Exporter self-metrics endpoint path
    #[serde(default = "default_metrics_path", alias = "metrics_path")]
    pub path: String,

    /// Server bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Serve over HTTPS when set
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

/// TLS certificate configuration (PEM files)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_file: String,
    pub key_file: String,
}

/// Outbound request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Fetch timeout; values below one second fall back to the default
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// One scrape module: how to fetch a target and which metrics to extract
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Extra request headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Authentication settings
    #[serde(default)]
    pub http_client: HttpClientConfig,

    /// Request body; its presence switches the request to POST
    #[serde(default)]
    pub body: Option<BodyConfig>,

    /// Accepted response codes; empty accepts any 2xx
    #[serde(default)]
    pub valid_status_codes: Vec<u16>,

    /// Metric mappings
    #[serde(default)]
    pub metrics: Vec<MetricConfig>,
}

/// Authentication for outbound requests
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpClientConfig {
    #[serde(default)]
    pub basic_auth: Option<BasicAuth>,

    #[serde(default)]
    pub bearer_token: Option<String>,
}

/// HTTP basic auth credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// Static request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyConfig {
    pub content: String,
}

/// A single metric mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricConfig {
    /// Prometheus metric name
    pub name: String,

    /// Key path: the value itself (`value`) or the array to iterate (`object`)
    pub path: String,

    /// Optional help text, defaults to the metric name
    pub help: Option<String>,

    /// Scrape type (value, object)
    #[serde(default = "default_scrape_type")]
    pub r#type: String,

    /// Metric type (gauge, counter, untyped)
    #[serde(default = "default_value_type", alias = "value_type")]
    pub valuetype: String,

    /// Label name to path expression
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// Value path inside each element, object scrapes only
    #[serde(default, alias = "valuepath")]
    pub value_path: Option<String>,

    /// Value path to (extracted value to replacement) tables
    #[serde(
        default,
        alias = "valueconverter",
        deserialize_with = "deserialize_value_converter"
    )]
    pub value_converter: HashMap<String, HashMap<String, String>>,

    /// Path to a Unix epoch timestamp in milliseconds
    #[serde(default, alias = "epochTimestamp")]
    pub epoch_timestamp: Option<String>,
}

/// Accept numbers and booleans as replacement values (`ACTIVE: 1`)
fn deserialize_value_converter<'de, D>(
    deserializer: D,
) -> Result<HashMap<String, HashMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: HashMap<String, HashMap<String, serde_yaml::Value>> =
        HashMap::deserialize(deserializer)?;

    raw.into_iter()
        .map(|(path, mappings)| {
            let mappings = mappings
                .into_iter()
                .map(|(from, to)| {
                    let to = match to {
                        serde_yaml::Value::String(s) => s,
                        serde_yaml::Value::Number(n) => n.to_string(),
                        serde_yaml::Value::Bool(b) => b.to_string(),
                        other => {
                            return Err(<D::Error as serde::de::Error>::custom(format!(
                                "value_converter replacement for '{}' must be a scalar, got {:?}",
                                from, other
                            )))
                        }
                    };
                    Ok((from, to))
                })
                .collect::<Result<HashMap<_, _>, D::Error>>()?;
            Ok((path, mappings))
        })
        .collect()
}

// Default value functions
fn default_port() -> u16 {
    7979
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_scrape_type() -> String {
    "value".to_string()
}

fn default_value_type() -> String {
    "untyped".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            path: default_metrics_path(),
            bind_address: default_bind_address(),
            tls: None,
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl RequestConfig {
    /// Effective fetch timeout
    pub fn timeout(&self) -> Duration {
        if self.timeout_seconds < 1 {
            Duration::from_secs(default_timeout_seconds())
        } else {
            Duration::from_secs(self.timeout_seconds)
        }
    }
}

/// Endpoints served by the exporter itself
const RESERVED_PATHS: &[&str] = &["/", "/health", "/probe"];

static METRIC_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$").expect("invalid metric name regex"));

static LABEL_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("invalid label name regex"));

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, falling back to defaults if not found
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load(path)
    }

    /// Apply command-line overrides on top of file values
    pub fn with_cli_overrides(mut self, cli: &Cli) -> Self {
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(ref bind_address) = cli.bind_address {
            self.server.bind_address = bind_address.clone();
        }
        if let Some(ref path) = cli.metrics_path {
            self.server.path = path.clone();
        }
        if let Some(timeout) = cli.timeout_seconds {
            self.request.timeout_seconds = timeout;
        }
        match (&cli.tls_cert_file, &cli.tls_key_file) {
            (Some(cert_file), Some(key_file)) => {
                self.server.tls = Some(TlsConfig {
                    cert_file: cert_file.clone(),
                    key_file: key_file.clone(),
                });
            }
            (Some(cert_file), None) => {
                if let Some(ref mut tls) = self.server.tls {
                    tls.cert_file = cert_file.clone();
                }
            }
            (None, Some(key_file)) => {
                if let Some(ref mut tls) = self.server.tls {
                    tls.key_file = key_file.clone();
                }
            }
            (None, None) => {}
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if !self.server.path.starts_with('/') {
            return Err(ConfigError::ValidationError(
                "Metrics path must start with '/'".to_string(),
            ));
        }

        if RESERVED_PATHS.contains(&self.server.path.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Metrics path '{}' conflicts with a built-in endpoint",
                self.server.path
            )));
        }

        if let Some(ref tls) = self.server.tls {
            if tls.cert_file.is_empty() || tls.key_file.is_empty() {
                return Err(ConfigError::ValidationError(
                    "TLS requires both cert_file and key_file".to_string(),
                ));
            }
        }

        for (module_name, module) in &self.modules {
            for metric in &module.metrics {
                validate_metric(metric).map_err(|reason| {
                    ConfigError::ValidationError(format!(
                        "module '{}', metric '{}': {}",
                        module_name, metric.name, reason
                    ))
                })?;
            }
        }

        Ok(())
    }
}

fn validate_metric(metric: &MetricConfig) -> Result<(), String> {
    if !METRIC_NAME_RE.is_match(&metric.name) {
        return Err("invalid metric name".to_string());
    }

    for name in metric.labels.keys() {
        if !LABEL_NAME_RE.is_match(name) {
            return Err(format!("invalid label name '{}'", name));
        }
    }

    if metric.r#type.eq_ignore_ascii_case("object") && metric.value_path.is_none() {
        return Err("object scrapes require value_path".to_string());
    }

    let paths = std::iter::once(&metric.path)
        .chain(metric.value_path.iter())
        .chain(metric.labels.values())
        .chain(metric.epoch_timestamp.iter());

    for path in paths {
        Template::parse(path).map_err(|e| e.to_string())?;
    }

    Ok(())
}
