//! CLI argument parsing for rJSON-Exporter
//!
//! This module provides the command-line interface using clap derive macros.
//!
//! # Options
//!
//! - `--config` / `-c`: Configuration file path (default: config.yml, env: RJSON_CONFIG)
//! - `--port` / `-p`: Server port (overrides config file, env: RJSON_PORT)
//! - `--bind-address`: Server bind address (env: RJSON_BIND_ADDRESS)
//! - `--metrics-path`: Self-metrics endpoint path (env: RJSON_METRICS_PATH)
//! - `--timeout-seconds`: Target fetch timeout (env: RJSON_TIMEOUT_SECONDS)
//! - `--tls-cert-file`: Path to TLS certificate file (env: RJSON_TLS_CERT_FILE)
//! - `--tls-key-file`: Path to TLS private key file (env: RJSON_TLS_KEY_FILE)
//! - `--validate`: Validate configuration without starting server
//! - `--dry-run`: Load configuration and show the resulting modules
//! - `--log-level` / `-l`: Log level (env: RJSON_LOG_LEVEL)
//! - `--log-format`: Log format, text or json (env: RJSON_LOG_FORMAT)
//! - `--output-format`: Output format for validate/dry-run (text/json/yaml)
//!
//! # Precedence
//!
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// rJSON-Exporter - Prometheus exporter for arbitrary JSON endpoints
///
/// Fetches a JSON document from the probed target and turns it into
/// Prometheus metrics using JSONPath mappings from the configuration file.
#[derive(Parser, Debug)]
#[command(name = "rjson-exporter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.yml",
        env = "RJSON_CONFIG"
    )]
    pub config: PathBuf,

    /// Server port (overrides config file)
    #[arg(short, long, value_name = "PORT", env = "RJSON_PORT")]
    pub port: Option<u16>,

    /// Server bind address (overrides config file)
    #[arg(long, value_name = "ADDRESS", env = "RJSON_BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// Self-metrics endpoint path (overrides config file)
    /// Must start with '/' and not conflict with '/', '/health' or '/probe'
    #[arg(long, value_name = "PATH", env = "RJSON_METRICS_PATH")]
    pub metrics_path: Option<String>,

    /// Target fetch timeout in seconds (overrides config file)
    #[arg(long, value_name = "SECONDS", env = "RJSON_TIMEOUT_SECONDS")]
    pub timeout_seconds: Option<u64>,

    /// Path to TLS certificate file in PEM format (overrides config file)
    #[arg(long, value_name = "FILE", env = "RJSON_TLS_CERT_FILE")]
    pub tls_cert_file: Option<String>,

    /// Path to TLS private key file in PEM format (overrides config file)
    #[arg(long, value_name = "FILE", env = "RJSON_TLS_KEY_FILE")]
    pub tls_key_file: Option<String>,

    /// Validate configuration without starting server
    #[arg(long)]
    pub validate: bool,

    /// Load configuration and show the resulting modules and metrics
    #[arg(long)]
    pub dry_run: bool,

    /// Log level
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        env = "RJSON_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "text", env = "RJSON_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Output format for --validate and --dry-run
    #[arg(long, value_enum, default_value = "text", env = "RJSON_OUTPUT_FORMAT")]
    pub output_format: OutputFormat,
}

/// Log level options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Trace level - most verbose
    Trace,
    /// Debug level
    Debug,
    /// Info level - default
    Info,
    /// Warn level
    Warn,
    /// Error level - least verbose
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Log record format
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Output format options for validate and dry-run modes
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}
