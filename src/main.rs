//! rJSON-Exporter - Prometheus exporter for JSON endpoints
//!
//! This binary serves `/probe?module=..&target=..`, fetching the target's
//! JSON document and exposing the configured metrics.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use rjson_exporter::cli::{Cli, OutputFormat};
use rjson_exporter::config::Config;
use rjson_exporter::metrics::internal_metrics;
use rjson_exporter::server;
use rjson_exporter::transformer::descriptors_from_module;

#[derive(Serialize)]
struct ModuleSummary {
    name: String,
    configured_metrics: usize,
    usable_metrics: usize,
    metrics: Vec<MetricSummary>,
}

#[derive(Serialize)]
struct MetricSummary {
    name: String,
    kind: String,
    metric_type: String,
    path: String,
    labels: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = rjson_exporter::init_logging(cli.log_level.as_str(), cli.log_format) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.validate || cli.dry_run {
        // explicit checks require the file to exist
        let config = Config::load(&cli.config)
            .with_context(|| format!("Failed to load {}", cli.config.display()))?
            .with_cli_overrides(&cli);
        config.validate()?;

        if cli.validate {
            print_validation(&cli, &config)?;
        } else {
            print_dry_run(cli.output_format, &config)?;
        }
        return Ok(());
    }

    let config = Config::load_or_default(&cli.config)?.with_cli_overrides(&cli);
    config.validate()?;
    internal_metrics().record_config_load();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        modules = config.modules.len(),
        "Starting rJSON-Exporter"
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime.block_on(server::run(config))
}

fn print_validation(cli: &Cli, config: &Config) -> Result<()> {
    match cli.output_format {
        OutputFormat::Text => {
            println!("Configuration OK: {}", cli.config.display());
            println!("  modules: {}", config.modules.len());
        }
        OutputFormat::Json => {
            let report = serde_json::json!({
                "valid": true,
                "config": cli.config.display().to_string(),
                "modules": config.modules.len(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Yaml => {
            println!("valid: true");
            println!("config: {}", cli.config.display());
            println!("modules: {}", config.modules.len());
        }
    }
    Ok(())
}

fn print_dry_run(format: OutputFormat, config: &Config) -> Result<()> {
    let summaries: Vec<ModuleSummary> = config
        .modules
        .iter()
        .map(|(name, module)| {
            let descriptors = descriptors_from_module(module);
            ModuleSummary {
                name: name.clone(),
                configured_metrics: module.metrics.len(),
                usable_metrics: descriptors.len(),
                metrics: descriptors
                    .iter()
                    .map(|d| MetricSummary {
                        name: d.name().to_string(),
                        kind: d.kind().as_str().to_string(),
                        metric_type: d.metric_type().to_string(),
                        path: d.key_path().to_string(),
                        labels: d.label_names().to_vec(),
                    })
                    .collect(),
            }
        })
        .collect();

    match format {
        OutputFormat::Text => {
            println!(
                "Server: {}:{} (metrics at {})",
                config.server.bind_address, config.server.port, config.server.path
            );
            for module in &summaries {
                println!(
                    "Module '{}': {}/{} metrics usable",
                    module.name, module.usable_metrics, module.configured_metrics
                );
                for metric in &module.metrics {
                    println!(
                        "  {} [{} {}] {} labels={:?}",
                        metric.name, metric.kind, metric.metric_type, metric.path, metric.labels
                    );
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&summaries)?),
    }
    Ok(())
}
