//! CLI integration tests
//!
//! Tests for the command-line interface using assert_cmd.
//!
//! These tests verify:
//! - Help and version flags
//! - Configuration validation
//! - Dry run mode
//! - Error handling for missing and broken files

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const VALID_CONFIG: &str = r#"
server:
  port: 19797
  path: "/metrics"

modules:
  default:
    metrics:
      - name: example_global_value
        path: "{ .counter }"
        help: Example of a top-level global value scrape in the json
        labels:
          environment: "{$.environment}"
      - name: example_value
        type: object
        path: '{.values[?(@.state == "ACTIVE")]}'
        value_path: "{.count}"
        labels:
          id: "{.id}"
      - name: odd_kind
        type: table
        path: "{.a}"
"#;

/// Get a command for the rjson-exporter binary
#[allow(deprecated)]
fn cmd() -> Command {
    let mut cmd =
        Command::cargo_bin("rjson-exporter").expect("Failed to find rjson-exporter binary");
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Helper to create a temporary config file with given content
fn create_temp_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write config");
    file.flush().expect("Failed to flush");
    file
}

#[test]
fn test_help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--timeout-seconds"))
        .stdout(predicate::str::contains("--log-format"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_validate_valid_config() {
    let file = create_temp_config(VALID_CONFIG);

    cmd()
        .arg("-c")
        .arg(file.path())
        .arg("--validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration OK"))
        .stdout(predicate::str::contains("modules: 1"));
}

#[test]
fn test_validate_json_output() {
    let file = create_temp_config(VALID_CONFIG);

    let output = cmd()
        .arg("-c")
        .arg(file.path())
        .arg("--validate")
        .arg("--output-format")
        .arg("json")
        .output()
        .expect("Failed to run binary");

    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is not JSON");
    assert_eq!(report["valid"], true);
    assert_eq!(report["modules"], 1);
}

#[test]
fn test_validate_bad_yaml() {
    let file = create_temp_config("modules: [not valid yaml\n");

    cmd()
        .arg("-c")
        .arg(file.path())
        .arg("--validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn test_validate_bad_path_expression() {
    let config = r#"
modules:
  default:
    metrics:
      - name: broken
        path: "{.values[?(@.state ==]}"
"#;
    let file = create_temp_config(config);

    cmd()
        .arg("-c")
        .arg(file.path())
        .arg("--validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken"));
}

#[test]
fn test_validate_reserved_metrics_path() {
    let file = create_temp_config(VALID_CONFIG);

    cmd()
        .arg("-c")
        .arg(file.path())
        .arg("--metrics-path")
        .arg("/probe")
        .arg("--validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("conflicts"));
}

#[test]
fn test_validate_missing_file() {
    cmd()
        .arg("-c")
        .arg("/nonexistent/path/config.yml")
        .arg("--validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load"));
}

#[test]
fn test_dry_run_json() {
    let file = create_temp_config(VALID_CONFIG);

    let output = cmd()
        .arg("-c")
        .arg(file.path())
        .arg("--dry-run")
        .arg("--output-format")
        .arg("json")
        .output()
        .expect("Failed to run binary");

    assert!(output.status.success());
    let modules: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is not JSON");

    let module = &modules[0];
    assert_eq!(module["name"], "default");
    assert_eq!(module["configured_metrics"], 3);
    assert_eq!(module["usable_metrics"], 2);
    assert_eq!(module["metrics"][0]["kind"], "value");
    assert_eq!(module["metrics"][1]["kind"], "object");
    assert_eq!(module["metrics"][1]["labels"][0], "id");
}

#[test]
fn test_dry_run_text() {
    let file = create_temp_config(VALID_CONFIG);

    cmd()
        .arg("-c")
        .arg(file.path())
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Module 'default': 2/3 metrics usable"))
        .stdout(predicate::str::contains("example_global_value [value untyped]"));
}
