//! Smoke tests for the labprobe CLI
//!
//! Runs the binary end to end. Suites execute on the in-memory lab fixture
//! (`--driver mock`), so no browser or JupyterLab server is needed.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the labprobe binary with a clean environment
fn labprobe() -> Command {
    let mut cmd = Command::cargo_bin("labprobe").expect("labprobe binary should exist");
    cmd.env_remove("LABPROBE_URL")
        .env_remove("LABPROBE_TIMEOUT_MS")
        .env_remove("LABPROBE_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

const FAILING_SUITE: &str = r##"
name: broken
tests:
  - name: clicks a missing tab
    expected_assertions: 1
    steps:
      - click: { css: "#missing" }
"##;

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    labprobe()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.2.0"));
}

#[test]
fn test_help_flag() {
    labprobe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("JupyterLab"))
        .stdout(predicate::str::contains("test"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_no_args_shows_help() {
    labprobe().assert().failure(); // Requires a subcommand
}

#[test]
fn test_test_subcommand_help() {
    labprobe()
        .args(["test", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--settle-ms"))
        .stdout(predicate::str::contains("--ready-expr"));
}

// ============================================================================
// list / config
// ============================================================================

#[test]
fn test_list_builtin_suite() {
    labprobe()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("JupyterLab"))
        .stdout(predicate::str::contains("should show a 'Data Explorer' tab"))
        .stdout(predicate::str::contains("should show a 'Data Browser' tab"));
}

#[test]
fn test_list_json() {
    let output = labprobe().args(["list", "--format", "json"]).output().unwrap();
    assert!(output.status.success());
    let suite: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(suite["tests"].as_array().unwrap().len(), 2);
    assert_eq!(suite["tests"][0]["expected_assertions"], 2);
}

#[test]
fn test_config_defaults() {
    labprobe()
        .args(["config", "--defaults"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://localhost:8080/lab?reset"))
        .stdout(predicate::str::contains("timeout_ms: 15000"));
}

#[test]
fn test_config_env_override() {
    labprobe()
        .arg("config")
        .env("LABPROBE_URL", "http://lab.ci:8888/lab?reset")
        .assert()
        .success()
        .stdout(predicate::str::contains("http://lab.ci:8888/lab?reset"));
}

#[test]
fn test_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("labprobe.yaml");
    fs::write(&path, "settle:\n  strategy: fixed\n  ms: 3000\n").unwrap();
    labprobe()
        .args(["config", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("strategy: fixed"));
}

// ============================================================================
// test
// ============================================================================

#[test]
fn test_mock_run_passes() {
    labprobe()
        .args(["test", "--driver", "mock", "--color", "never"])
        .assert()
        .success()
        .stderr(predicate::str::contains("PASS should show a 'Data Explorer' tab"))
        .stderr(predicate::str::contains("PASSED 2 tests"));
}

#[test]
fn test_mock_run_json() {
    let output = labprobe()
        .args(["test", "--driver", "mock", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let results: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(results["suite_name"], "JupyterLab");
    assert_eq!(results["results"][1]["status"], "passed");
    assert_eq!(results["results"][1]["assertions"], 2);
}

#[test]
fn test_mock_run_filter() {
    let output = labprobe()
        .args(["test", "--driver", "mock", "--format", "json", "--filter", "Browser"])
        .output()
        .unwrap();
    let results: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(results["results"].as_array().unwrap().len(), 1);
}

#[test]
fn test_failing_suite_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let suite = dir.path().join("broken.yaml");
    fs::write(&suite, FAILING_SUITE).unwrap();
    let shots = dir.path().join("shots");

    labprobe()
        .args(["test", "--driver", "mock", "--color", "never", "--timeout-ms", "200"])
        .arg("--suite")
        .arg(&suite)
        .arg("--screenshot-dir")
        .arg(&shots)
        .assert()
        .failure()
        .stderr(predicate::str::contains("FAIL clicks a missing tab"))
        .stderr(predicate::str::contains("FAILED 1 tests"));

    assert!(shots.join("clicks_a_missing_tab.png").exists());
}

#[test]
fn test_list_custom_suite_keeps_hash_selector() {
    let dir = TempDir::new().unwrap();
    let suite = dir.path().join("broken.yaml");
    fs::write(&suite, FAILING_SUITE).unwrap();

    let output = labprobe()
        .args(["list", "--format", "json", "--suite"])
        .arg(&suite)
        .output()
        .unwrap();
    assert!(output.status.success());
    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listed["name"], "broken");
    assert_eq!(listed["tests"][0]["steps"][0]["click"]["css"], "#missing");
}

#[test]
fn test_invalid_url_rejected() {
    labprobe()
        .args(["test", "--driver", "mock", "--url", "file:///tmp/lab.html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("base_url"));
}

#[test]
fn test_bad_env_timeout_rejected() {
    labprobe()
        .args(["test", "--driver", "mock"])
        .env("LABPROBE_TIMEOUT_MS", "soon")
        .assert()
        .failure()
        .stderr(predicate::str::contains("LABPROBE_TIMEOUT_MS"));
}
