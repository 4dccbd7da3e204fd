//! Integration tests for the `catwalk status` command.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Writes a config with one linear and one raw model into `dir`.
fn write_config(dir: &TempDir) -> std::path::PathBuf {
    std::fs::create_dir_all(dir.path().join("models")).unwrap();
    std::fs::write(dir.path().join("models/scorer.json"), r#"{"weights": [2.0, 1.0], "bias": 0.0}"#)
        .unwrap();
    std::fs::write(dir.path().join("models/blob.bin"), vec![7_u8; 64]).unwrap();

    let config = dir.path().join("catwalk.yaml");
    std::fs::write(
        &config,
        "cache:
  max_memory: 1MB
  soft_limit: 512KB
models:
  scorer:
    path: models/scorer.json
    type: linear
    memory_estimate: 1KB
    preload: true
  blob:
    path: models/blob.bin
    type: raw
    memory_estimate: 4KB
    version: 2.0.0
",
    )
    .unwrap();
    config
}

#[test]
fn test_status_lists_configured_models() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);

    let mut cmd = Command::cargo_bin("catwalk").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Catwalk Status"))
        .stdout(predicate::str::contains("scorer"))
        .stdout(predicate::str::contains("blob"))
        .stdout(predicate::str::contains("unloaded"));
}

#[test]
fn test_status_json_after_preload() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);

    let mut cmd = Command::cargo_bin("catwalk").unwrap();
    let assert =
        cmd.arg("--config").arg(&config).arg("status").arg("--preload").arg("--json").assert().success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("Status JSON output should be valid JSON");

    assert_eq!(json["cache"]["hard_limit_bytes"], 1024 * 1024);
    assert_eq!(json["cache"]["soft_limit_bytes"], 512 * 1024);
    assert_eq!(json["cache"]["loaded_count"], 1);
    assert_eq!(json["metrics"]["loads"], 1);
    assert!(json["metrics"]["inference"].as_object().unwrap().is_empty());

    let entries = json["cache"]["entries"].as_array().unwrap();
    let scorer = entries.iter().find(|entry| entry["id"] == "scorer").unwrap();
    assert_eq!(scorer["state"], "loaded");
    assert_eq!(scorer["size_bytes"], 24);
}

#[test]
fn test_status_missing_config_fails() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("catwalk").unwrap();
    cmd.arg("--config")
        .arg(temp_dir.path().join("missing.yaml"))
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));
}

#[test]
fn test_status_invalid_limits_fail() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("catwalk.yaml");
    std::fs::write(&config, "cache:\n  max_memory: 1MB\n  soft_limit: 2MB\n").unwrap();

    let mut cmd = Command::cargo_bin("catwalk").unwrap();
    cmd.arg("--config").arg(&config).arg("status").assert().failure();
}
