//! Integration tests for the `catwalk info` and `catwalk run` commands.

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
fn test_info_human_output() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);

    let mut cmd = Command::cargo_bin("catwalk").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .arg("info")
        .arg("blob")
        .assert()
        .success()
        .stdout(predicate::str::contains("Version: 2.0.0"))
        .stdout(predicate::str::contains("Format: raw"))
        .stdout(predicate::str::contains("Memory estimate: 4KB"));
}

#[test]
fn test_info_json_output() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);

    let mut cmd = Command::cargo_bin("catwalk").unwrap();
    let assert = cmd.arg("--config").arg(&config).arg("info").arg("scorer").arg("--json").assert().success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["id"], "scorer");
    assert_eq!(json["state"], "unloaded");
    assert_eq!(json["memory_usage"], 1024);
    assert!(json["last_used"].is_null());
    assert_eq!(json["inference"]["requests"], 0);
}

#[test]
fn test_info_unknown_model_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);

    let mut cmd = Command::cargo_bin("catwalk").unwrap();
    cmd.arg("--config").arg(&config).arg("info").arg("ghost").assert().failure();
}

#[test]
fn test_run_preloads_and_stops_after_duration() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);

    let mut cmd = Command::cargo_bin("catwalk").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .arg("run")
        .arg("--duration")
        .arg("1")
        .arg("--status-interval")
        .arg("60")
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("model(s) preloaded"))
        .stdout(predicate::str::contains("Catwalk stopped"));
}
