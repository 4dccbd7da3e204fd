//! Integration tests for the `catwalk predict` command.

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
fn test_predict_linear_model() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);

    let mut cmd = Command::cargo_bin("catwalk").unwrap();
    let assert = cmd
        .arg("--config")
        .arg(&config)
        .arg("predict")
        .arg("scorer")
        .arg("--input")
        .arg(r#"{"data": [1.0, 1.0]}"#)
        .arg("--json")
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["model_id"], "scorer");
    assert_eq!(json["version"], "1.0.0");
    assert_eq!(json["output"]["output"], 3.0);
}

#[test]
fn test_predict_raw_model_human_output() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);

    let mut cmd = Command::cargo_bin("catwalk").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .arg("predict")
        .arg("blob")
        .assert()
        .success()
        .stdout(predicate::str::contains("Prediction"))
        .stdout(predicate::str::contains("\"size_bytes\": 64"));
}

#[test]
fn test_predict_dimension_mismatch_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);

    let mut cmd = Command::cargo_bin("catwalk").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .arg("predict")
        .arg("scorer")
        .arg("--input")
        .arg(r#"{"data": [1.0]}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("prediction with model 'scorer' failed"));
}

#[test]
fn test_predict_unknown_model_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);

    let mut cmd = Command::cargo_bin("catwalk").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .arg("predict")
        .arg("ghost")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Model not found: ghost"));
}

#[test]
fn test_predict_rejects_invalid_json_input() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);

    let mut cmd = Command::cargo_bin("catwalk").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .arg("predict")
        .arg("scorer")
        .arg("--input")
        .arg("not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("input is not valid JSON"));
}
