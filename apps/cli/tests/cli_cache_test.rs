//! Integration tests for the `tune cache` and `tune runs` commands.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tune(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tune").unwrap();
    cmd.current_dir(temp.path())
        .env("HOME", temp.path())
        .env("TUNE_CACHE_DIR", temp.path().join("cache"))
        .env("MAX_LOG_LINES", "2");
    cmd
}

#[test]
fn test_cache_list_empty() {
    let temp = TempDir::new().unwrap();
    let assert = tune(&temp).args(["cache", "list", "Qwen/Qwen2.5-7B", "--json"]).assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json, serde_json::json!([]));
}

#[test]
fn test_cache_show_without_records_fails() {
    let temp = TempDir::new().unwrap();
    tune(&temp)
        .args(["cache", "show", "Qwen/Qwen2.5-7B"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No cached submissions"));
}

#[test]
fn test_runs_lists_and_tails() {
    let temp = TempDir::new().unwrap();
    let runs = temp.path().join("output").join("v0-20240101-000000").join("runs");
    std::fs::create_dir_all(&runs).unwrap();
    std::fs::write(runs.join("run.log"), "log-line-1\nlog-line-2\nlog-line-3\n").unwrap();

    tune(&temp)
        .args(["runs", "--tail"])
        .assert()
        .success()
        .stdout(predicate::str::contains("v0-20240101-000000"))
        .stdout(predicate::str::contains("log-line-3"))
        .stdout(predicate::str::contains("log-line-1").not());
}

#[test]
fn test_runs_missing_dir_is_empty() {
    let temp = TempDir::new().unwrap();
    tune(&temp).args(["runs", "nowhere"]).assert().success().stdout(predicate::str::contains("No runs found"));
}
