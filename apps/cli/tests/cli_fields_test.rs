//! Integration tests for the `tune fields` command.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tune(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tune").unwrap();
    cmd.current_dir(temp.path()).env("HOME", temp.path()).env("TUNE_ACCELERATOR", "cuda").env_remove("TUNE_LANG");
    cmd
}

#[test]
fn test_fields_json_lists_form_in_order() {
    let temp = TempDir::new().unwrap();
    let assert = tune(&temp).args(["fields", "--json"]).assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    let fields = json.as_array().unwrap();
    assert_eq!(fields[0]["id"], "model");
    let seed = fields.iter().find(|f| f["id"] == "seed").unwrap();
    assert_eq!(seed["default"], "42");
    let stage = fields.iter().find(|f| f["id"] == "train_stage").unwrap();
    assert_eq!(stage["choices"], serde_json::json!(["pt", "sft", "rlhf"]));
    let dataset = fields.iter().find(|f| f["id"] == "dataset").unwrap();
    assert_eq!(dataset["kind"], "list");
    assert!(fields.iter().any(|f| f["id"] == "dry_run"));
}

#[test]
fn test_fields_table_uses_language() {
    let temp = TempDir::new().unwrap();
    tune(&temp)
        .args(["--lang", "zh", "fields"])
        .assert()
        .success()
        .stdout(predicate::str::contains("随机数种子"));
}
