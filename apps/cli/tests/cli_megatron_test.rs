//! Integration tests for the `tune megatron` commands.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tune() -> Command {
    let mut cmd = Command::cargo_bin("tune").unwrap();
    cmd.env("TUNE_CLI", "swift");
    cmd
}

#[test]
fn test_megatron_list_json() {
    let assert = tune().args(["megatron", "list", "--json"]).assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("megatron list --json should print JSON");

    let families = json.as_array().unwrap();
    assert_eq!(families.len(), 1);
    assert_eq!(families[0]["megatron_model_type"], "gpt");
    assert_eq!(families[0]["model_types"].as_array().unwrap().len(), 39);
}

#[test]
fn test_megatron_list_table() {
    tune()
        .args(["megatron", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gpt"))
        .stdout(predicate::str::contains("deepseek_r1_distill"));
}

#[test]
fn test_megatron_show() {
    tune().args(["megatron", "show", "qwen3_moe"]).assert().success().stdout(predicate::str::contains("gpt"));
    tune()
        .args(["megatron", "show", "bert"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no Megatron implementation"));
}

#[test]
fn test_megatron_convert_config() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "model_type": "qwen2",
            "hidden_size": 896,
            "intermediate_size": 4864,
            "max_position_embeddings": 32768,
            "num_attention_heads": 14,
            "num_hidden_layers": 24,
            "num_key_value_heads": 2,
            "rope_theta": 1000000.0,
            "tie_word_embeddings": true,
            "vocab_size": 151936
        }"#,
    )
    .unwrap();

    let assert = tune().args(["megatron", "convert-config"]).arg(&path).assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["megatron_model_type"], "gpt");
    assert_eq!(json["config"]["num_layers"], 24);
    assert_eq!(json["config"]["num_query_groups"], 2);
    assert_eq!(json["config"]["add_qkv_bias"], true);
    assert_eq!(json["config"]["untie_embeddings_and_output_weights"], false);
    assert_eq!(json["provider"]["layer_spec"], "dense");
}

#[test]
fn test_megatron_convert_config_missing_key() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    std::fs::write(&path, r#"{"model_type": "llama", "hidden_size": 64}"#).unwrap();
    tune()
        .args(["megatron", "convert-config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required key"));
}

#[test]
fn test_megatron_export_prints_plan() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("mcore");
    tune()
        .args(["megatron", "export", "qwen2_5", "Qwen/Qwen2.5-7B", "--torch-dtype", "bfloat16", "--output-dir"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("swift export --model Qwen/Qwen2.5-7B --to_mcore true --output_dir"))
        .stdout(predicate::str::contains("--torch_dtype bfloat16"));
}
