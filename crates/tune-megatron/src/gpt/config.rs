use crate::constant::ModelType;
use crate::error::{MegatronError, MegatronResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_ROTARY_BASE: f64 = 10000.0;
const DEFAULT_NORM_EPSILON: f64 = 1e-6;

/// Megatron model arguments derived from a HuggingFace `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MegatronConfig {
    pub num_layers: u64,
    pub hidden_size: u64,
    pub ffn_hidden_size: u64,
    pub num_attention_heads: u64,
    pub num_query_groups: u64,
    pub group_query_attention: bool,
    pub max_position_embeddings: u64,
    pub rotary_base: f64,
    pub norm_epsilon: f64,
    pub padded_vocab_size: u64,
    pub untie_embeddings_and_output_weights: bool,
    pub add_qkv_bias: bool,
    pub swiglu: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_experts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moe_router_topk: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moe_ffn_hidden_size: Option<u64>,
}

impl MegatronConfig {
    #[must_use]
    pub fn is_moe(&self) -> bool {
        self.num_experts.is_some_and(|n| n > 0)
    }

    #[must_use]
    pub fn kv_channels(&self) -> u64 {
        self.hidden_size / self.num_attention_heads.max(1)
    }
}

fn lookup<'a>(hf: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| hf.get(*k).filter(|v| !v.is_null()))
}

fn optional_u64(hf: &Value, keys: &[&str]) -> MegatronResult<Option<u64>> {
    match lookup(hf, keys) {
        None => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| MegatronError::Config(format!("{} must be a non-negative integer, got {v}", keys[0]))),
    }
}

fn required_u64(hf: &Value, keys: &[&str]) -> MegatronResult<u64> {
    optional_u64(hf, keys)?.ok_or_else(|| MegatronError::Config(format!("missing required key: {}", keys[0])))
}

fn optional_f64(hf: &Value, keys: &[&str]) -> MegatronResult<Option<f64>> {
    match lookup(hf, keys) {
        None => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| MegatronError::Config(format!("{} must be a number, got {v}", keys[0]))),
    }
}

fn optional_bool(hf: &Value, key: &str) -> MegatronResult<Option<bool>> {
    match lookup(hf, &[key]) {
        None => Ok(None),
        Some(v) => v
            .as_bool()
            .map(Some)
            .ok_or_else(|| MegatronError::Config(format!("{key} must be a boolean, got {v}"))),
    }
}

/// Qwen2 checkpoints carry q/k/v biases without declaring `attention_bias`.
fn implicit_qkv_bias(hf: &Value) -> bool {
    matches!(
        hf.get("model_type").and_then(Value::as_str),
        Some(ModelType::QWEN2 | ModelType::QWEN2_MOE)
    )
}

/// Map a HuggingFace `config.json` onto Megatron arguments.
pub fn convert_gpt_hf_config(hf: &Value) -> MegatronResult<MegatronConfig> {
    if !hf.is_object() {
        return Err(MegatronError::Config("config must be a JSON object".to_string()));
    }

    let num_layers = required_u64(hf, &["num_hidden_layers"])?;
    let hidden_size = required_u64(hf, &["hidden_size"])?;
    let num_attention_heads = required_u64(hf, &["num_attention_heads"])?;
    if num_attention_heads == 0 || hidden_size % num_attention_heads != 0 {
        return Err(MegatronError::Config(format!(
            "hidden_size {hidden_size} is not divisible by num_attention_heads {num_attention_heads}"
        )));
    }
    let num_query_groups = optional_u64(hf, &["num_key_value_heads"])?.unwrap_or(num_attention_heads);
    if num_query_groups == 0 || num_attention_heads % num_query_groups != 0 {
        return Err(MegatronError::Config(format!(
            "num_attention_heads {num_attention_heads} is not divisible by num_key_value_heads {num_query_groups}"
        )));
    }

    let num_experts = optional_u64(hf, &["num_experts", "n_routed_experts", "moe_num_experts"])?.filter(|n| *n > 0);
    let moe_ffn_hidden_size = optional_u64(hf, &["moe_intermediate_size"])?;
    let ffn_hidden_size = match optional_u64(hf, &["intermediate_size"])? {
        Some(size) => size,
        None => match (num_experts, moe_ffn_hidden_size) {
            (Some(_), Some(size)) => size,
            _ => return Err(MegatronError::Config("missing required key: intermediate_size".to_string())),
        },
    };
    let moe_router_topk = match num_experts {
        Some(_) => optional_u64(hf, &["num_experts_per_tok", "moe_k"])?,
        None => None,
    };

    let hidden_act = hf.get("hidden_act").and_then(Value::as_str).unwrap_or("silu");

    Ok(MegatronConfig {
        num_layers,
        hidden_size,
        ffn_hidden_size,
        num_attention_heads,
        num_query_groups,
        group_query_attention: num_query_groups != num_attention_heads,
        max_position_embeddings: required_u64(hf, &["max_position_embeddings"])?,
        rotary_base: optional_f64(hf, &["rope_theta"])?.unwrap_or(DEFAULT_ROTARY_BASE),
        norm_epsilon: optional_f64(hf, &["rms_norm_eps", "layer_norm_epsilon", "layer_norm_eps"])?
            .unwrap_or(DEFAULT_NORM_EPSILON),
        padded_vocab_size: required_u64(hf, &["vocab_size"])?,
        untie_embeddings_and_output_weights: !optional_bool(hf, "tie_word_embeddings")?.unwrap_or(false),
        add_qkv_bias: optional_bool(hf, "attention_bias")?.unwrap_or_else(|| implicit_qkv_bias(hf)),
        swiglu: matches!(hidden_act, "silu" | "swish"),
        num_experts,
        moe_router_topk,
        moe_ffn_hidden_size: num_experts.and(moe_ffn_hidden_size),
    })
}
