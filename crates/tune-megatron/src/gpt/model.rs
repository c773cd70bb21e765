use super::config::MegatronConfig;
use crate::error::{MegatronError, MegatronResult};
use serde::Serialize;
use tracing::debug;

/// Transformer layer flavour selected for a config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSpec {
    Dense,
    Moe,
}

/// What the provider would build: layer flavour and parameter layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSpec {
    pub layer_spec: LayerSpec,
    pub num_layers: u64,
    pub embedding_params: u64,
    pub attention_params_per_layer: u64,
    pub mlp_params_per_layer: u64,
    pub total_params: u64,
}

fn overflow() -> MegatronError {
    MegatronError::Config("parameter count overflows u64".to_string())
}

fn mul(a: u64, b: u64) -> MegatronResult<u64> {
    a.checked_mul(b).ok_or_else(overflow)
}

fn add(a: u64, b: u64) -> MegatronResult<u64> {
    a.checked_add(b).ok_or_else(overflow)
}

fn mlp_params(hidden: u64, ffn: u64, swiglu: bool) -> MegatronResult<u64> {
    let projections = if swiglu { 3 } else { 2 };
    mul(mul(projections, hidden)?, ffn)
}

/// Describe the GPT model for `config`.
///
/// Configs whose parameter count does not fit in a `u64` are rejected.
pub fn model_provider(config: &MegatronConfig) -> MegatronResult<ProviderSpec> {
    let hidden = config.hidden_size;
    if config.num_layers == 0 || hidden == 0 {
        return Err(MegatronError::Config("num_layers and hidden_size must be positive".to_string()));
    }

    let kv_dim = mul(config.kv_channels(), config.num_query_groups)?;
    let qkv_width = add(hidden, mul(2, kv_dim)?)?;
    let mut attention = add(mul(hidden, qkv_width)?, mul(hidden, hidden)?)?;
    if config.add_qkv_bias {
        attention = add(attention, qkv_width)?;
    }

    let (layer_spec, mlp) = match config.num_experts.filter(|n| *n > 0) {
        Some(experts) => {
            let expert_ffn = config.moe_ffn_hidden_size.unwrap_or(config.ffn_hidden_size);
            let router = mul(hidden, experts)?;
            let expert_params = mul(experts, mlp_params(hidden, expert_ffn, config.swiglu)?)?;
            (LayerSpec::Moe, add(expert_params, router)?)
        }
        None => (LayerSpec::Dense, mlp_params(hidden, config.ffn_hidden_size, config.swiglu)?),
    };

    let copies = if config.untie_embeddings_and_output_weights { 2 } else { 1 };
    let embeddings = mul(mul(copies, config.padded_vocab_size)?, hidden)?;
    let norms = mul(2, hidden)?;
    let per_layer = add(add(attention, mlp)?, norms)?;
    let total = add(add(embeddings, mul(config.num_layers, per_layer)?)?, hidden)?;

    debug!(layer_spec = ?layer_spec, total_params = total, "Built provider spec");
    Ok(ProviderSpec {
        layer_spec,
        num_layers: config.num_layers,
        embedding_params: embeddings,
        attention_params_per_layer: attention,
        mlp_params_per_layer: mlp,
        total_params: total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense() -> MegatronConfig {
        MegatronConfig {
            num_layers: 2,
            hidden_size: 8,
            ffn_hidden_size: 16,
            num_attention_heads: 2,
            num_query_groups: 2,
            group_query_attention: false,
            max_position_embeddings: 128,
            rotary_base: 10000.0,
            norm_epsilon: 1e-6,
            padded_vocab_size: 10,
            untie_embeddings_and_output_weights: false,
            add_qkv_bias: false,
            swiglu: true,
            num_experts: None,
            moe_router_topk: None,
            moe_ffn_hidden_size: None,
        }
    }

    #[test]
    fn test_dense_layout() {
        let spec = model_provider(&dense()).unwrap();
        assert_eq!(spec.layer_spec, LayerSpec::Dense);
        assert_eq!(spec.embedding_params, 80);
        assert_eq!(spec.attention_params_per_layer, 8 * 24 + 64);
        assert_eq!(spec.mlp_params_per_layer, 3 * 8 * 16);
        assert_eq!(spec.total_params, 80 + 2 * (256 + 384 + 16) + 8);
    }

    #[test]
    fn test_moe_layout() {
        let config = MegatronConfig {
            num_experts: Some(4),
            moe_router_topk: Some(2),
            moe_ffn_hidden_size: Some(4),
            ..dense()
        };
        let spec = model_provider(&config).unwrap();
        assert_eq!(spec.layer_spec, LayerSpec::Moe);
        assert_eq!(spec.mlp_params_per_layer, 4 * 3 * 8 * 4 + 8 * 4);
    }

    #[test]
    fn test_untied_embeddings_double() {
        let config = MegatronConfig { untie_embeddings_and_output_weights: true, ..dense() };
        assert_eq!(model_provider(&config).unwrap().embedding_params, 160);
    }

    #[test]
    fn test_empty_model_rejected() {
        let config = MegatronConfig { num_layers: 0, ..dense() };
        assert!(model_provider(&config).is_err());
    }

    #[test]
    fn test_oversized_config_is_an_error() {
        let config = MegatronConfig { hidden_size: 1 << 40, num_attention_heads: 1, num_query_groups: 1, ..dense() };
        let err = model_provider(&config).unwrap_err();
        assert!(matches!(err, MegatronError::Config(ref msg) if msg.contains("overflows")));
    }
}
