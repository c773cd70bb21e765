//! GPT-style decoder implementation shared by most causal LM families.

mod config;
mod convert;
mod model;

pub use config::{convert_gpt_hf_config, MegatronConfig};
pub use convert::{convert_hf2mcore, convert_mcore2hf, ConversionPlan, ConversionRequest};
pub use model::{model_provider, LayerSpec, ProviderSpec};

use crate::constant::{MegatronModelType, ModelType};
use crate::error::MegatronResult;
use crate::register::{register_megatron_model, MegatronModelMeta, RegistryBuilder};

/// Model types served by the GPT implementation.
pub const MODEL_TYPES: &[&str] = &[
    ModelType::QWEN2,
    ModelType::QWEN2_5,
    ModelType::QWQ,
    ModelType::QWQ_PREVIEW,
    ModelType::QWEN2_5_MATH,
    ModelType::LLAMA,
    ModelType::LLAMA3,
    ModelType::LLAMA3_1,
    ModelType::LLAMA3_2,
    ModelType::LONGWRITER_LLAMA3_1,
    ModelType::CODEFUSE_CODELLAMA,
    ModelType::MARCO_O1,
    ModelType::DEEPSEEK,
    ModelType::DEEPSEEK_R1_DISTILL,
    ModelType::YI,
    ModelType::YI_CODER,
    ModelType::SUS,
    ModelType::SKYWORK_O1,
    ModelType::OPENBUDDY_LLAMA,
    ModelType::OPENBUDDY_LLAMA3,
    ModelType::MEGREZ,
    ModelType::REFLECTION,
    ModelType::NUMINA,
    ModelType::ZIYA,
    ModelType::MENGZI3,
    ModelType::QWEN3,
    ModelType::QWEN2_MOE,
    ModelType::QWEN3_MOE,
    ModelType::INTERNLM3,
    ModelType::MIMO,
    ModelType::MIMO_RL,
    ModelType::MOONLIGHT,
    ModelType::DEEPSEEK_MOE,
    ModelType::DEEPSEEK_V2,
    ModelType::DEEPSEEK_V2_5,
    ModelType::DEEPSEEK_R1,
    ModelType::DOTS1,
    ModelType::ERNIE,
    ModelType::GLM4_5,
];

#[must_use]
pub fn meta() -> MegatronModelMeta {
    MegatronModelMeta {
        megatron_model_type: MegatronModelType::GPT,
        model_types: MODEL_TYPES.to_vec(),
        model_provider,
        convert_hf_config: convert_gpt_hf_config,
        convert_mcore2hf,
        convert_hf2mcore,
    }
}

/// Register the GPT family.
pub fn register(builder: &mut RegistryBuilder) -> MegatronResult<()> {
    register_megatron_model(builder, meta())
}
