//! Identifiers for Megatron implementations and the model types they serve.

/// Megatron implementation families.
pub struct MegatronModelType;

impl MegatronModelType {
    pub const GPT: &'static str = "gpt";
}

/// Model types known to the training CLI that have a Megatron implementation.
pub struct ModelType;

impl ModelType {
    pub const QWEN2: &'static str = "qwen2";
    pub const QWEN2_5: &'static str = "qwen2_5";
    pub const QWQ: &'static str = "qwq";
    pub const QWQ_PREVIEW: &'static str = "qwq_preview";
    pub const QWEN2_5_MATH: &'static str = "qwen2_5_math";
    pub const LLAMA: &'static str = "llama";
    pub const LLAMA3: &'static str = "llama3";
    pub const LLAMA3_1: &'static str = "llama3_1";
    pub const LLAMA3_2: &'static str = "llama3_2";
    pub const LONGWRITER_LLAMA3_1: &'static str = "longwriter_llama3_1";
    pub const CODEFUSE_CODELLAMA: &'static str = "codefuse_codellama";
    pub const MARCO_O1: &'static str = "marco_o1";
    pub const DEEPSEEK: &'static str = "deepseek";
    pub const DEEPSEEK_R1_DISTILL: &'static str = "deepseek_r1_distill";
    pub const YI: &'static str = "yi";
    pub const YI_CODER: &'static str = "yi_coder";
    pub const SUS: &'static str = "sus";
    pub const SKYWORK_O1: &'static str = "skywork_o1";
    pub const OPENBUDDY_LLAMA: &'static str = "openbuddy_llama";
    pub const OPENBUDDY_LLAMA3: &'static str = "openbuddy_llama3";
    pub const MEGREZ: &'static str = "megrez";
    pub const REFLECTION: &'static str = "reflection";
    pub const NUMINA: &'static str = "numina";
    pub const ZIYA: &'static str = "ziya";
    pub const MENGZI3: &'static str = "mengzi3";
    pub const QWEN3: &'static str = "qwen3";
    pub const QWEN2_MOE: &'static str = "qwen2_moe";
    pub const QWEN3_MOE: &'static str = "qwen3_moe";
    pub const INTERNLM3: &'static str = "internlm3";
    pub const MIMO: &'static str = "mimo";
    pub const MIMO_RL: &'static str = "mimo_rl";
    pub const MOONLIGHT: &'static str = "moonlight";
    pub const DEEPSEEK_MOE: &'static str = "deepseek_moe";
    pub const DEEPSEEK_V2: &'static str = "deepseek_v2";
    pub const DEEPSEEK_V2_5: &'static str = "deepseek_v2_5";
    pub const DEEPSEEK_R1: &'static str = "deepseek_r1";
    pub const DOTS1: &'static str = "dots1";
    pub const ERNIE: &'static str = "ernie";
    pub const GLM4_5: &'static str = "glm4_5";
}
