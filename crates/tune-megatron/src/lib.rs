//! Megatron model registry.
//!
//! Maps pretrained model types onto the Megatron implementation that can
//! train them. Each implementation supplies four behaviors:
//!
//! - **convert_hf_config**: HuggingFace `config.json` to Megatron arguments
//! - **convert_hf2mcore** / **convert_mcore2hf**: checkpoint conversion plans
//! - **model_provider**: layer spec and parameter layout for a config
//!
//! # Example
//!
//! ```rust
//! use tune_megatron::{default_registry, ModelType};
//!
//! let registry = default_registry().unwrap();
//! let meta = registry.get(ModelType::QWEN2_5).unwrap();
//! assert_eq!(meta.megatron_model_type, "gpt");
//! ```

pub mod constant;
pub mod error;
pub mod gpt;
pub mod register;

pub use constant::{MegatronModelType, ModelType};
pub use error::{MegatronError, MegatronResult};
pub use gpt::{ConversionPlan, ConversionRequest, LayerSpec, MegatronConfig, ProviderSpec};
pub use register::{
    global, install, register_megatron_model, MegatronModelMeta, MegatronRegistry, RegistryBuilder,
};

/// Registry with every built-in family registered.
pub fn default_registry() -> MegatronResult<MegatronRegistry> {
    let mut builder = RegistryBuilder::new();
    gpt::register(&mut builder)?;
    Ok(builder.build())
}
