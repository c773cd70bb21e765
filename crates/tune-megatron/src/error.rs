use thiserror::Error;

pub type MegatronResult<T> = std::result::Result<T, MegatronError>;

#[derive(Debug, Error)]
pub enum MegatronError {
    #[error("megatron model type already registered: {0}")]
    DuplicateFamily(String),

    #[error("model type {model_type} is already served by {family}")]
    DuplicateModelType { model_type: String, family: String },

    #[error("the process-wide megatron registry is already installed")]
    AlreadyInstalled,

    #[error("model type not supported by megatron: {0}")]
    UnsupportedModelType(String),

    #[error("config conversion error: {0}")]
    Config(String),

    #[error("checkpoint conversion error: {0}")]
    Conversion(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
