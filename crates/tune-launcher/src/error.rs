//! Error types for the launcher.

use thiserror::Error;

pub type LaunchResult<T> = std::result::Result<T, LaunchError>;

#[derive(Debug, Error)]
pub enum LaunchError {
    /// Neither `dataset` nor `custom_train_dataset_path` survived resolution.
    #[error("{0}")]
    NoDataset(String),

    /// The argument validator could not determine which model to train.
    #[error("missing model: please set --model")]
    MissingModel,

    #[error("invalid training arguments: {0}")]
    InvalidArgs(String),

    /// More than one device was selected and one of them is `cpu`.
    #[error("cpu cannot be combined with other devices: {0}")]
    MixedDevices(String),

    #[error("ddp_num must be a positive integer, got {0}")]
    InvalidDdp(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("process error: {0}")]
    Process(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
