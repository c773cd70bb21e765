//! Typed training arguments and their validation.

use crate::error::{LaunchError, LaunchResult};
use chrono::Local;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const TRAIN_TYPES: &[&str] = &[
    "lora", "full", "longlora", "adalora", "llamapro", "adapter", "vera", "boft", "fourierft", "reft", "bone",
];
pub const TUNER_BACKENDS: &[&str] = &["peft", "unsloth"];
pub const TORCH_DTYPES: &[&str] = &["bfloat16", "float16", "float32"];
pub const RLHF_TYPES: &[&str] = &["dpo", "orpo", "simpo", "kto", "cpo", "rm", "ppo", "grpo"];

/// Subcommand of the training CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainStage {
    Pt,
    #[default]
    Sft,
    Rlhf,
}

impl TrainStage {
    pub const ALL: [&'static str; 3] = ["pt", "sft", "rlhf"];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pt => "pt",
            Self::Sft => "sft",
            Self::Rlhf => "rlhf",
        }
    }
}

impl FromStr for TrainStage {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pt" => Ok(Self::Pt),
            "sft" => Ok(Self::Sft),
            "rlhf" => Ok(Self::Rlhf),
            other => Err(LaunchError::InvalidArgs(format!("unknown train stage: {other}"))),
        }
    }
}

impl std::fmt::Display for TrainStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated arguments for one training run.
///
/// Only the flags the launcher reasons about are typed; everything else the
/// training CLI accepts is carried through `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainArguments {
    pub model: Option<String>,
    pub model_type: Option<String>,
    pub resume_from_checkpoint: Option<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub dataset: Vec<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub custom_train_dataset_path: Vec<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub val_dataset: Vec<String>,
    pub train_type: String,
    pub tuner_backend: String,
    pub seed: i64,
    pub torch_dtype: Option<String>,
    pub use_liger_kernel: bool,
    pub learning_rate: Option<f64>,
    pub num_train_epochs: f64,
    pub per_device_train_batch_size: i64,
    pub gradient_accumulation_steps: Option<i64>,
    pub max_length: Option<i64>,
    pub lora_rank: i64,
    pub lora_alpha: i64,
    #[serde(deserialize_with = "string_or_list")]
    pub target_modules: Vec<String>,
    pub output_dir: PathBuf,
    pub logging_dir: Option<PathBuf>,
    pub deepspeed: Option<String>,
    pub rlhf_type: Option<String>,
    pub add_version: bool,
    pub ignore_args_error: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for TrainArguments {
    fn default() -> Self {
        Self {
            model: None,
            model_type: None,
            resume_from_checkpoint: None,
            dataset: Vec::new(),
            custom_train_dataset_path: Vec::new(),
            val_dataset: Vec::new(),
            train_type: "lora".to_string(),
            tuner_backend: "peft".to_string(),
            seed: 42,
            torch_dtype: None,
            use_liger_kernel: false,
            learning_rate: None,
            num_train_epochs: 3.0,
            per_device_train_batch_size: 1,
            gradient_accumulation_steps: None,
            max_length: None,
            lora_rank: 8,
            lora_alpha: 32,
            target_modules: vec!["all-linear".to_string()],
            output_dir: PathBuf::from("output"),
            logging_dir: None,
            deepspeed: None,
            rlhf_type: None,
            add_version: true,
            ignore_args_error: false,
            extra: Map::new(),
        }
    }
}

impl TrainArguments {
    /// Default value of every recognized argument, keyed by flag name.
    #[must_use]
    pub fn default_values() -> Map<String, Value> {
        match serde_json::to_value(Self::default()) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Allowed values for fields that only accept a fixed set.
    #[must_use]
    pub fn choices(field: &str) -> &'static [&'static str] {
        match field {
            "train_type" => TRAIN_TYPES,
            "tuner_backend" => TUNER_BACKENDS,
            "torch_dtype" => TORCH_DTYPES,
            "rlhf_type" => RLHF_TYPES,
            _ => &[],
        }
    }

    #[must_use]
    pub fn logging_dir(&self) -> PathBuf {
        self.logging_dir.clone().unwrap_or_else(|| self.output_dir.join("runs"))
    }

    fn check_choice(field: &str, value: Option<&str>) -> LaunchResult<()> {
        let Some(value) = value else {
            return Ok(());
        };
        let choices = Self::choices(field);
        if choices.contains(&value) {
            Ok(())
        } else {
            Err(LaunchError::InvalidArgs(format!(
                "{field} must be one of {}, got {value}",
                choices.join(", ")
            )))
        }
    }

    fn finalize(mut self) -> LaunchResult<Self> {
        Self::check_choice("train_type", Some(&self.train_type))?;
        Self::check_choice("tuner_backend", Some(&self.tuner_backend))?;
        Self::check_choice("torch_dtype", self.torch_dtype.as_deref())?;
        Self::check_choice("rlhf_type", self.rlhf_type.as_deref())?;

        if self.model.is_none() {
            let ckpt = self.resume_from_checkpoint.as_deref().ok_or(LaunchError::MissingModel)?;
            self.model = Some(model_from_checkpoint(Path::new(ckpt))?);
        }

        if self.add_version {
            self.output_dir = versioned_output_dir(&self.output_dir)?;
        }
        if self.logging_dir.is_none() {
            self.logging_dir = Some(self.output_dir.join("runs"));
        }
        Ok(self)
    }
}

/// Validation seam: turns a keyword map into typed arguments.
pub trait ArgsValidator: Send + Sync {
    fn validate(&self, kwargs: &Map<String, Value>) -> LaunchResult<TrainArguments>;
}

/// Validates keyword maps against `TrainArguments`.
#[derive(Debug, Default, Clone)]
pub struct TrainArgsValidator;

impl ArgsValidator for TrainArgsValidator {
    fn validate(&self, kwargs: &Map<String, Value>) -> LaunchResult<TrainArguments> {
        let args: TrainArguments = serde_json::from_value(Value::Object(kwargs.clone()))
            .map_err(|e| LaunchError::InvalidArgs(e.to_string()))?;
        args.finalize()
    }
}

/// A checkpoint directory records the model it was trained from in `args.json`.
fn model_from_checkpoint(ckpt: &Path) -> LaunchResult<String> {
    let args_path = ckpt.join("args.json");
    let Ok(bytes) = std::fs::read(&args_path) else {
        return Err(LaunchError::MissingModel);
    };
    let saved: Value = serde_json::from_slice(&bytes)?;
    saved
        .get("model")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(LaunchError::MissingModel)
}

/// `<dir>/v<N>-<timestamp>` where N is one past the highest existing version.
fn versioned_output_dir(dir: &Path) -> LaunchResult<PathBuf> {
    let next = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter_map(|e| parse_version(&e.file_name().to_string_lossy()))
            .max()
            .map_or(0, |v| v + 1),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
        Err(e) => return Err(e.into()),
    };
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    Ok(dir.join(format!("v{next}-{stamp}")))
}

fn parse_version(name: &str) -> Option<u32> {
    let rest = name.strip_prefix('v')?;
    let (num, _) = rest.split_once('-')?;
    num.parse().ok()
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Null(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => s.split(' ').filter(|p| !p.is_empty()).map(str::to_string).collect(),
        OneOrMany::Many(items) => items,
        OneOrMany::Null(()) => Vec::new(),
    })
}
