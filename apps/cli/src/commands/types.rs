//! Command type definitions shared between main.rs and the command modules.

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Flags of `tune train`. Each maps onto a field of the training form.
#[derive(Args, Debug, Clone, Default)]
pub struct TrainCommand {
    /// Model id or path
    #[arg(long)]
    pub model: Option<String>,

    /// Dataset id or path (repeatable)
    #[arg(long = "dataset")]
    pub datasets: Vec<String>,

    /// Train stage (pt, sft, rlhf)
    #[arg(long)]
    pub stage: Option<String>,

    /// Any form field as key=value (repeatable); lists are comma separated
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Devices to train on, comma separated (e.g. 0,1 or cpu)
    #[arg(long)]
    pub gpu_id: Option<String>,

    /// Use distributed data parallel
    #[arg(long)]
    pub use_ddp: bool,

    /// Number of DDP processes
    #[arg(long)]
    pub ddp_num: Option<String>,

    /// Extra environment assignments, e.g. "A=1 B=2"
    #[arg(long)]
    pub envs: Option<String>,

    /// Extra arguments as a JSON object or literal "--flag value" text
    #[arg(long)]
    pub more_params: Option<String>,

    /// Start from the latest cached submission for the model
    #[arg(long)]
    pub from_cache: bool,

    /// Only print the command that would run
    #[arg(long)]
    pub dry_run: bool,

    /// Run attached and stream the log tail instead of detaching
    #[arg(long)]
    pub stream: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CacheCommand {
    /// List cached submissions for a model, newest first
    List {
        /// Model id or path the submissions were made for
        model: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one cached submission (defaults to the latest)
    Show {
        /// Model id or path the submission was made for
        model: String,

        /// Record name from `tune cache list`
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum MegatronCommand {
    /// List Megatron implementations and the model types they serve
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which implementation serves a model type
    Show {
        /// Model type, e.g. qwen2_5
        model_type: String,
    },

    /// Convert a HuggingFace config.json into Megatron arguments
    ConvertConfig {
        /// Path to config.json
        config: PathBuf,

        /// Model type to resolve the implementation (defaults to the config's model_type)
        #[arg(long)]
        model_type: Option<String>,
    },

    /// Plan a checkpoint conversion between HuggingFace and Megatron-core formats
    Export {
        /// Model type of the checkpoint
        model_type: String,

        /// Source checkpoint
        source: String,

        /// Output directory
        #[arg(long)]
        output_dir: PathBuf,

        /// Convert Megatron-core back to HuggingFace
        #[arg(long)]
        to_hf: bool,

        /// Precision of the exported weights
        #[arg(long)]
        torch_dtype: Option<String>,

        /// Run the conversion instead of printing it
        #[arg(long)]
        run: bool,
    },
}
