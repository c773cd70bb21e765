//! Tune CLI - command-line front end for the training launcher.
//!
//! This CLI provides a `tune` command that fills in the training form from
//! flags, builds the training command line and runs it, plus helpers for the
//! submission cache, run discovery and the Megatron model registry.

mod commands;
mod config;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use tune_launcher::Lang;

use commands::{cache, fields, megatron, runs, train, CacheCommand, MegatronCommand, TrainCommand};

/// Tune CLI - launch fine-tuning runs from the command line
#[derive(Parser, Debug)]
#[command(
    name = "tune",
    author,
    version,
    about = "Tune - build and launch fine-tuning commands",
    long_about = "Tune (tune) resolves training form values into a training CLI command line.\nRuns detach in the background or stream their log tail, and every submission is cached per model."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Message language (en, zh); overrides TUNE_LANG
    #[arg(long, global = true)]
    lang: Option<Lang>,

    /// Training CLI executable; overrides TUNE_CLI
    #[arg(long, global = true)]
    cli: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the form and launch a training run
    ///
    /// Flags fill in form fields; everything left untouched keeps its default.
    /// The run detaches into the background unless --stream is given.
    Train(TrainCommand),

    /// List the form fields with their defaults and choices
    Fields {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect cached submissions
    #[command(subcommand)]
    Cache(CacheCommand),

    /// List training runs below a directory
    Runs {
        /// Directory holding versioned run directories
        #[arg(default_value = "output")]
        dir: PathBuf,

        /// Print the tail of the newest run's log
        #[arg(long)]
        tail: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Megatron model registry
    #[command(subcommand)]
    Megatron(MegatronCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = config::load_config(args.lang, args.cli);

    // If no command provided, show help
    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    match command {
        Command::Train(cmd) => train::execute(cmd, config).await?,
        Command::Fields { json } => fields::execute(config, json)?,
        Command::Cache(cmd) => cache::execute(cmd, &config)?,
        Command::Runs { dir, tail, json } => runs::execute(&dir, &config, tail, json)?,
        Command::Megatron(cmd) => megatron::execute(cmd, &config)?,
    }

    Ok(())
}
