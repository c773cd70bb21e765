//! Tune Launcher
//!
//! Turns a training form submission into a shell command for an external
//! training CLI and runs it:
//! - Declaring form fields with defaults and labels (`TrainForm`)
//! - Resolving raw values into typed CLI overrides (`resolve`)
//! - Building the platform specific command line (`build_command`)
//! - Launching detached or streaming the log tail (`Launcher`)

pub mod args;
pub mod cache;
pub mod command;
pub mod config;
pub mod error;
pub mod form;
pub mod launcher;
pub mod locale;
pub mod plot;
pub mod resolver;
pub mod runner;
pub mod tasks;
pub mod value;

pub use args::{ArgsValidator, TrainArgsValidator, TrainArguments, TrainStage};
pub use cache::ConfigCache;
pub use command::{build_command, Accelerator, CommandSettings, LaunchCommand, Platform};
pub use config::LauncherConfig;
pub use error::{LaunchError, LaunchResult};
pub use form::{FieldSpec, FormSubmission, TrainForm, WidgetKind};
pub use launcher::{LaunchOutcome, Launcher, PreparedLaunch};
pub use locale::{Lang, Localized};
pub use plot::{collect_plots, PlotCollector, PlotSeries};
pub use resolver::{resolve, OtherParams, Resolution, ResolvedArguments};
pub use runner::{stream_command, tail_lines, LogUpdate};
pub use tasks::{discover_runs, tail_log, RunEntry};
pub use value::{ArgValue, FieldValue};
