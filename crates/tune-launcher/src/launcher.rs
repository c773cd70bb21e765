//! The training launcher.
//!
//! [`Launcher`] resolves a form submission, builds the command and either
//! detaches it into the background or runs it attached while tailing its
//! output. Both paths log into `<logging_dir>/run.log`.

use crate::args::{ArgsValidator, TrainArgsValidator, TrainArguments};
use crate::cache::ConfigCache;
use crate::command::{build_command, CommandSettings, LaunchCommand};
use crate::config::LauncherConfig;
use crate::error::LaunchResult;
use crate::form::{FormSubmission, TrainForm};
use crate::locale::{DRY_RUN_NOTICE, SUBMIT_ALERT};
use crate::resolver::{resolve, Resolution};
use crate::runner::{run_detached, stream_command, LogUpdate};
use crate::tasks::{discover_runs, RunEntry};
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{info, warn};

/// A submission that passed resolution and has a command ready.
#[derive(Debug, Clone)]
pub struct PreparedLaunch {
    pub resolution: Resolution,
    pub command: LaunchCommand,
}

impl PreparedLaunch {
    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.resolution.other.dry_run()
    }

    #[must_use]
    pub fn args(&self) -> &TrainArguments {
        &self.resolution.args
    }

    /// Key used for the config cache.
    #[must_use]
    pub fn cache_key(&self) -> Option<&str> {
        self.resolution.model.as_deref().or(self.resolution.args.model.as_deref())
    }
}

/// What the caller should refresh after a detached launch.
#[derive(Debug, Clone)]
pub struct LaunchOutcome {
    pub command: String,
    pub logging_dir: PathBuf,
    pub launched: bool,
    /// Open the runtime panel.
    pub open_runtime: bool,
    /// Runs next to this one, newest first.
    pub runs: Vec<RunEntry>,
    /// Cached record names for the model, newest first.
    pub cached_records: Vec<String>,
    pub message: Option<String>,
}

/// Training launcher: resolves submissions, builds commands, runs them.
pub struct Launcher {
    config: LauncherConfig,
    form: TrainForm,
    defaults: Map<String, Value>,
    validator: Box<dyn ArgsValidator>,
    settings: CommandSettings,
    cache: ConfigCache,
}

impl Launcher {
    #[must_use]
    pub fn new(config: LauncherConfig) -> Self {
        let accelerator = config.accelerator();
        let settings = CommandSettings {
            cli: config.cli().to_string(),
            platform: config.platform(),
            accelerator,
        };
        Self {
            form: TrainForm::new(accelerator.device_count()),
            defaults: TrainArguments::default_values(),
            validator: Box::new(TrainArgsValidator),
            cache: config.cache(),
            settings,
            config,
        }
    }

    #[must_use]
    pub fn with_validator(mut self, validator: impl ArgsValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    #[must_use]
    pub fn with_form(mut self, form: TrainForm) -> Self {
        self.form = form;
        self
    }

    #[must_use]
    pub fn form(&self) -> &TrainForm {
        &self.form
    }

    #[must_use]
    pub fn cache(&self) -> &ConfigCache {
        &self.cache
    }

    #[must_use]
    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    /// Resolve a submission and build its command without running anything.
    pub fn prepare(&self, submission: &FormSubmission) -> LaunchResult<PreparedLaunch> {
        let resolution = resolve(submission, &self.defaults, &self.form, self.validator.as_ref(), self.config.lang())?;
        let command = build_command(&resolution, &self.settings)?;
        info!(command = %command, "Run training");
        Ok(PreparedLaunch { resolution, command })
    }

    /// Start training in the background and return once the log file had time to appear.
    pub async fn launch_detached(&self, submission: &FormSubmission) -> LaunchResult<LaunchOutcome> {
        let prepared = self.prepare(submission)?;
        let command = prepared.command.render();
        let logging_dir = prepared.command.logging_dir.clone();
        let mut message = None;

        let launched = !prepared.dry_run();
        if launched {
            std::fs::create_dir_all(&logging_dir)?;
            let status = run_detached(&command, self.settings.platform).await?;
            if !status.success() {
                warn!(status = %status, "Shell returned a failure status while launching");
            }
            tokio::time::sleep(self.config.settle_delay()).await;
            message = Some(SUBMIT_ALERT.get(self.config.lang()).to_string());

            if let Some(model) = prepared.cache_key() {
                let name = self.cache.save(model, &prepared.resolution.record)?;
                info!(model = %model, record = %name, "Saved training record");
            }
        }

        let runs = match prepared.command.output_dir.parent() {
            Some(parent) => discover_runs(parent)?,
            None => Vec::new(),
        };
        let cached_records = match prepared.cache_key() {
            Some(model) => self.cache.list(model)?,
            None => Vec::new(),
        };

        Ok(LaunchOutcome { command, logging_dir, launched, open_runtime: true, runs, cached_records, message })
    }

    /// Run training attached and stream the tail of its output.
    ///
    /// The output is also written to the run's log file so the run shows up
    /// in run discovery. In dry-run mode a single explanatory update is
    /// produced instead.
    pub fn stream_training(&self, submission: &FormSubmission) -> LaunchResult<BoxStream<'static, LaunchResult<LogUpdate>>> {
        let prepared = self.prepare(submission)?;
        let command = prepared.command.render_foreground();

        if prepared.dry_run() {
            let update = LogUpdate {
                text: DRY_RUN_NOTICE.get(self.config.lang()).to_string(),
                plots: Vec::new(),
                command,
            };
            return Ok(stream::once(async move { Ok(update) }).boxed());
        }

        let log_file = &prepared.command.log_file;
        let updates = stream_command(&command, self.settings.platform, self.config.max_log_lines(), Some(log_file))?;
        info!(log_file = %log_file.display(), "Streaming training output");
        Ok(updates.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Accelerator, Platform};
    use crate::value::FieldValue;
    use tempfile::TempDir;

    fn launcher(temp: &TempDir) -> Launcher {
        let config = LauncherConfig {
            cli: Some("echo".to_string()),
            cache_dir: Some(temp.path().join("cache")),
            settle_ms: Some(0),
            accelerator: Some(Accelerator::Cuda),
            platform: Some(Platform::Posix),
            max_log_lines: Some(2),
            ..LauncherConfig::default()
        };
        Launcher::new(config).with_form(TrainForm::new(2))
    }

    fn submission(launcher: &Launcher, temp: &TempDir, dry_run: bool) -> FormSubmission {
        launcher.form().submission(&[
            ("model".to_string(), FieldValue::text("Qwen/Qwen2.5-7B")),
            ("dataset".to_string(), FieldValue::List(vec!["alpaca".to_string()])),
            ("output_dir".to_string(), FieldValue::text(temp.path().join("out").to_string_lossy())),
            ("dry_run".to_string(), FieldValue::Bool(dry_run)),
        ])
    }

    #[test]
    fn test_prepare_builds_command() {
        let temp = TempDir::new().unwrap();
        let launcher = launcher(&temp);
        let prepared = launcher.prepare(&submission(&launcher, &temp, true)).unwrap();
        let rendered = prepared.command.render();
        assert!(rendered.starts_with("CUDA_VISIBLE_DEVICES=0 nohup echo sft --model 'Qwen/Qwen2.5-7B' --dataset 'alpaca'"));
        assert!(rendered.contains("--ignore_args_error True"));
        assert!(prepared.dry_run());
    }

    #[tokio::test]
    async fn test_dry_run_detached_does_not_launch_or_cache() {
        let temp = TempDir::new().unwrap();
        let launcher = launcher(&temp);
        let outcome = launcher.launch_detached(&submission(&launcher, &temp, true)).await.unwrap();
        assert!(!outcome.launched);
        assert!(outcome.open_runtime);
        assert!(!outcome.logging_dir.exists());
        assert!(outcome.cached_records.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_detached_launch_writes_log_and_record() {
        let temp = TempDir::new().unwrap();
        let launcher = launcher(&temp);
        let outcome = launcher.launch_detached(&submission(&launcher, &temp, false)).await.unwrap();
        assert!(outcome.launched);
        assert!(outcome.logging_dir.is_dir());
        assert_eq!(outcome.cached_records.len(), 1);
        assert!(outcome.message.is_some());

        let record = launcher.cache().latest("Qwen/Qwen2.5-7B").unwrap().unwrap();
        assert_eq!(record["dataset"], serde_json::json!(["alpaca"]));
    }

    #[tokio::test]
    async fn test_dry_run_stream_yields_single_notice() {
        let temp = TempDir::new().unwrap();
        let launcher = launcher(&temp);
        let updates: Vec<_> = launcher.stream_training(&submission(&launcher, &temp, true)).unwrap().collect().await;
        assert_eq!(updates.len(), 1);
        let update = updates[0].as_ref().unwrap();
        assert!(update.text.starts_with("Current is dryrun mode"));
        assert!(update.command.starts_with("CUDA_VISIBLE_DEVICES=0 echo sft"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stream_training_tails_process_output() {
        let temp = TempDir::new().unwrap();
        let launcher = launcher(&temp);
        let updates: Vec<_> = launcher.stream_training(&submission(&launcher, &temp, false)).unwrap().collect().await;
        assert_eq!(updates.len(), 1);
        let text = &updates[0].as_ref().unwrap().text;
        assert!(text.starts_with("sft --model Qwen/Qwen2.5-7B --dataset alpaca"));

        let runs = discover_runs(&temp.path().join("out")).unwrap();
        assert_eq!(runs.len(), 1);
        let log = std::fs::read_to_string(&runs[0].log_file).unwrap();
        assert!(log.starts_with("sft --model Qwen/Qwen2.5-7B"));
    }
}
