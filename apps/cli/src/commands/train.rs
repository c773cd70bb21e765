//! Training command implementation.

use crate::commands::types::TrainCommand;
use anyhow::{Context, Result};
use colored::Colorize;
use futures::StreamExt;
use serde_json::json;
use tune_launcher::locale::DRY_RUN_NOTICE;
use tune_launcher::{FieldValue, FormSubmission, Launcher, LauncherConfig, LogUpdate, TrainForm};

pub async fn execute(command: TrainCommand, config: LauncherConfig) -> Result<()> {
    let launcher = Launcher::new(config);
    let submission = build_submission(&command, &launcher)?;

    if command.stream {
        stream(&launcher, &submission, command.json).await
    } else {
        launch(&launcher, &submission, command.json).await
    }
}

fn parse_field(form: &TrainForm, key: &str, raw: &str) -> Result<(String, FieldValue)> {
    let field = form
        .field(key)
        .with_context(|| format!("Unknown field: {key}. Run `tune fields` to list them."))?;
    Ok((key.to_string(), field.parse_input(raw)))
}

/// Overrides from flags, layered on the cached submission when requested.
fn build_submission(command: &TrainCommand, launcher: &Launcher) -> Result<FormSubmission> {
    let form = launcher.form();
    let mut overrides = Vec::new();

    if let Some(model) = &command.model {
        overrides.push(("model".to_string(), FieldValue::text(model)));
    }
    if !command.datasets.is_empty() {
        overrides.push(("dataset".to_string(), FieldValue::List(command.datasets.clone())));
    }
    if let Some(stage) = &command.stage {
        overrides.push(("train_stage".to_string(), FieldValue::text(stage)));
    }
    if let Some(gpu_id) = &command.gpu_id {
        overrides.push(parse_field(form, "gpu_id", gpu_id)?);
    }
    if command.use_ddp {
        overrides.push(("use_ddp".to_string(), FieldValue::Bool(true)));
    }
    if let Some(ddp_num) = &command.ddp_num {
        overrides.push(("ddp_num".to_string(), FieldValue::text(ddp_num)));
    }
    if let Some(envs) = &command.envs {
        overrides.push(("envs".to_string(), FieldValue::text(envs)));
    }
    if let Some(more_params) = &command.more_params {
        overrides.push(("more_params".to_string(), FieldValue::text(more_params)));
    }
    if command.dry_run {
        overrides.push(("dry_run".to_string(), FieldValue::Bool(true)));
    }
    for entry in &command.set {
        let (key, raw) = entry
            .split_once('=')
            .with_context(|| format!("Expected KEY=VALUE, got: {entry}"))?;
        overrides.push(parse_field(form, key.trim(), raw)?);
    }

    if command.from_cache {
        let model = overrides
            .iter()
            .rev()
            .find(|(id, _)| id == "model")
            .and_then(|(_, v)| v.as_text())
            .filter(|m| !m.is_empty())
            .context("--from-cache needs a model (--model or --set model=...)")?
            .to_string();
        match launcher.cache().latest(&model).context("Failed to read cached submissions")? {
            Some(record) => {
                let mut layered = form.prefill(&record);
                layered.append(&mut overrides);
                overrides = layered;
            }
            None => tracing::warn!(model = %model, "No cached submission found"),
        }
    }

    Ok(form.submission(&overrides))
}

async fn launch(launcher: &Launcher, submission: &FormSubmission, json_output: bool) -> Result<()> {
    let outcome = launcher.launch_detached(submission).await?;

    if json_output {
        let out = json!({
            "command": outcome.command,
            "launched": outcome.launched,
            "logging_dir": outcome.logging_dir,
            "runs": outcome.runs,
            "cached_records": outcome.cached_records,
            "message": outcome.message,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{}", "Run command".bold().cyan());
    println!("  {}", outcome.command);
    println!();

    if outcome.launched {
        if let Some(message) = &outcome.message {
            println!("{}", message.green());
        }
        println!("  Logs: {}", outcome.logging_dir.join("run.log").display().to_string().dimmed());
    } else {
        println!("  {}", DRY_RUN_NOTICE.get(launcher.config().lang()).yellow());
    }

    if !outcome.runs.is_empty() {
        println!();
        println!("{}", format!("Runs ({})", outcome.runs.len()).bold());
        for run in &outcome.runs {
            println!("  {:<32} {}", run.name().cyan(), run.log_file.display().to_string().dimmed());
        }
    }
    println!();
    Ok(())
}

async fn stream(launcher: &Launcher, submission: &FormSubmission, json_output: bool) -> Result<()> {
    let dry_run = submission.get("dry_run").is_some_and(FieldValue::is_truthy);
    let mut updates = launcher.stream_training(submission)?;
    let mut last: Option<LogUpdate> = None;

    while let Some(update) = updates.next().await {
        let update = update.context("Failed to read training output")?;
        if !json_output {
            if dry_run {
                println!("{}", update.command);
                println!("{}", update.text.yellow());
            } else if let Some(line) = update.text.lines().last() {
                println!("{line}");
            }
        }
        last = Some(update);
    }

    let Some(last) = last else {
        return Ok(());
    };
    if json_output {
        println!("{}", serde_json::to_string_pretty(&last)?);
        return Ok(());
    }

    for plot in &last.plots {
        if let Some((step, value)) = plot.points.last() {
            println!("  {} {} (step {})", plot.name.bold(), value, step);
        }
    }
    Ok(())
}
