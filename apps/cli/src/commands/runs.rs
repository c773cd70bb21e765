//! Lists training runs and tails their logs.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use tune_launcher::{discover_runs, tail_log, LauncherConfig};

pub fn execute(root: &Path, config: &LauncherConfig, tail: bool, json_output: bool) -> Result<()> {
    let runs = discover_runs(root).with_context(|| format!("Failed to scan {}", root.display()))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Runs in {} ({})", root.display(), runs.len()).bold().cyan());
    println!();
    if runs.is_empty() {
        println!("  {}", "No runs found.".dimmed());
        println!();
        return Ok(());
    }

    for run in &runs {
        println!(
            "  {:<32} {}  {}",
            run.name().cyan(),
            run.modified.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            run.log_file.display()
        );
    }

    if tail {
        if let Some(latest) = runs.first() {
            println!();
            println!("{}", format!("Tail of {}", latest.name()).bold());
            for line in tail_log(&latest.log_file, config.max_log_lines())? {
                println!("  {line}");
            }
        }
    }
    println!();
    Ok(())
}
