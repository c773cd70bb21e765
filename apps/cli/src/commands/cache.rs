//! Inspect cached training submissions.

use crate::commands::types::CacheCommand;
use anyhow::{Context, Result};
use colored::Colorize;
use tune_launcher::LauncherConfig;

pub fn execute(command: CacheCommand, config: &LauncherConfig) -> Result<()> {
    let cache = config.cache();
    match command {
        CacheCommand::List { model, json } => {
            let names = cache.list(&model).context("Failed to list cached submissions")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&names)?);
                return Ok(());
            }

            println!();
            println!("{}", format!("Cached submissions for {} ({})", model, names.len()).bold().cyan());
            if names.is_empty() {
                println!("  {}", "No submissions recorded for this model yet.".dimmed());
            }
            for name in names {
                println!("  {}", name);
            }
            println!();
            Ok(())
        }
        CacheCommand::Show { model, name } => {
            let record = match name {
                Some(name) => cache.load(&model, &name)?,
                None => cache
                    .latest(&model)?
                    .with_context(|| format!("No cached submissions for {model}"))?,
            };
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
    }
}
