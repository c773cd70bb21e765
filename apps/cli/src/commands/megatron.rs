//! Megatron registry commands.

use crate::commands::types::MegatronCommand;
use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::{json, Value};
use tabled::{settings::Style, Table, Tabled};
use tune_launcher::LauncherConfig;
use tune_megatron::{ConversionRequest, MegatronRegistry};

#[derive(Tabled)]
struct FamilyRow {
    #[tabled(rename = "Megatron type")]
    family: String,
    #[tabled(rename = "Models")]
    count: usize,
    #[tabled(rename = "Model types")]
    model_types: String,
}

pub fn execute(command: MegatronCommand, config: &LauncherConfig) -> Result<()> {
    let registry = tune_megatron::global().context("Failed to build the Megatron registry")?;
    match command {
        MegatronCommand::List { json } => list(registry, json),
        MegatronCommand::Show { model_type } => show(registry, &model_type),
        MegatronCommand::ConvertConfig { config: path, model_type } => {
            let content =
                std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
            let hf: Value =
                serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))?;
            let model_type = model_type
                .or_else(|| hf.get("model_type").and_then(Value::as_str).map(str::to_string))
                .context("No model type given and config.json has no model_type")?;

            let meta = registry.require(&model_type)?;
            let converted = (meta.convert_hf_config)(&hf)?;
            let provider = (meta.model_provider)(&converted)?;
            let out = json!({
                "megatron_model_type": meta.megatron_model_type,
                "config": converted,
                "provider": provider,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
        MegatronCommand::Export { model_type, source, output_dir, to_hf, torch_dtype, run } => {
            let meta = registry.require(&model_type)?;
            let mut request = ConversionRequest::new(source, output_dir).with_tool(config.cli());
            if let Some(dtype) = torch_dtype {
                request = request.with_torch_dtype(dtype);
            }
            let plan = if to_hf { (meta.convert_mcore2hf)(&request)? } else { (meta.convert_hf2mcore)(&request)? };

            if !run {
                println!("{plan}");
                return Ok(());
            }

            tracing::info!(command = %plan, "Running conversion");
            let status = plan
                .command()
                .status()
                .with_context(|| format!("Failed to start {}", plan.program))?;
            if !status.success() {
                anyhow::bail!("Conversion failed with {status}");
            }
            println!("{} {}", "Converted to".green(), plan.output_dir.display());
            Ok(())
        }
    }
}

fn list(registry: &MegatronRegistry, json_output: bool) -> Result<()> {
    if json_output {
        let out: Vec<_> = registry
            .families()
            .map(|m| json!({ "megatron_model_type": m.megatron_model_type, "model_types": m.model_types }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let rows: Vec<FamilyRow> = registry
        .families()
        .map(|m| FamilyRow {
            family: m.megatron_model_type.to_string(),
            count: m.model_types.len(),
            model_types: m.model_types.join(", "),
        })
        .collect();

    println!();
    println!("{}", "Megatron implementations".bold().cyan());
    println!();
    println!("{}", Table::new(rows).with(Style::rounded()));
    println!();
    Ok(())
}

fn show(registry: &MegatronRegistry, model_type: &str) -> Result<()> {
    match registry.get(model_type) {
        Some(meta) => {
            println!("{} {} {}", model_type.cyan(), "->".dimmed(), meta.megatron_model_type.green());
            Ok(())
        }
        None => anyhow::bail!("Model type {model_type} has no Megatron implementation"),
    }
}
