//! Lists the fields accepted by `tune train --set`.

use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use tabled::{settings::Style, Table, Tabled};
use tune_launcher::{FieldValue, Launcher, LauncherConfig, WidgetKind};

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    id: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Default")]
    default: String,
    #[tabled(rename = "Choices")]
    choices: String,
    #[tabled(rename = "Label")]
    label: String,
}

fn kind_name(widget: WidgetKind, is_list: bool) -> &'static str {
    match (widget, is_list) {
        (WidgetKind::Checkbox, _) => "flag",
        (WidgetKind::MultiSelect, _) | (_, true) => "list",
        (WidgetKind::Dropdown, false) => "choice",
        (WidgetKind::Textbox, false) => "text",
    }
}

fn display_default(value: &FieldValue) -> String {
    match value {
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Text(s) => s.clone(),
        FieldValue::List(items) => items.join(","),
    }
}

pub fn execute(config: LauncherConfig, json_output: bool) -> Result<()> {
    let lang = config.lang();
    let launcher = Launcher::new(config);
    let fields = launcher.form().fields();

    if json_output {
        let out: Vec<_> = fields
            .iter()
            .map(|f| {
                json!({
                    "id": f.id,
                    "kind": kind_name(f.widget, f.is_list),
                    "default": f.default,
                    "choices": f.choices,
                    "label": f.label(lang),
                    "info": f.info.map(|i| i.get(lang)),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let rows: Vec<FieldRow> = fields
        .iter()
        .map(|f| FieldRow {
            id: f.id.to_string(),
            kind: kind_name(f.widget, f.is_list).to_string(),
            default: display_default(&f.default),
            choices: f.choices.join(","),
            label: f.label(lang).to_string(),
        })
        .collect();

    println!();
    println!("{}", format!("Training form fields ({})", rows.len()).bold().cyan());
    println!();
    println!("{}", Table::new(rows).with(Style::rounded()));
    println!();
    println!("  {}", "Set any field with `tune train --set <field>=<value>`; lists are comma separated.".dimmed());
    println!();
    Ok(())
}
