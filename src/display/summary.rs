//! Summary of a resolved job before it is submitted

use super::render_table;
use crate::selector::{Field, FieldSource, ResourcePlan};
use console::style;
use std::fmt::Display;
use std::path::Path;
use tabled::Tabled;

/// Marker appended to auto-detected values
pub const AUTO_MARKER: &str = "*";
/// Marker appended to values loaded from saved defaults
pub const DEFAULT_MARKER: &str = "\u{2020}";

#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "Setting")]
    setting: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn marked(plan: &ResourcePlan, field: Field, value: impl Display) -> String {
    match plan.source(field) {
        FieldSource::Auto => style(format!("{} {}", value, AUTO_MARKER)).cyan().to_string(),
        FieldSource::Default => style(format!("{} {}", value, DEFAULT_MARKER))
            .yellow()
            .to_string(),
        FieldSource::Cli | FieldSource::Fallback => value.to_string(),
    }
}

/// Table of the plan's settings with a legend for the markers
///
/// `command` is what will run (or `None` for an interactive shell).
pub fn render_summary(
    plan: &ResourcePlan,
    command: Option<&[String]>,
    script_path: Option<&Path>,
) -> String {
    let mode = if command.is_some() { "Batch" } else { "Interactive" };
    let command = match command {
        Some(words) if !words.is_empty() => words.join(" "),
        Some(_) => "<no command provided>".to_string(),
        None => "Interactive shell".to_string(),
    };

    let mut rows = vec![
        SettingRow { setting: "Mode", value: mode.to_string() },
        SettingRow {
            setting: "Partition",
            value: marked(plan, Field::Partition, &plan.partition),
        },
        SettingRow {
            setting: "Account",
            value: marked(plan, Field::Account, plan.account.as_deref().unwrap_or("-")),
        },
        SettingRow { setting: "Nodes", value: marked(plan, Field::Nodes, plan.nodes) },
        SettingRow {
            setting: "Tasks / Node",
            value: marked(plan, Field::TasksPerNode, plan.tasks_per_node),
        },
        SettingRow {
            setting: "CPUs / Task",
            value: marked(plan, Field::CpusPerTask, plan.cpus_per_task),
        },
        SettingRow { setting: "Memory", value: marked(plan, Field::Memory, plan.memory) },
        SettingRow { setting: "GPUs", value: marked(plan, Field::Gpus, plan.gpus) },
        SettingRow { setting: "Time", value: marked(plan, Field::Time, &plan.time) },
        SettingRow { setting: "Command", value: command },
    ];

    if let Some(nodelist) = &plan.nodelist {
        rows.push(SettingRow { setting: "NodeList", value: nodelist.clone() });
    }
    if let Some(exclude) = &plan.exclude {
        rows.push(SettingRow { setting: "Exclude", value: exclude.clone() });
    }
    if let Some(name) = &plan.job_name {
        rows.push(SettingRow { setting: "Job Name", value: name.clone() });
    }
    rows.push(SettingRow {
        setting: "Log Dir",
        value: marked(plan, Field::ReportDir, plan.report_dir.display()),
    });
    if let Some(path) = script_path {
        rows.push(SettingRow { setting: "Script", value: path.display().to_string() });
    }

    let mut out = render_table(&rows);
    if !plan.auto_fields().is_empty() {
        out.push('\n');
        out.push_str(&style(format!("{} Automatically detected value", AUTO_MARKER)).cyan().to_string());
    }
    if !plan.default_fields().is_empty() {
        out.push('\n');
        out.push_str(&style(format!("{} Loaded from saved defaults", DEFAULT_MARKER)).yellow().to_string());
    }
    out
}
