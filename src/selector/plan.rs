//! Resource requests and resolved plans

use crate::config::Defaults;
use crate::units::{MemorySize, TimeLimit};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Log directory used when neither the command line nor defaults name one
pub const DEFAULT_REPORT_DIR: &str = "./slurm-report";
/// Script directory used when neither the command line nor defaults name one
pub const DEFAULT_SCRIPT_DIR: &str = "./slurm_run";
/// Time limit used when the partition reports none
pub const FALLBACK_TIME: &str = "4-00:00:00";
/// Memory used when nothing is known about the nodes
pub const FALLBACK_MEMORY: MemorySize = MemorySize::from_gb(50);

/// Plan fields whose origin is tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Partition,
    Account,
    Nodes,
    TasksPerNode,
    CpusPerTask,
    Memory,
    Gpus,
    Time,
    ReportDir,
    ScriptDir,
}

impl Field {
    /// Command-line spelling of the field
    pub fn flag(&self) -> &'static str {
        match self {
            Field::Partition => "partition",
            Field::Account => "account",
            Field::Nodes => "nodes",
            Field::TasksPerNode => "tasks-per-node",
            Field::CpusPerTask => "cpus-per-task",
            Field::Memory => "mem",
            Field::Gpus => "gpus",
            Field::Time => "time",
            Field::ReportDir => "report-dir",
            Field::ScriptDir => "script-dir",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag())
    }
}

/// Which level of the cascade supplied a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Given on the command line (or answered at a prompt)
    Cli,
    /// Loaded from saved defaults
    Default,
    /// Derived from the cluster inventory
    Auto,
    /// Built-in constant
    Fallback,
}

impl FieldSource {
    /// Whether the user chose this value (command line or saved default)
    pub fn is_user_supplied(&self) -> bool {
        matches!(self, FieldSource::Cli | FieldSource::Default)
    }
}

/// Values supplied explicitly for one submission
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceRequest {
    pub partition: Option<String>,
    pub account: Option<String>,
    pub nodes: Option<u32>,
    pub tasks_per_node: Option<u32>,
    pub cpus_per_task: Option<u32>,
    pub memory: Option<MemorySize>,
    pub gpus: Option<u32>,
    pub time: Option<TimeLimit>,
    pub nodelist: Option<String>,
    pub exclude: Option<String>,
    pub job_name: Option<String>,
    pub report_dir: Option<PathBuf>,
    pub script_dir: Option<PathBuf>,
}

impl ResourceRequest {
    /// Whether any field would need the cluster inventory to be resolved
    pub fn needs_inventory(&self, defaults: &Defaults) -> bool {
        self.partition.is_none() && defaults.partition.is_none()
            || self.cpus_per_task.is_none() && defaults.cpus_per_task.is_none()
            || self.memory.is_none() && defaults.memory.is_none()
            || self.gpus.is_none() && defaults.gpus.is_none()
            || self.time.is_none() && defaults.time.is_none()
    }

    /// Whether an account is known without asking the scheduler
    pub fn has_account(&self, defaults: &Defaults) -> bool {
        self.account.is_some() || defaults.account.is_some()
    }
}

/// Concrete resources for one job
#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePlan {
    pub partition: String,
    pub account: Option<String>,
    pub nodes: u32,
    pub tasks_per_node: u32,
    pub cpus_per_task: u32,
    pub memory: MemorySize,
    pub gpus: u32,
    pub time: TimeLimit,
    pub nodelist: Option<String>,
    pub exclude: Option<String>,
    pub job_name: Option<String>,
    pub report_dir: PathBuf,
    pub script_dir: PathBuf,
    /// Origin of each tracked field
    pub sources: BTreeMap<Field, FieldSource>,
}

impl ResourcePlan {
    /// Where the value of `field` came from
    pub fn source(&self, field: Field) -> FieldSource {
        self.sources.get(&field).copied().unwrap_or(FieldSource::Cli)
    }

    /// Fields that were derived from the inventory
    pub fn auto_fields(&self) -> Vec<Field> {
        self.fields_from(FieldSource::Auto)
    }

    /// Fields that came from saved defaults
    pub fn default_fields(&self) -> Vec<Field> {
        self.fields_from(FieldSource::Default)
    }

    fn fields_from(&self, wanted: FieldSource) -> Vec<Field> {
        self.sources
            .iter()
            .filter(|(_, source)| **source == wanted)
            .map(|(field, _)| *field)
            .collect()
    }

    /// CPUs requested on every node
    pub fn cpus_per_node(&self) -> u64 {
        u64::from(self.cpus_per_task) * u64::from(self.tasks_per_node)
    }
}
