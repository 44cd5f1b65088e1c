//! Persisted user defaults
//!
//! A flat JSON object at `~/.config/wrapslurm/defaults.json`. The store
//! only reads and replaces the whole file; combining stored values with
//! new ones is done by [`Defaults::merged_with`] before saving.

use crate::error::{IoResultExt, Result, WrapSlurmError};
use crate::units::{MemorySize, TimeLimit};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Directory under the user config dir holding our files
pub const CONFIG_DIR_NAME: &str = "wrapslurm";

/// File name of the defaults store
pub const DEFAULTS_FILE_NAME: &str = "defaults.json";

/// Saved option values, consulted after the command line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks_per_node: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpus_per_task: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemorySize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpus: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeLimit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_dir: Option<PathBuf>,
}

impl Defaults {
    /// Whether no option is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Values of `self` overridden by every value set in `updates`
    pub fn merged_with(&self, updates: &Defaults) -> Defaults {
        Defaults {
            partition: updates.partition.clone().or_else(|| self.partition.clone()),
            account: updates.account.clone().or_else(|| self.account.clone()),
            nodes: updates.nodes.or(self.nodes),
            tasks_per_node: updates.tasks_per_node.or(self.tasks_per_node),
            cpus_per_task: updates.cpus_per_task.or(self.cpus_per_task),
            memory: updates.memory.or(self.memory),
            gpus: updates.gpus.or(self.gpus),
            time: updates.time.clone().or_else(|| self.time.clone()),
            report_dir: updates.report_dir.clone().or_else(|| self.report_dir.clone()),
            script_dir: updates.script_dir.clone().or_else(|| self.script_dir.clone()),
        }
    }

    /// Build from a JSON object, dropping fields whose values do not fit
    pub fn from_map(map: &Map<String, Value>) -> Defaults {
        let mut defaults = Defaults::default();

        for (key, value) in map {
            let applied = match key.as_str() {
                "partition" => text(value).map(|v| defaults.partition = Some(v)),
                "account" => text(value).map(|v| defaults.account = Some(v)),
                "nodes" => positive(value).map(|v| defaults.nodes = Some(v)),
                "tasks_per_node" => positive(value).map(|v| defaults.tasks_per_node = Some(v)),
                "cpus_per_task" => positive(value).map(|v| defaults.cpus_per_task = Some(v)),
                "gpus" => count(value).map(|v| defaults.gpus = Some(v)),
                "memory" => memory(value).map(|v| defaults.memory = Some(v)),
                "time" => text(value)
                    .and_then(|v| v.parse::<TimeLimit>().ok())
                    .map(|v| defaults.time = Some(v)),
                "report_dir" => text(value).map(|v| defaults.report_dir = Some(PathBuf::from(v))),
                "script_dir" => text(value).map(|v| defaults.script_dir = Some(PathBuf::from(v))),
                other => {
                    tracing::debug!("Ignoring unknown default '{}'", other);
                    Some(())
                }
            };

            if applied.is_none() {
                tracing::warn!("Ignoring stored default for '{}': {}", key, value);
            }
        }

        defaults
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn positive(value: &Value) -> Option<u32> {
    count(value).filter(|v| *v > 0)
}

fn memory(value: &Value) -> Option<MemorySize> {
    match value {
        Value::Number(n) => n.as_u64().map(MemorySize::from_mb),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Location of the defaults file and the I/O around it
#[derive(Debug, Clone)]
pub struct DefaultsStore {
    path: PathBuf,
}

impl DefaultsStore {
    /// Store at an explicit path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `path_override`, or the per-user config directory
    pub fn locate(path_override: Option<&Path>) -> Result<Self> {
        if let Some(path) = path_override {
            return Ok(Self::at(path));
        }

        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .ok_or_else(|| WrapSlurmError::config("Unable to locate a configuration directory"))?;

        Ok(Self::at(base.join(CONFIG_DIR_NAME).join(DEFAULTS_FILE_NAME)))
    }

    /// Path of the defaults file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load defaults; a missing or unreadable file means "no defaults"
    ///
    /// Only a permission failure is reported as an error.
    pub fn load(&self) -> Result<Defaults> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No defaults file at {}", self.path.display());
                return Ok(Defaults::default());
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(WrapSlurmError::PermissionDenied(self.path.clone()));
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable defaults file {}: {}", self.path.display(), e);
                return Ok(Defaults::default());
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(Defaults::from_map(&map)),
            Ok(_) => {
                tracing::warn!(
                    "Ignoring malformed defaults at {}: expected an object",
                    self.path.display()
                );
                Ok(Defaults::default())
            }
            Err(e) => {
                tracing::warn!("Ignoring corrupted defaults file at {}: {}", self.path.display(), e);
                Ok(Defaults::default())
            }
        }
    }

    /// Replace the stored defaults with `defaults` (write-then-rename)
    pub fn save(&self, defaults: &Defaults) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_path(parent)?;
            }
        }

        let temp_path = self.path.with_extension("json.tmp");
        {
            let file = File::create(&temp_path).with_path(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, defaults)?;
            writer.write_all(b"\n").with_path(&temp_path)?;
            writer.flush().with_path(&temp_path)?;
        }

        fs::rename(&temp_path, &self.path).with_path(&self.path)?;
        tracing::info!("Saved defaults to {}", self.path.display());
        Ok(())
    }
}
