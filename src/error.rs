//! Error types for WrapSlurm
//!
//! Every failure the tool can report to the user is a variant of
//! [`WrapSlurmError`]. Inventory parse problems are not errors: the parser
//! logs and skips them.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for WrapSlurm operations
#[derive(Error, Debug)]
pub enum WrapSlurmError {
    /// I/O error during file operations
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Permission denied while touching a file we own (defaults, scripts)
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No partition in the snapshot has a usable node
    #[error("No partition is up: every node reported by sinfo is down or drained")]
    NoPartitionUp,

    /// Requested partition does not exist in the snapshot
    #[error("Unknown partition '{partition}' (available: {})", available.join(", "))]
    UnknownPartition {
        partition: String,
        available: Vec<String>,
    },

    /// A user-supplied value exceeds what any node can provide
    #[error("Cannot satisfy {field}={requested}: the largest node {scope} has {limit}")]
    Unsatisfiable {
        field: &'static str,
        requested: String,
        limit: String,
        scope: String,
    },

    /// Auto-detection was required but no inventory could be read
    #[error("Unable to determine {0}: provide it explicitly or make sure 'sinfo' is available")]
    InventoryUnavailable(&'static str),

    /// Batch submission without a command
    #[error("Batch jobs require a command to execute")]
    MissingCommand,

    /// External SLURM tool is not installed / not on PATH
    #[error("Command '{tool}' not found. Please ensure SLURM is installed and added to PATH")]
    ToolNotFound { tool: String },

    /// External SLURM tool exited with a non-zero status
    #[error("'{tool}' failed (exit code {code}): {stderr}")]
    ToolFailed {
        tool: String,
        code: i32,
        stderr: String,
    },

    /// Output of an external tool did not have the expected shape
    #[error("Unexpected output from '{tool}': {output}")]
    UnexpectedOutput { tool: String, output: String },

    /// No log file could be located
    #[error("No log files found in {0}")]
    NoLogFiles(PathBuf),

    /// Defaults file could not be encoded
    #[error("Defaults error: {0}")]
    DefaultsError(String),
}

impl WrapSlurmError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied(path);
        }
        Self::Io { path, source }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create an unsatisfiable-constraint error
    pub fn unsatisfiable(
        field: &'static str,
        requested: impl ToString,
        limit: impl ToString,
        scope: impl Into<String>,
    ) -> Self {
        Self::Unsatisfiable {
            field,
            requested: requested.to_string(),
            limit: limit.to_string(),
            scope: scope.into(),
        }
    }

    /// Exit code the process should terminate with for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ToolFailed { code, .. } if *code > 0 => *code,
            _ => 1,
        }
    }

    /// Check if this error is a permission issue
    pub fn is_permission_error(&self) -> bool {
        match self {
            Self::PermissionDenied(_) => true,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }
}

/// Result type alias for WrapSlurm operations
pub type Result<T> = std::result::Result<T, WrapSlurmError>;

impl From<serde_json::Error> for WrapSlurmError {
    fn from(err: serde_json::Error) -> Self {
        WrapSlurmError::DefaultsError(err.to_string())
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| WrapSlurmError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_is_promoted() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err = WrapSlurmError::io("/etc/wrapslurm.json", io_err);
        assert!(err.is_permission_error());
        assert!(matches!(err, WrapSlurmError::PermissionDenied(_)));
    }

    #[test]
    fn test_unsatisfiable_message_names_limit() {
        let err = WrapSlurmError::unsatisfiable("cpus-per-task", 128, "64 CPUs", "in the cluster");
        let msg = err.to_string();
        assert!(msg.contains("cpus-per-task=128"));
        assert!(msg.contains("64 CPUs"));
    }

    #[test]
    fn test_exit_code_propagates_tool_status() {
        let err = WrapSlurmError::ToolFailed {
            tool: "scancel".into(),
            code: 3,
            stderr: "invalid job id".into(),
        };
        assert_eq!(err.exit_code(), 3);
        assert_eq!(WrapSlurmError::MissingCommand.exit_code(), 1);
    }

    #[test]
    fn test_unknown_partition_lists_available() {
        let err = WrapSlurmError::UnknownPartition {
            partition: "gpu".into(),
            available: vec!["cpu1".into(), "gp4d".into()],
        };
        assert!(err.to_string().contains("cpu1, gp4d"));
    }
}
