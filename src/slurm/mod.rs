//! Process boundary to the SLURM command-line tools
//!
//! Every external program is run through [`SlurmTools`], which only
//! returns raw text. Parsing lives in [`crate::inventory`] and
//! [`crate::display`]. Each executable can be redirected through an
//! environment variable (`WRAPSLURM_SINFO`, `WRAPSLURM_SBATCH`, ...),
//! which is how the tests substitute fake binaries.

use crate::error::{Result, WrapSlurmError};
use crate::inventory::SINFO_FORMAT;
use std::env;
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Stdio};

/// Output format handed to `squeue -o`
pub const SQUEUE_FORMAT: &str = "%i|%P|%j|%u|%T|%M|%D|%R";

/// Locations of the SLURM executables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlurmTools {
    pub sbatch: String,
    pub sinfo: String,
    pub squeue: String,
    pub scontrol: String,
    pub scancel: String,
    pub srun: String,
    pub sacctmgr: String,
}

fn exec_from_env(var: &str, default: &str) -> String {
    env::var(var)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl SlurmTools {
    /// Tools looked up on `PATH`, honouring the `WRAPSLURM_*` overrides
    pub fn from_env() -> Self {
        Self {
            sbatch: exec_from_env("WRAPSLURM_SBATCH", "sbatch"),
            sinfo: exec_from_env("WRAPSLURM_SINFO", "sinfo"),
            squeue: exec_from_env("WRAPSLURM_SQUEUE", "squeue"),
            scontrol: exec_from_env("WRAPSLURM_SCONTROL", "scontrol"),
            scancel: exec_from_env("WRAPSLURM_SCANCEL", "scancel"),
            srun: exec_from_env("WRAPSLURM_SRUN", "srun"),
            sacctmgr: exec_from_env("WRAPSLURM_SACCTMGR", "sacctmgr"),
        }
    }

    /// Raw `sinfo` node listing in the format [`crate::inventory::parse_sinfo`] reads
    pub fn node_inventory(&self) -> Result<String> {
        let format = format!("--Format={}", SINFO_FORMAT);
        capture(&self.sinfo, ["--Node", "--noheader", format.as_str()])
    }

    /// Raw `scontrol show node` output
    pub fn node_details(&self) -> Result<String> {
        capture(&self.scontrol, ["show", "node"])
    }

    /// Raw `squeue` listing, optionally for one user
    pub fn queue(&self, user: Option<&str>) -> Result<String> {
        let mut args = vec!["--noheader", "-o", SQUEUE_FORMAT];
        if let Some(user) = user {
            args.push("-u");
            args.push(user);
        }
        capture(&self.squeue, args)
    }

    /// Submit a batch script and return the job ID
    pub fn submit(&self, script: &Path) -> Result<String> {
        let stdout = capture(&self.sbatch, [script.as_os_str()])?;
        let job_id = parse_job_id(&stdout).ok_or_else(|| WrapSlurmError::UnexpectedOutput {
            tool: tool_name(&self.sbatch),
            output: stdout.trim().to_string(),
        })?;
        tracing::info!("Submitted batch job {}", job_id);
        Ok(job_id)
    }

    /// Cancel jobs with one `scancel` invocation, returning its stdout
    pub fn cancel(
        &self,
        job_ids: &[String],
        signal: Option<&str>,
        user: Option<&str>,
        passthrough: &[String],
    ) -> Result<String> {
        if job_ids.is_empty() && user.is_none() {
            return Err(WrapSlurmError::config(
                "Nothing to cancel: give at least one job ID or --user",
            ));
        }

        let args = cancel_args(job_ids, signal, user, passthrough);
        let stdout = capture(&self.scancel, &args)?;
        tracing::info!("Cancel request sent for {}", describe_targets(job_ids, user));
        Ok(stdout)
    }

    /// First account associated with `user` in the accounting database
    ///
    /// Any failure is logged and treated as "no account".
    pub fn default_account(&self, user: &str) -> Option<String> {
        let user_arg = format!("user={}", user);
        match capture(
            &self.sacctmgr,
            ["show", "assoc", user_arg.as_str(), "format=Account", "--noheader"],
        ) {
            Ok(stdout) => {
                let account = stdout
                    .lines()
                    .map(str::trim)
                    .find(|line| !line.is_empty())
                    .map(str::to_string);
                tracing::debug!("sacctmgr reported account {:?} for {}", account, user);
                account
            }
            Err(e) => {
                tracing::warn!("Could not look up a default account: {}", e);
                None
            }
        }
    }

    /// Run `srun` attached to the terminal and wait for it
    pub fn interactive(&self, args: &[String]) -> Result<()> {
        tracing::debug!("Running command: {} {:?}", self.srun, args);
        let status = Command::new(&self.srun)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| spawn_error(&self.srun, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(WrapSlurmError::ToolFailed {
                tool: tool_name(&self.srun),
                code: status.code().unwrap_or(-1),
                stderr: String::new(),
            })
        }
    }
}

impl Default for SlurmTools {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Run a tool, returning stdout on success
fn capture<I, S>(program: &str, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<S> = args.into_iter().collect();
    tracing::trace!(
        "Running command: {} {:?}",
        program,
        args.iter().map(|a| a.as_ref().to_string_lossy()).collect::<Vec<_>>()
    );

    let output = Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| spawn_error(program, e))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let code = output.status.code().unwrap_or(-1);
    tracing::debug!("{} exited with {}: {}", program, code, stderr);
    Err(WrapSlurmError::ToolFailed {
        tool: tool_name(program),
        code,
        stderr,
    })
}

fn spawn_error(program: &str, err: std::io::Error) -> WrapSlurmError {
    if err.kind() == ErrorKind::NotFound {
        WrapSlurmError::ToolNotFound {
            tool: tool_name(program),
        }
    } else {
        WrapSlurmError::io(program, err)
    }
}

/// Program name without its directory, for messages
fn tool_name(program: &str) -> String {
    Path::new(program)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string())
}

/// Job ID from `Submitted batch job 12345` (or `12345;cluster` from `--parsable`)
pub fn parse_job_id(stdout: &str) -> Option<String> {
    let last = stdout.split_whitespace().last()?;
    let id = last.split(';').next().unwrap_or(last);
    (!id.is_empty() && id.chars().all(|c| c.is_ascii_digit() || c == '_')).then(|| id.to_string())
}

/// Arguments of the single batched `scancel` call
pub fn cancel_args(
    job_ids: &[String],
    signal: Option<&str>,
    user: Option<&str>,
    passthrough: &[String],
) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(signal) = signal {
        args.push(format!("--signal={}", signal));
    }
    if let Some(user) = user {
        args.push(format!("--user={}", user));
    }
    args.extend(passthrough.iter().cloned());
    args.extend(job_ids.iter().cloned());
    args
}

fn describe_targets(job_ids: &[String], user: Option<&str>) -> String {
    match (job_ids.is_empty(), user) {
        (false, _) => format!("job(s) {}", job_ids.join(", ")),
        (true, Some(user)) => format!("all jobs of {}", user),
        (true, None) => "nothing".to_string(),
    }
}

/// Login name of the invoking user
#[cfg(unix)]
pub fn current_user() -> Option<String> {
    nix::unistd::User::from_uid(nix::unistd::getuid())
        .ok()
        .flatten()
        .map(|user| user.name)
        .or_else(|| env::var("USER").ok())
}

/// Login name of the invoking user
#[cfg(not(unix))]
pub fn current_user() -> Option<String> {
    env::var("USER").or_else(|_| env::var("USERNAME")).ok()
}
