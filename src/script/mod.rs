//! sbatch script generation
//!
//! The script text is a pure function of a [`ResourcePlan`] and the user's
//! command. The preview printed by `--dry-run` and the file handed to
//! `sbatch` are the same string.

use crate::error::{IoResultExt, Result, WrapSlurmError};
use crate::selector::ResourcePlan;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment echo and distributed-launch setup placed before the command
const JOB_PRELUDE: &str = r#"
# SLURM Environment Variables
echo "SLURM_NNODES=${SLURM_NNODES}"
echo "NODELIST=${SLURM_JOB_NODELIST}"
echo "SLURM_NODEID=${SLURM_NODEID}"
echo "SLURM_ARRAY_TASK_ID=${SLURM_ARRAY_TASK_ID}"

# Distributed Training Setup
export MASTER_ADDR=$(scontrol show hostnames ${SLURM_JOB_NODELIST} | head -n 1)
export MASTER_PORT=$(shuf -i 1024-65535 -n 1)
export TORCH_NCCL_ASYNC_ERROR_HANDLING=1
export CUDA_LAUNCH_BLOCKING=1
export TORCH_DISTRIBUTED_DEBUG=DETAIL

# Command Execution
"#;

/// Launcher prefix for the user's command
const SRUN_LAUNCH: &str = "srun --wait=60 --kill-on-bad-exit=1 --mpi=pmix bash -lc";

/// A rendered batch script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionScript {
    text: String,
}

impl SubmissionScript {
    /// Render the script for `plan` running `command`
    pub fn new(plan: &ResourcePlan, command: &[String]) -> Result<Self> {
        if command.is_empty() || command.iter().all(|arg| arg.trim().is_empty()) {
            return Err(WrapSlurmError::MissingCommand);
        }

        let quoted = quote_command(command)?;
        let report_dir = plan.report_dir.display();

        let mut text = String::from("#!/bin/bash\n");
        text.push_str(&format!("#SBATCH --nodes={}\n", plan.nodes));
        text.push_str(&format!("#SBATCH --partition={}\n", plan.partition));
        if let Some(account) = &plan.account {
            text.push_str(&format!("#SBATCH --account={}\n", account));
        }
        text.push_str(&format!("#SBATCH --ntasks-per-node={}\n", plan.tasks_per_node));
        text.push_str(&format!("#SBATCH --cpus-per-task={}\n", plan.cpus_per_task));
        text.push_str(&format!("#SBATCH --mem={}\n", plan.memory));
        if plan.gpus > 0 {
            text.push_str(&format!("#SBATCH --gres=gpu:{}\n", plan.gpus));
        }
        text.push_str(&format!("#SBATCH --time={}\n", plan.time));
        text.push_str(&format!("#SBATCH --output={}/%j.out\n", report_dir));
        text.push_str(&format!("#SBATCH --error={}/%j.err\n", report_dir));
        if let Some(name) = &plan.job_name {
            text.push_str(&format!("#SBATCH --job-name={}\n", name));
        }
        if let Some(nodelist) = &plan.nodelist {
            text.push_str(&format!("#SBATCH --nodelist={}\n", nodelist));
        }
        if let Some(exclude) = &plan.exclude {
            text.push_str(&format!("#SBATCH --exclude={}\n", exclude));
        }

        text.push_str(JOB_PRELUDE);
        text.push_str(&format!("{} {}\n", SRUN_LAUNCH, quoted));

        Ok(Self { text })
    }

    /// Script contents
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Write the script into `dir` under a timestamped name
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        self.write_as(&dir.join(script_file_name(Local::now())))
    }

    /// Write the script to an exact path, creating parent directories
    pub fn write_as(&self, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_path(parent)?;
            }
        }
        fs::write(path, &self.text).with_path(path)?;
        tracing::info!("Generated sbatch script: {}", path.display());
        Ok(path.to_path_buf())
    }
}

/// `job_YYYYmmdd_HHMMSS.sbatch`
pub fn script_file_name(at: DateTime<Local>) -> String {
    format!("job_{}.sbatch", at.format("%Y%m%d_%H%M%S"))
}

/// Join the command words for a shell, then quote the whole line so it
/// reaches `bash -lc` as one argument
fn quote_command(command: &[String]) -> Result<String> {
    let line = shlex::try_join(command.iter().map(String::as_str))
        .map_err(|e| WrapSlurmError::config(format!("Cannot quote command: {}", e)))?;
    shlex::try_quote(&line)
        .map(|quoted| quoted.into_owned())
        .map_err(|e| WrapSlurmError::config(format!("Cannot quote command: {}", e)))
}

/// Arguments for `srun` starting an interactive shell with the plan's resources
pub fn srun_args(plan: &ResourcePlan) -> Vec<String> {
    let mut args = vec![
        format!("--partition={}", plan.partition),
        format!("--nodes={}", plan.nodes),
        format!("--ntasks-per-node={}", plan.tasks_per_node),
        format!("--cpus-per-task={}", plan.cpus_per_task),
        format!("--mem={}", plan.memory),
        format!("--time={}", plan.time),
    ];
    if let Some(account) = &plan.account {
        args.insert(1, format!("--account={}", account));
    }
    if plan.gpus > 0 {
        args.push(format!("--gres=gpu:{}", plan.gpus));
    }
    if let Some(name) = &plan.job_name {
        args.push(format!("--job-name={}", name));
    }
    if let Some(nodelist) = &plan.nodelist {
        args.push(format!("--nodelist={}", nodelist));
    }
    if let Some(exclude) = &plan.exclude {
        args.push(format!("--exclude={}", exclude));
    }
    args.push("--pty".to_string());
    args.push("bash".to_string());
    args
}
