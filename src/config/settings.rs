//! Command-line interface for WrapSlurm
//!
//! Defines the subcommands and their flags, and the conversions from
//! parsed flags into a [`ResourceRequest`] and into [`Defaults`].

use super::defaults::Defaults;
use crate::selector::ResourceRequest;
use crate::units::{MemorySize, TimeLimit};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// WrapSlurm - friendly front-end for SLURM job submission and monitoring
#[derive(Parser, Debug, Clone)]
#[command(name = "wrapslurm")]
#[command(author = "WrapSlurm Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Submit and manage SLURM jobs with sensible defaults and friendly output")]
#[command(long_about = r#"
WrapSlurm sits in front of sbatch, squeue, scontrol and scancel.

Commands:
  submit   Resolve resources (auto-detected from sinfo) and submit a batch job
  log      Follow the log of a job, or the newest log in the report directory
  queue    Show the job queue as a coloured table
  nodes    Show node utilisation
  cancel   Cancel one or more jobs

Examples:
  wrapslurm submit --gpus 2 python train.py --epochs 10
  wrapslurm submit -p cpu1 -c 8 --mem 32G --dry-run ./run.sh
  wrapslurm submit -p gp4d -A proj42 --save-defaults
  wrapslurm log --job-id 123456
  wrapslurm cancel 123456 123457 --signal USR1
"#)]
pub struct CliArgs {
    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path of the saved defaults file
    #[arg(long, env = "WRAPSLURM_CONFIG", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Generate an sbatch script and submit it (or start an interactive session)
    #[command(name = "submit", visible_alias = "run")]
    Submit(SubmitArgs),

    /// Follow a job log file
    #[command(name = "log")]
    Log(LogArgs),

    /// Show the job queue
    #[command(name = "queue")]
    Queue {
        /// Only show jobs of this user
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Show node information
    #[command(name = "nodes")]
    Nodes {
        /// Include nodes in 'down' or 'drain' states
        #[arg(long)]
        include_down: bool,

        /// Draw utilisation bars instead of numbers
        #[arg(long)]
        graph: bool,
    },

    /// Cancel jobs through scancel
    #[command(name = "cancel")]
    Cancel(CancelArgs),
}

/// Flags of the `submit` command
#[derive(Args, Debug, Clone, Default)]
pub struct SubmitArgs {
    /// Number of nodes to request
    #[arg(short = 'N', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub nodes: Option<u32>,

    /// Partition name to submit to
    #[arg(short = 'p', long)]
    pub partition: Option<String>,

    /// SLURM account to charge
    #[arg(short = 'A', long)]
    pub account: Option<String>,

    /// Tasks per node (default: 1)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub tasks_per_node: Option<u32>,

    /// CPU cores per task
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub cpus_per_task: Option<u32>,

    /// Memory per node (e.g. 50G, 512M)
    #[arg(long = "mem", visible_alias = "memory", value_name = "SIZE")]
    pub memory: Option<MemorySize>,

    /// GPUs per node
    #[arg(short = 'G', long)]
    pub gpus: Option<u32>,

    /// Job time limit (default: partition maximum when available)
    #[arg(short = 't', long, value_name = "TIME")]
    pub time: Option<TimeLimit>,

    /// Comma separated list of nodes to include
    #[arg(short = 'w', long)]
    pub nodelist: Option<String>,

    /// Comma separated list of nodes to exclude
    #[arg(short = 'x', long)]
    pub exclude: Option<String>,

    /// Job name shown in SLURM accounting
    #[arg(short = 'J', long)]
    pub job_name: Option<String>,

    /// Directory where SLURM writes job logs (default: ./slurm-report)
    #[arg(long, value_name = "DIR")]
    pub report_dir: Option<PathBuf>,

    /// Directory for generated sbatch scripts (default: ./slurm_run)
    #[arg(long, value_name = "DIR")]
    pub script_dir: Option<PathBuf>,

    /// Force an interactive srun session
    #[arg(short = 'i', long)]
    pub interactive: bool,

    /// Show the sbatch script without writing or submitting it
    #[arg(long)]
    pub dry_run: bool,

    /// Use auto-detected values without prompting
    #[arg(short = 'd', long = "defaults")]
    pub no_prompt: bool,

    /// Persist the provided options as defaults and exit
    #[arg(long)]
    pub save_defaults: bool,

    /// Command to execute for batch jobs (e.g. python train.py --epochs 10)
    #[arg(value_name = "COMMAND", trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl SubmitArgs {
    /// Resource values given on the command line
    pub fn to_request(&self) -> ResourceRequest {
        ResourceRequest {
            partition: self.partition.clone(),
            account: self.account.clone(),
            nodes: self.nodes,
            tasks_per_node: self.tasks_per_node,
            cpus_per_task: self.cpus_per_task,
            memory: self.memory,
            gpus: self.gpus,
            time: self.time.clone(),
            nodelist: self.nodelist.clone(),
            exclude: self.exclude.clone(),
            job_name: self.job_name.clone(),
            report_dir: self.report_dir.clone(),
            script_dir: self.script_dir.clone(),
        }
    }

    /// Options worth persisting with `--save-defaults`
    pub fn to_defaults(&self) -> Defaults {
        Defaults {
            partition: self.partition.clone(),
            account: self.account.clone(),
            nodes: self.nodes,
            tasks_per_node: self.tasks_per_node,
            cpus_per_task: self.cpus_per_task,
            memory: self.memory,
            gpus: self.gpus,
            time: self.time.clone(),
            report_dir: self.report_dir.clone(),
            script_dir: self.script_dir.clone(),
        }
    }

    /// Whether the job should run as an interactive session
    ///
    /// True when forced, when no command is given, or when the command is
    /// just `bash`.
    pub fn wants_interactive(&self) -> bool {
        self.interactive
            || self.command.is_empty()
            || (self.command.len() == 1 && self.command[0].trim() == "bash")
    }
}

/// Flags of the `log` command
#[derive(Args, Debug, Clone)]
pub struct LogArgs {
    /// Job whose log to follow (default: newest log in the report directory)
    #[arg(short = 'j', long = "job-id", value_name = "ID")]
    pub job_id: Option<String>,

    /// Directory containing SLURM log files
    #[arg(long, value_name = "DIR")]
    pub report_dir: Option<PathBuf>,

    /// Follow the .err file instead of .out
    #[arg(long)]
    pub stderr: bool,

    /// Number of trailing lines to show
    #[arg(short = 'n', long, default_value = "20")]
    pub lines: usize,

    /// How often to check for a log file that does not exist yet
    #[arg(long, default_value = "2s", value_name = "DURATION")]
    pub poll_interval: humantime::Duration,
}

/// Flags of the `cancel` command
#[derive(Args, Debug, Clone)]
pub struct CancelArgs {
    /// One or more job IDs to cancel
    #[arg(value_name = "JOB_ID")]
    pub job_ids: Vec<String>,

    /// Signal to send instead of cancelling (passed to scancel)
    #[arg(short, long)]
    pub signal: Option<String>,

    /// Restrict to jobs of this user (passed to scancel)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Extra scancel flags, given after `--`
    #[arg(last = true, value_name = "SCANCEL_ARGS")]
    pub passthrough: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("wrapslurm").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_submit_flags_and_trailing_command() {
        let cli = parse(&[
            "submit", "-p", "gp4d", "-G", "2", "--mem", "64G", "-t", "1-00:00:00",
            "python", "train.py", "--epochs", "10",
        ]);
        let Commands::Submit(args) = cli.command else {
            panic!("expected submit");
        };
        assert_eq!(args.partition.as_deref(), Some("gp4d"));
        assert_eq!(args.gpus, Some(2));
        assert_eq!(args.memory, Some(MemorySize::from_gb(64)));
        assert_eq!(args.time.as_ref().map(|t| t.as_str()), Some("1-00:00:00"));
        assert_eq!(args.command, vec!["python", "train.py", "--epochs", "10"]);
        assert!(!args.wants_interactive());
    }

    #[test]
    fn test_memory_alias_and_invalid_time() {
        let cli = parse(&["submit", "--memory", "512M", "./run.sh"]);
        let Commands::Submit(args) = cli.command else {
            panic!("expected submit");
        };
        assert_eq!(args.memory, Some(MemorySize::from_mb(512)));

        let bad = CliArgs::try_parse_from(["wrapslurm", "submit", "-t", "soon", "x"]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_zero_counts_rejected() {
        for flag in ["-N", "-n", "-c"] {
            let bad = CliArgs::try_parse_from(["wrapslurm", "submit", flag, "0", "x"]);
            assert!(bad.is_err(), "{} 0 should be rejected", flag);
        }
        let cli = parse(&["submit", "-N", "1", "-n", "2", "-c", "3", "-G", "0", "x"]);
        let Commands::Submit(args) = cli.command else {
            panic!("expected submit");
        };
        assert_eq!((args.nodes, args.tasks_per_node, args.cpus_per_task), (Some(1), Some(2), Some(3)));
        assert_eq!(args.gpus, Some(0));
    }

    #[test]
    fn test_interactive_detection() {
        let mut args = SubmitArgs::default();
        assert!(args.wants_interactive());
        args.command = vec!["bash".into()];
        assert!(args.wants_interactive());
        args.command = vec!["bash".into(), "run.sh".into()];
        assert!(!args.wants_interactive());
        args.interactive = true;
        assert!(args.wants_interactive());
    }

    #[test]
    fn test_cancel_passthrough() {
        let cli = parse(&["cancel", "101", "102", "--signal", "USR1", "--", "--state=PENDING"]);
        let Commands::Cancel(args) = cli.command else {
            panic!("expected cancel");
        };
        assert_eq!(args.job_ids, vec!["101", "102"]);
        assert_eq!(args.signal.as_deref(), Some("USR1"));
        assert_eq!(args.passthrough, vec!["--state=PENDING"]);
    }

    #[test]
    fn test_log_defaults() {
        let cli = parse(&["log", "--job-id", "77"]);
        let Commands::Log(args) = cli.command else {
            panic!("expected log");
        };
        assert_eq!(args.job_id.as_deref(), Some("77"));
        assert_eq!(args.lines, 20);
        assert_eq!(*args.poll_interval, std::time::Duration::from_secs(2));
    }

    #[test]
    fn test_to_defaults_only_carries_given_values() {
        let cli = parse(&["submit", "-p", "cpu1", "-A", "proj", "--save-defaults"]);
        let Commands::Submit(args) = cli.command else {
            panic!("expected submit");
        };
        let defaults = args.to_defaults();
        assert_eq!(defaults.partition.as_deref(), Some("cpu1"));
        assert_eq!(defaults.account.as_deref(), Some("proj"));
        assert!(defaults.nodes.is_none());
        assert!(args.save_defaults);
    }
}
