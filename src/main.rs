//! WrapSlurm CLI - friendly front-end for SLURM job submission and monitoring

use clap::Parser;
use console::{style, Term};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wrapslurm::config::{CancelArgs, CliArgs, Commands, DefaultsStore, LogArgs, SubmitArgs};
use wrapslurm::display::{
    parse_squeue, render_nodes, render_queue, render_summary, Highlight, NodeView,
};
use wrapslurm::error::{IoResultExt, Result};
use wrapslurm::inventory::{parse_scontrol_nodes, parse_sinfo, Inventory};
use wrapslurm::logwatch::{follow, job_log_path, latest_log, wait_for_file};
use wrapslurm::prompt::{ask_partition_and_gpus, ask_remaining, can_prompt};
use wrapslurm::script::{srun_args, SubmissionScript};
use wrapslurm::selector::{Selector, DEFAULT_REPORT_DIR};
use wrapslurm::slurm::{current_user, SlurmTools};

fn main() {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Initialize logging; RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(args.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Handle result
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn run(args: CliArgs) -> Result<()> {
    let store = DefaultsStore::locate(args.config.as_deref())?;
    let tools = SlurmTools::from_env();

    match &args.command {
        Commands::Submit(submit) => handle_submit(submit, &store, &tools),
        Commands::Log(log) => handle_log(log, &store),
        Commands::Queue { user } => {
            let entries = parse_squeue(&tools.queue(user.as_deref())?);
            println!("{}", render_queue(&entries, &Highlight::current()));
            Ok(())
        }
        Commands::Nodes { include_down, graph } => {
            let records = parse_scontrol_nodes(&tools.node_details()?);
            let nodes = NodeView::collect(&records, *include_down);
            println!("{}", render_nodes(&nodes, *graph));
            Ok(())
        }
        Commands::Cancel(cancel) => handle_cancel(cancel, &tools),
    }
}

fn handle_submit(args: &SubmitArgs, store: &DefaultsStore, tools: &SlurmTools) -> Result<()> {
    if args.save_defaults {
        let updates = args.to_defaults();
        if updates.is_empty() {
            println!("No values provided to save as defaults.");
            return Ok(());
        }
        let merged = store.load()?.merged_with(&updates);
        store.save(&merged)?;
        println!("Defaults saved to {}", store.path().display());
        return Ok(());
    }

    let defaults = store.load()?;
    let mut request = args.to_request();

    let inventory = match tools.node_inventory() {
        Ok(text) => Inventory::new(parse_sinfo(&text)),
        Err(e) if !request.needs_inventory(&defaults) => {
            tracing::warn!("Cluster inventory unavailable, using given values unchecked: {}", e);
            Inventory::empty()
        }
        Err(e) => return Err(e),
    };

    let detected_account = if request.has_account(&defaults) {
        None
    } else {
        current_user().and_then(|user| tools.default_account(&user))
    };
    let selector = Selector::new(&inventory, &defaults).with_detected_account(detected_account);
    let mut plan = selector.select(&request)?;

    if !args.no_prompt && can_prompt() {
        let mut term = Term::stderr();
        request = ask_partition_and_gpus(&mut term, &request, &plan, &inventory)?;
        plan = selector.select(&request)?;
        request = ask_remaining(&mut term, &request, &plan)?;
        plan = selector.select(&request)?;
    }

    if args.wants_interactive() {
        println!("{}", render_summary(&plan, None, None));
        let srun = srun_args(&plan);
        if args.dry_run {
            println!("\nDry run - interactive command:\n\nsrun {}", srun.join(" "));
            return Ok(());
        }
        println!("Starting interactive session with: srun {}", srun.join(" "));
        return tools.interactive(&srun);
    }

    let script = SubmissionScript::new(&plan, &args.command)?;
    if args.dry_run {
        println!("{}", render_summary(&plan, Some(args.command.as_slice()), None));
        println!("\nDry run - sbatch script preview:\n");
        print!("{}", script.text());
        return Ok(());
    }

    let script_path = script.write_to(&plan.script_dir)?;
    println!("{}", render_summary(&plan, Some(args.command.as_slice()), Some(script_path.as_path())));

    fs::create_dir_all(&plan.report_dir).with_path(&plan.report_dir)?;
    let job_id = tools.submit(&script_path)?;
    let stdout_log = job_log_path(&plan.report_dir, &job_id, false);
    let stderr_log = job_log_path(&plan.report_dir, &job_id, true);

    println!("{} {}", style("Job submitted:").green().bold(), job_id);
    println!("Stdout log: {}", stdout_log.display());
    println!("Stderr log: {}", stderr_log.display());
    println!("Monitor logs: tail -n 20 -f {}", stdout_log.display());
    Ok(())
}

fn handle_log(args: &LogArgs, store: &DefaultsStore) -> Result<()> {
    let report_dir = match &args.report_dir {
        Some(dir) => dir.clone(),
        None => store
            .load()?
            .report_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_DIR)),
    };

    let log_file = match &args.job_id {
        Some(job_id) => job_log_path(&report_dir, job_id, args.stderr),
        None => latest_log(&report_dir, args.stderr)?,
    };

    if !log_file.exists() {
        println!("Log file {} does not exist yet, waiting...", log_file.display());
        wait_for_file(&log_file, *args.poll_interval, None);
    }

    println!("Watching log file: {}", log_file.display());
    follow(&log_file, args.lines)
}

fn handle_cancel(args: &CancelArgs, tools: &SlurmTools) -> Result<()> {
    let stdout = tools.cancel(
        &args.job_ids,
        args.signal.as_deref(),
        args.user.as_deref(),
        &args.passthrough,
    )?;
    if !stdout.trim().is_empty() {
        println!("{}", stdout.trim_end());
    }

    let action = match &args.signal {
        Some(signal) => format!("Signal {} sent to", signal),
        None => "Cancellation requested for".to_string(),
    };
    if args.job_ids.is_empty() {
        if let Some(user) = &args.user {
            println!("{} all jobs of {}", action, user);
        }
    } else {
        println!("{} job(s): {}", action, args.job_ids.join(", "));
    }
    Ok(())
}
