//! Following job log files
//!
//! SLURM writes `<report_dir>/<job id>.out` and `.err` once the job starts,
//! so a freshly submitted job may have no log yet. We wait for the file and
//! then hand over to `tail -F`.

use crate::error::{IoResultExt, Result, WrapSlurmError};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

/// Extension of a job's stdout (or stderr) log
fn extension(stderr: bool) -> &'static str {
    if stderr {
        "err"
    } else {
        "out"
    }
}

/// Log file of a specific job
pub fn job_log_path(report_dir: &Path, job_id: &str, stderr: bool) -> PathBuf {
    report_dir.join(format!("{}.{}", job_id.trim(), extension(stderr)))
}

/// Most recently modified log in `report_dir`
pub fn latest_log(report_dir: &Path, stderr: bool) -> Result<PathBuf> {
    let wanted = extension(stderr);
    let entries = match fs::read_dir(report_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(WrapSlurmError::NoLogFiles(report_dir.to_path_buf()));
        }
        Err(e) => return Err(WrapSlurmError::io(report_dir, e)),
    };

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry.with_path(report_dir)?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(wanted) || !path.is_file() {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .with_path(&path)?;
        // Ties resolve to the larger name so the choice is stable.
        let newer = match &newest {
            Some((time, best)) => modified > *time || (modified == *time && path > *best),
            None => true,
        };
        if newer {
            newest = Some((modified, path));
        }
    }

    newest
        .map(|(_, path)| path)
        .ok_or_else(|| WrapSlurmError::NoLogFiles(report_dir.to_path_buf()))
}

/// Block until `path` exists, checking every `interval`
///
/// Returns `false` if `timeout` elapsed first.
pub fn wait_for_file(path: &Path, interval: Duration, timeout: Option<Duration>) -> bool {
    let started = Instant::now();
    let mut announced = false;

    while !path.exists() {
        if timeout.map_or(false, |limit| started.elapsed() >= limit) {
            return false;
        }
        if !announced {
            tracing::info!(
                "Waiting for {} to appear (checking every {})",
                path.display(),
                humantime::format_duration(interval)
            );
            announced = true;
        }
        thread::sleep(interval);
    }
    true
}

/// Run `tail -n <lines> -F <path>` in the foreground until it exits
pub fn follow(path: &Path, lines: usize) -> Result<()> {
    let tail = std::env::var("WRAPSLURM_TAIL").unwrap_or_else(|_| "tail".to_string());
    tracing::debug!("Running command: {} -n {} -F {}", tail, lines, path.display());

    let status = Command::new(&tail)
        .arg("-n")
        .arg(lines.to_string())
        .arg("-F")
        .arg(path)
        .status()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WrapSlurmError::ToolNotFound { tool: tail.clone() }
            } else {
                WrapSlurmError::io(path, e)
            }
        })?;

    match status.code() {
        Some(0) | None => Ok(()),
        Some(code) => Err(WrapSlurmError::ToolFailed {
            tool: tail,
            code,
            stderr: String::new(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_job_log_path() {
        let dir = Path::new("./slurm-report");
        assert_eq!(job_log_path(dir, "4242", false), dir.join("4242.out"));
        assert_eq!(job_log_path(dir, " 4242 ", true), dir.join("4242.err"));
    }

    #[test]
    fn test_latest_log_picks_newest() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("100.out");
        let new = dir.path().join("101.out");
        fs::write(&old, "old").unwrap();
        fs::write(&new, "new").unwrap();
        fs::write(dir.path().join("102.err"), "err").unwrap();

        let past = SystemTime::now() - Duration::from_secs(3600);
        File::options().write(true).open(&old).unwrap().set_modified(past).unwrap();

        assert_eq!(latest_log(dir.path(), false).unwrap(), new);
        assert_eq!(latest_log(dir.path(), true).unwrap(), dir.path().join("102.err"));
    }

    #[test]
    fn test_latest_log_empty_or_missing() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            latest_log(dir.path(), false),
            Err(WrapSlurmError::NoLogFiles(_))
        ));
        assert!(matches!(
            latest_log(&dir.path().join("missing"), false),
            Err(WrapSlurmError::NoLogFiles(_))
        ));
    }

    #[test]
    fn test_wait_for_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("7.out");
        assert!(!wait_for_file(&path, Duration::from_millis(5), Some(Duration::from_millis(20))));

        let writer_path = path.clone();
        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            fs::write(writer_path, "started").unwrap();
        });
        assert!(wait_for_file(&path, Duration::from_millis(5), Some(Duration::from_secs(10))));
        writer.join().unwrap();
    }
}
