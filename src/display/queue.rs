//! Job queue listing

use super::render_table;
use console::style;
use std::collections::HashSet;
use tabled::Tabled;

/// Fields in one `squeue -o %i|%P|%j|%u|%T|%M|%D|%R` line
const QUEUE_FIELDS: usize = 8;

/// One job as reported by squeue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub job_id: String,
    pub partition: String,
    pub name: String,
    pub user: String,
    pub state: String,
    pub elapsed: String,
    pub nodes: String,
    /// Node list when running, pending reason otherwise
    pub nodelist: String,
}

/// Parse squeue output, skipping lines with too few fields
pub fn parse_squeue(text: &str) -> Vec<QueueEntry> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let parts: Vec<&str> = line.splitn(QUEUE_FIELDS, '|').map(str::trim).collect();
            if parts.len() < QUEUE_FIELDS {
                tracing::debug!("Skipping short squeue line: {}", line);
                return None;
            }
            Some(QueueEntry {
                job_id: parts[0].to_string(),
                partition: parts[1].to_string(),
                name: parts[2].to_string(),
                user: parts[3].to_string(),
                state: parts[4].to_string(),
                elapsed: parts[5].to_string(),
                nodes: parts[6].to_string(),
                nodelist: parts[7].to_string(),
            })
        })
        .collect()
}

/// Colour class of a job state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStateClass {
    Running,
    Pending,
    Completing,
    Failed,
    Other,
}

impl JobStateClass {
    /// Classify a long (`RUNNING`) or compact (`R`) squeue state
    pub fn of(state: &str) -> Self {
        match state.trim().to_uppercase().as_str() {
            "RUNNING" | "R" => JobStateClass::Running,
            "PENDING" | "PD" | "CONFIGURING" | "CF" => JobStateClass::Pending,
            "COMPLETING" | "CG" => JobStateClass::Completing,
            "FAILED" | "F" | "TIMEOUT" | "TO" | "NODE_FAIL" | "NF" | "OUT_OF_MEMORY" | "OOM"
            | "BOOT_FAIL" | "BF" | "DEADLINE" | "DL" => JobStateClass::Failed,
            _ => JobStateClass::Other,
        }
    }

    fn paint(&self, state: &str) -> String {
        let styled = style(state).bold();
        match self {
            JobStateClass::Running => styled.green(),
            JobStateClass::Pending => styled.yellow(),
            JobStateClass::Completing => styled.blue(),
            JobStateClass::Failed => styled.red(),
            JobStateClass::Other => styled.cyan(),
        }
        .to_string()
    }
}

/// Users whose jobs are highlighted: the caller and their group
#[derive(Debug, Clone, Default)]
pub struct Highlight {
    users: HashSet<String>,
}

impl Highlight {
    /// Highlight exactly these users
    pub fn users<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            users: users.into_iter().map(Into::into).collect(),
        }
    }

    /// The current user plus members of their primary group
    #[cfg(unix)]
    pub fn current() -> Self {
        use nix::unistd::{getgid, Group};

        let mut users: HashSet<String> = crate::slurm::current_user().into_iter().collect();
        match Group::from_gid(getgid()) {
            Ok(Some(group)) => users.extend(group.mem),
            Ok(None) => {}
            Err(e) => tracing::debug!("Group lookup failed: {}", e),
        }
        Self { users }
    }

    /// The current user
    #[cfg(not(unix))]
    pub fn current() -> Self {
        Self::users(crate::slurm::current_user())
    }

    /// Whether `user`'s jobs stand out
    pub fn contains(&self, user: &str) -> bool {
        self.users.contains(user)
    }
}

#[derive(Tabled)]
struct QueueRow {
    #[tabled(rename = "JobID")]
    job_id: String,
    #[tabled(rename = "Partition")]
    partition: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Time")]
    elapsed: String,
    #[tabled(rename = "Nodes")]
    nodes: String,
    #[tabled(rename = "NodeList(Reason)")]
    nodelist: String,
}

/// Render the queue table
pub fn render_queue(entries: &[QueueEntry], highlight: &Highlight) -> String {
    if entries.is_empty() {
        return "No jobs in the queue.".to_string();
    }

    let rows: Vec<QueueRow> = entries
        .iter()
        .map(|entry| {
            let mine = highlight.contains(&entry.user);
            let (job_id, user) = if mine {
                (
                    style(&entry.job_id).yellow().bold().to_string(),
                    style(&entry.user).yellow().bold().to_string(),
                )
            } else {
                (style(&entry.job_id).bold().to_string(), entry.user.clone())
            };

            QueueRow {
                job_id,
                partition: entry.partition.clone(),
                name: entry.name.clone(),
                user,
                state: JobStateClass::of(&entry.state).paint(&entry.state),
                elapsed: entry.elapsed.clone(),
                nodes: entry.nodes.clone(),
                nodelist: entry.nodelist.clone(),
            }
        })
        .collect();

    render_table(&rows)
}
