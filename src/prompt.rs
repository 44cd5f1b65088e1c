//! Terminal prompts for values the user did not supply
//!
//! Prompting runs in two stages. Partition and GPU count come first
//! because every other suggestion depends on them; the selector is then
//! re-run and the remaining fields are offered with the new suggestions.
//! Answers are fed back as command-line values.

use crate::error::{IoResultExt, Result};
use crate::inventory::Inventory;
use crate::selector::{Field, ResourcePlan, ResourceRequest};
use console::{style, Term};
use std::fmt::Display;
use std::io;
use std::str::FromStr;

/// Line-oriented question/answer channel
pub trait Ask {
    /// Show `question` and read one line of input
    fn ask(&mut self, question: &str) -> io::Result<String>;
    /// Show an informational line
    fn say(&mut self, message: &str) -> io::Result<()>;
}

impl Ask for Term {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        self.write_str(question)?;
        self.read_line()
    }

    fn say(&mut self, message: &str) -> io::Result<()> {
        self.write_line(message)
    }
}

/// Whether prompts can be shown at all
pub fn can_prompt() -> bool {
    console::user_attended() && Term::stderr().is_term()
}

fn needs_answer(plan: &ResourcePlan, field: Field) -> bool {
    !plan.source(field).is_user_supplied()
}

/// Ask until the answer parses; an empty answer keeps `default`
fn ask_value<T, A>(ask: &mut A, label: &str, default: &T) -> Result<T>
where
    T: FromStr + Display + Clone,
    T::Err: Display,
    A: Ask,
{
    loop {
        let question = format!("{} [{}]: ", style(label).bold(), style(default).cyan());
        let answer = ask.ask(&question).with_path("<stdin>")?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(default.clone());
        }
        match answer.parse::<T>() {
            Ok(value) => return Ok(value),
            Err(e) => {
                ask.say(&style(format!("  Invalid value: {}", e)).red().to_string())
                    .with_path("<stdin>")?;
            }
        }
    }
}

/// Stage one: partition and GPUs
pub fn ask_partition_and_gpus<A: Ask>(
    ask: &mut A,
    request: &ResourceRequest,
    plan: &ResourcePlan,
    inventory: &Inventory,
) -> Result<ResourceRequest> {
    let mut answered = request.clone();

    if needs_answer(plan, Field::Partition) {
        let partitions = inventory.partitions();
        if !partitions.is_empty() {
            ask.say("Available partitions:").with_path("<stdin>")?;
            for p in &partitions {
                let line = format!(
                    "  {:<16} {:>3} idle / {:>3} nodes, {} CPUs, {} GPUs, {} per node",
                    p.name, p.idle_nodes, p.nodes, p.max.cpus, p.max.gpus, p.max.memory
                );
                ask.say(&line).with_path("<stdin>")?;
            }
        }
        loop {
            let name: String = ask_value(ask, "Partition", &plan.partition)?;
            if partitions.is_empty() || partitions.iter().any(|p| p.name == name) {
                answered.partition = Some(name);
                break;
            }
            ask.say(&style(format!("  Unknown partition '{}'", name)).red().to_string())
                .with_path("<stdin>")?;
        }
    }

    if needs_answer(plan, Field::Gpus) {
        answered.gpus = Some(ask_value(ask, "GPUs per node", &plan.gpus)?);
    }

    Ok(answered)
}

/// Stage two: everything else that was not supplied
pub fn ask_remaining<A: Ask>(
    ask: &mut A,
    request: &ResourceRequest,
    plan: &ResourcePlan,
) -> Result<ResourceRequest> {
    let mut answered = request.clone();

    if needs_answer(plan, Field::Account) {
        let suggestion = plan.account.clone().unwrap_or_default();
        let question = format!(
            "{} [{}]: ",
            style("Account").bold(),
            style(if suggestion.is_empty() { "none" } else { suggestion.as_str() }).cyan()
        );
        let account = ask.ask(&question).with_path("<stdin>")?.trim().to_string();
        answered.account = match (account.is_empty(), suggestion.is_empty()) {
            (false, _) => Some(account),
            (true, false) => Some(suggestion),
            (true, true) => None,
        };
    }
    if needs_answer(plan, Field::Nodes) {
        answered.nodes = Some(ask_value(ask, "Nodes", &plan.nodes)?);
    }
    if needs_answer(plan, Field::TasksPerNode) {
        answered.tasks_per_node = Some(ask_value(ask, "Tasks per node", &plan.tasks_per_node)?);
    }
    if needs_answer(plan, Field::CpusPerTask) {
        answered.cpus_per_task = Some(ask_value(ask, "CPUs per task", &plan.cpus_per_task)?);
    }
    if needs_answer(plan, Field::Memory) {
        answered.memory = Some(ask_value(ask, "Memory per node", &plan.memory)?);
    }
    if needs_answer(plan, Field::Time) {
        answered.time = Some(ask_value(ask, "Time limit", &plan.time)?);
    }

    Ok(answered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Defaults;
    use crate::inventory::{NodeRecord, NodeState};
    use crate::selector::{FieldSource, Selector};
    use crate::units::MemorySize;
    use std::collections::VecDeque;

    struct Scripted {
        answers: VecDeque<&'static str>,
        said: Vec<String>,
        asked: Vec<String>,
    }

    impl Scripted {
        fn new(answers: &[&'static str]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                said: Vec::new(),
                asked: Vec::new(),
            }
        }
    }

    impl Ask for Scripted {
        fn ask(&mut self, question: &str) -> io::Result<String> {
            self.asked.push(console::strip_ansi_codes(question).to_string());
            self.answers
                .pop_front()
                .map(str::to_string)
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more answers"))
        }

        fn say(&mut self, message: &str) -> io::Result<()> {
            self.said.push(console::strip_ansi_codes(message).to_string());
            Ok(())
        }
    }

    fn inventory() -> Inventory {
        let node = |partition: &str, name: &str, cpus: u32, gpus: u32| NodeRecord {
            partition: partition.to_string(),
            name: name.to_string(),
            cpus_total: cpus,
            cpus_alloc: 0,
            memory_mb: 256 * 1024,
            memory_alloc_mb: 0,
            gpus_total: gpus,
            gpus_alloc: 0,
            state: NodeState::Idle,
            time_limit: Some("1-00:00:00".to_string()),
            cpu_load: None,
        };
        Inventory::new(vec![
            node("gpu", "g1", 64, 8),
            node("gpu", "g2", 64, 8),
            node("cpu", "c1", 32, 0),
        ])
    }

    #[test]
    fn test_stage_one_rejects_unknown_partition() {
        let inventory = inventory();
        let defaults = Defaults::default();
        let request = ResourceRequest::default();
        let plan = Selector::new(&inventory, &defaults).select(&request).unwrap();

        let mut ask = Scripted::new(&["nope", "cpu", "0"]);
        let answered = ask_partition_and_gpus(&mut ask, &request, &plan, &inventory).unwrap();

        assert_eq!(answered.partition.as_deref(), Some("cpu"));
        assert_eq!(answered.gpus, Some(0));
        assert!(ask.said.iter().any(|l| l.contains("Unknown partition 'nope'")));
        assert!(ask.asked[0].contains("Partition [gpu]"));
    }

    #[test]
    fn test_empty_answers_keep_suggestions() {
        let inventory = inventory();
        let defaults = Defaults::default();
        let request = ResourceRequest {
            partition: Some("gpu".into()),
            gpus: Some(2),
            ..Default::default()
        };
        let plan = Selector::new(&inventory, &defaults).select(&request).unwrap();

        let mut ask = Scripted::new(&["", "", "", "", "", ""]);
        let answered = ask_remaining(&mut ask, &request, &plan).unwrap();
        assert_eq!(answered.account, None);
        assert_eq!(answered.cpus_per_task, Some(16));
        assert_eq!(answered.memory, Some(MemorySize::from_gb(64)));
        assert_eq!(answered.time.as_ref().map(|t| t.as_str()), Some("1-00:00:00"));

        let replan = Selector::new(&inventory, &defaults).select(&answered).unwrap();
        assert_eq!(replan.source(Field::CpusPerTask), FieldSource::Cli);
    }

    #[test]
    fn test_invalid_value_is_asked_again() {
        let inventory = inventory();
        let defaults = Defaults {
            account: Some("proj".into()),
            ..Default::default()
        };
        let request = ResourceRequest {
            partition: Some("cpu".into()),
            nodes: Some(1),
            tasks_per_node: Some(1),
            cpus_per_task: Some(4),
            memory: Some(MemorySize::from_gb(8)),
            ..Default::default()
        };
        let plan = Selector::new(&inventory, &defaults).select(&request).unwrap();

        let mut ask = Scripted::new(&["tomorrow", "2:00:00"]);
        let answered = ask_remaining(&mut ask, &request, &plan).unwrap();
        assert_eq!(answered.time.as_ref().map(|t| t.as_str()), Some("2:00:00"));
        assert_eq!(ask.asked.len(), 2);
        assert!(ask.said[0].contains("Invalid value"));
    }
}
