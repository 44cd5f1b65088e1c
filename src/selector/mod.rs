//! Resource selection
//!
//! Resolves every field of a [`ResourcePlan`] through the cascade
//! command line → saved default → inventory auto-detection → built-in
//! constant. Selection is a pure function of its inputs.

mod plan;

pub use plan::*;

use crate::config::Defaults;
use crate::error::{Result, WrapSlurmError};
use crate::inventory::{Inventory, NodeShape, PartitionSummary};
use crate::units::{MemorySize, TimeLimit};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Picks concrete resources for a request
pub struct Selector<'a> {
    inventory: &'a Inventory,
    defaults: &'a Defaults,
    detected_account: Option<String>,
}

/// Explicit resource amounts a partition has to accommodate
#[derive(Debug, Clone, Copy, Default)]
struct Demand {
    nodes: Option<u32>,
    cpus_per_node: Option<u64>,
    /// Flag and value the CPU demand comes from
    cpu_origin: (&'static str, u32),
    memory: Option<MemorySize>,
    gpus: Option<u32>,
}

impl Demand {
    fn fits(&self, partition: &PartitionSummary) -> bool {
        self.nodes.map_or(true, |n| n as usize <= partition.nodes)
            && self
                .cpus_per_node
                .map_or(true, |c| c <= u64::from(partition.max.cpus))
            && self.memory.map_or(true, |m| m <= partition.max.memory)
            && self.gpus.map_or(true, |g| g <= partition.max.gpus)
    }
}

/// Record which level supplied a value
fn cascade<T>(
    sources: &mut BTreeMap<Field, FieldSource>,
    field: Field,
    cli: Option<T>,
    default: Option<T>,
) -> Option<T> {
    if let Some(value) = cli {
        sources.insert(field, FieldSource::Cli);
        return Some(value);
    }
    if let Some(value) = default {
        sources.insert(field, FieldSource::Default);
        return Some(value);
    }
    None
}

/// Counts of nodes, tasks and CPUs start at one
fn at_least_one(flag: &str, value: Option<u32>) -> Result<Option<u32>> {
    match value {
        Some(0) => Err(WrapSlurmError::config(format!("{} must be at least 1", flag))),
        other => Ok(other),
    }
}

impl<'a> Selector<'a> {
    /// Create a selector over one inventory snapshot and the saved defaults
    pub fn new(inventory: &'a Inventory, defaults: &'a Defaults) -> Self {
        Self {
            inventory,
            defaults,
            detected_account: None,
        }
    }

    /// Account reported by the accounting database, used last
    pub fn with_detected_account(mut self, account: Option<String>) -> Self {
        self.detected_account = account;
        self
    }

    /// Resolve a request into a plan
    pub fn select(&self, request: &ResourceRequest) -> Result<ResourcePlan> {
        let defaults = self.defaults;
        let mut sources = BTreeMap::new();

        let partition = cascade(
            &mut sources,
            Field::Partition,
            request.partition.clone(),
            defaults.partition.clone(),
        );
        let nodes = at_least_one(
            "nodes",
            cascade(&mut sources, Field::Nodes, request.nodes, defaults.nodes),
        )?;
        let tasks_per_node = at_least_one(
            "tasks-per-node",
            cascade(
                &mut sources,
                Field::TasksPerNode,
                request.tasks_per_node,
                defaults.tasks_per_node,
            ),
        )?;
        let cpus_per_task = at_least_one(
            "cpus-per-task",
            cascade(
                &mut sources,
                Field::CpusPerTask,
                request.cpus_per_task,
                defaults.cpus_per_task,
            ),
        )?;
        let memory = cascade(&mut sources, Field::Memory, request.memory, defaults.memory);
        let gpus = cascade(&mut sources, Field::Gpus, request.gpus, defaults.gpus);
        let time = cascade(
            &mut sources,
            Field::Time,
            request.time.clone(),
            defaults.time.clone(),
        );
        let account = cascade(
            &mut sources,
            Field::Account,
            request.account.clone(),
            defaults.account.clone(),
        );
        let report_dir = cascade(
            &mut sources,
            Field::ReportDir,
            request.report_dir.clone(),
            defaults.report_dir.clone(),
        );
        let script_dir = cascade(
            &mut sources,
            Field::ScriptDir,
            request.script_dir.clone(),
            defaults.script_dir.clone(),
        );

        let nodes = nodes.unwrap_or_else(|| {
            sources.insert(Field::Nodes, FieldSource::Fallback);
            1
        });
        let tasks_per_node = tasks_per_node.unwrap_or_else(|| {
            sources.insert(Field::TasksPerNode, FieldSource::Fallback);
            1
        });

        // Every task needs at least one CPU, even when the CPU count is left to auto-detection.
        let tasks_given = sources
            .get(&Field::TasksPerNode)
            .map_or(false, |s| s.is_user_supplied());
        let cpus_per_node = match cpus_per_task {
            Some(cpus) => Some(u64::from(cpus) * u64::from(tasks_per_node)),
            None if tasks_given => Some(u64::from(tasks_per_node)),
            None => None,
        };
        let cpu_origin = match cpus_per_task {
            Some(cpus) => ("cpus-per-task", cpus),
            None => ("tasks-per-node", tasks_per_node),
        };
        let demand = Demand {
            nodes: sources
                .get(&Field::Nodes)
                .filter(|s| s.is_user_supplied())
                .map(|_| nodes),
            cpus_per_node,
            cpu_origin,
            memory,
            gpus,
        };

        let summary = self.resolve_partition(partition.as_deref(), &demand)?;
        let partition = match (&summary, partition) {
            (Some(summary), None) => {
                sources.insert(Field::Partition, FieldSource::Auto);
                summary.name.clone()
            }
            (_, Some(name)) => name,
            (None, None) => return Err(WrapSlurmError::InventoryUnavailable("partition")),
        };

        let gpus = match (gpus, &summary) {
            (Some(gpus), _) => gpus,
            (None, Some(summary)) => {
                sources.insert(Field::Gpus, FieldSource::Auto);
                summary.max.gpus
            }
            (None, None) => {
                sources.insert(Field::Gpus, FieldSource::Fallback);
                0
            }
        };

        let gpu_shape = summary.as_ref().and_then(|s| s.gpu_shape);
        let cpus_per_task = match (cpus_per_task, &summary) {
            (Some(cpus), _) => cpus,
            (None, Some(summary)) => {
                sources.insert(Field::CpusPerTask, FieldSource::Auto);
                auto_cpus_per_task(summary.max, gpu_shape, gpus, tasks_per_node)
            }
            (None, None) => {
                sources.insert(Field::CpusPerTask, FieldSource::Fallback);
                1
            }
        };

        let memory = match (memory, &summary) {
            (Some(memory), _) => memory,
            (None, Some(summary)) if summary.max.memory.megabytes() > 0 => {
                sources.insert(Field::Memory, FieldSource::Auto);
                auto_memory(summary.max, gpu_shape, gpus)
            }
            _ => {
                sources.insert(Field::Memory, FieldSource::Fallback);
                FALLBACK_MEMORY
            }
        };

        let time = match (time, summary.as_ref().and_then(|s| s.max_time())) {
            (Some(time), _) => time,
            (None, Some(max_time)) => {
                sources.insert(Field::Time, FieldSource::Auto);
                max_time
            }
            (None, None) => {
                sources.insert(Field::Time, FieldSource::Fallback);
                FALLBACK_TIME.parse::<TimeLimit>().map_err(WrapSlurmError::config)?
            }
        };

        let account = account.or_else(|| {
            let detected = self.detected_account.clone();
            let source = if detected.is_some() {
                FieldSource::Auto
            } else {
                FieldSource::Fallback
            };
            sources.insert(Field::Account, source);
            detected
        });

        let report_dir = report_dir.unwrap_or_else(|| {
            sources.insert(Field::ReportDir, FieldSource::Fallback);
            PathBuf::from(DEFAULT_REPORT_DIR)
        });
        let script_dir = script_dir.unwrap_or_else(|| {
            sources.insert(Field::ScriptDir, FieldSource::Fallback);
            PathBuf::from(DEFAULT_SCRIPT_DIR)
        });

        let plan = ResourcePlan {
            partition,
            account,
            nodes,
            tasks_per_node,
            cpus_per_task,
            memory,
            gpus,
            time,
            nodelist: request.nodelist.clone(),
            exclude: request.exclude.clone(),
            job_name: request.job_name.clone(),
            report_dir,
            script_dir,
            sources,
        };

        if let Some(summary) = &summary {
            check_capacity(&plan, summary)?;
        }

        tracing::debug!(
            "Resolved plan: partition={} nodes={} tasks={} cpus={} mem={} gpus={} time={}",
            plan.partition,
            plan.nodes,
            plan.tasks_per_node,
            plan.cpus_per_task,
            plan.memory,
            plan.gpus,
            plan.time
        );
        Ok(plan)
    }

    /// Look up the named partition, or auto-select one
    ///
    /// `None` means the inventory is empty and nothing can be checked.
    fn resolve_partition(
        &self,
        name: Option<&str>,
        demand: &Demand,
    ) -> Result<Option<PartitionSummary>> {
        if self.inventory.is_empty() {
            return Ok(None);
        }

        match name {
            Some(name) => self
                .inventory
                .partition(name)
                .map(Some)
                .ok_or_else(|| WrapSlurmError::UnknownPartition {
                    partition: name.to_string(),
                    available: self.inventory.partition_names(),
                }),
            None => self.auto_partition(demand).map(Some),
        }
    }

    /// Partition with the most idle nodes among up partitions that fit
    /// the explicit demand; ties go to the alphabetically first name.
    fn auto_partition(&self, demand: &Demand) -> Result<PartitionSummary> {
        let up: Vec<PartitionSummary> = self
            .inventory
            .partitions()
            .into_iter()
            .filter(PartitionSummary::is_up)
            .collect();
        if up.is_empty() {
            return Err(WrapSlurmError::NoPartitionUp);
        }

        let chosen = up
            .into_iter()
            .filter(|p| demand.fits(p))
            .max_by(|a, b| {
                a.idle_nodes
                    .cmp(&b.idle_nodes)
                    .then_with(|| b.name.cmp(&a.name))
            });

        match chosen {
            Some(partition) => {
                tracing::info!(
                    "Auto-selected partition '{}' ({} idle nodes)",
                    partition.name,
                    partition.idle_nodes
                );
                Ok(partition)
            }
            None => Err(self.explain_no_fit(demand)),
        }
    }

    fn explain_no_fit(&self, demand: &Demand) -> WrapSlurmError {
        let max = self.inventory.cluster_max();
        let scope = "in the cluster";

        if demand.cpus_per_node.map_or(false, |c| c > u64::from(max.cpus)) {
            let (field, requested) = demand.cpu_origin;
            return WrapSlurmError::unsatisfiable(
                field,
                requested,
                format!("{} CPUs", max.cpus),
                scope,
            );
        }
        if let Some(memory) = demand.memory.filter(|m| *m > max.memory) {
            return WrapSlurmError::unsatisfiable("mem", memory, max.memory, scope);
        }
        if let Some(gpus) = demand.gpus.filter(|g| *g > max.gpus) {
            return WrapSlurmError::unsatisfiable("gpus", gpus, format!("{} GPUs", max.gpus), scope);
        }
        if let Some(nodes) = demand.nodes {
            let largest = self
                .inventory
                .partitions()
                .iter()
                .map(|p| p.nodes)
                .max()
                .unwrap_or(0);
            if nodes as usize > largest {
                return WrapSlurmError::Unsatisfiable {
                    field: "nodes",
                    requested: nodes.to_string(),
                    limit: format!("{} nodes", largest),
                    scope: "count of any partition".to_string(),
                };
            }
        }
        WrapSlurmError::config(
            "No up partition can satisfy the requested combination of nodes, CPUs, memory and GPUs",
        )
    }
}

/// CPUs per task when the user did not say: the per-GPU share of the
/// partition's GPU node, or the whole node without GPUs
fn auto_cpus_per_task(
    max: NodeShape,
    gpu_shape: Option<NodeShape>,
    gpus: u32,
    tasks_per_node: u32,
) -> u32 {
    let per_node = match gpu_shape.and_then(|shape| shape.cpus_per_gpu()) {
        Some(ratio) if gpus > 0 => ratio.saturating_mul(gpus).min(max.cpus),
        _ => max.cpus,
    };
    (per_node / tasks_per_node.max(1)).max(1)
}

/// Memory when the user did not say: scaled by GPU share, or the whole node
fn auto_memory(max: NodeShape, gpu_shape: Option<NodeShape>, gpus: u32) -> MemorySize {
    match gpu_shape {
        Some(shape) if gpus > 0 && shape.gpus > 0 => shape
            .memory
            .scaled(u64::from(gpus), u64::from(shape.gpus))
            .min(max.memory),
        _ => max.memory,
    }
}

/// Reject plans that no node of the partition can hold
fn check_capacity(plan: &ResourcePlan, summary: &PartitionSummary) -> Result<()> {
    let scope = format!("in partition '{}'", summary.name);
    let max = summary.max;

    if plan.nodes as usize > summary.nodes {
        return Err(WrapSlurmError::Unsatisfiable {
            field: "nodes",
            requested: plan.nodes.to_string(),
            limit: format!("{} nodes", summary.nodes),
            scope: format!("count {}", scope),
        });
    }
    if plan.cpus_per_node() > u64::from(max.cpus) {
        let (field, requested) = if plan.source(Field::CpusPerTask).is_user_supplied() {
            ("cpus-per-task", plan.cpus_per_task)
        } else {
            ("tasks-per-node", plan.tasks_per_node)
        };
        return Err(WrapSlurmError::unsatisfiable(
            field,
            requested,
            format!("{} CPUs", max.cpus),
            scope,
        ));
    }
    if max.memory.megabytes() > 0 && plan.memory > max.memory {
        return Err(WrapSlurmError::unsatisfiable("mem", plan.memory, max.memory, scope));
    }
    if plan.gpus > max.gpus {
        return Err(WrapSlurmError::unsatisfiable(
            "gpus",
            plan.gpus,
            format!("{} GPUs", max.gpus),
            scope,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{NodeRecord, NodeState};
    use proptest::prelude::*;

    fn node(partition: &str, name: &str, cpus: u32, mem_gb: u64, gpus: u32) -> NodeRecord {
        NodeRecord {
            partition: partition.to_string(),
            name: name.to_string(),
            cpus_total: cpus,
            cpus_alloc: 0,
            memory_mb: mem_gb * 1024,
            memory_alloc_mb: 0,
            gpus_total: gpus,
            gpus_alloc: 0,
            state: NodeState::Idle,
            time_limit: Some("2-00:00:00".to_string()),
            cpu_load: None,
        }
    }

    /// gp4d: 4 idle nodes, 8 GPUs / 64 CPUs / 512G each; cpu1: 2 idle nodes, no GPUs
    fn cluster() -> Inventory {
        let mut nodes: Vec<NodeRecord> = (1..=4)
            .map(|i| node("gp4d", &format!("gpn0{}", i), 64, 512, 8))
            .collect();
        for i in 1..=2 {
            let mut cpu = node("cpu1", &format!("cn0{}", i), 32, 128, 0);
            cpu.time_limit = Some("7-00:00:00".to_string());
            nodes.push(cpu);
        }
        Inventory::new(nodes)
    }

    #[test]
    fn test_gpu_request_scales_cpus_and_memory() {
        let inventory = cluster();
        let defaults = Defaults::default();
        let request = ResourceRequest {
            gpus: Some(2),
            ..Default::default()
        };

        let plan = Selector::new(&inventory, &defaults).select(&request).unwrap();
        assert_eq!(plan.partition, "gp4d");
        assert_eq!(plan.gpus, 2);
        assert_eq!(plan.cpus_per_task, 16);
        assert_eq!(plan.memory, MemorySize::from_gb(128));
        assert_eq!(plan.time.as_str(), "2-00:00:00");
        assert_eq!(plan.source(Field::Partition), FieldSource::Auto);
        assert_eq!(plan.source(Field::CpusPerTask), FieldSource::Auto);
        assert_eq!(plan.source(Field::Gpus), FieldSource::Cli);
        assert_eq!(plan.source(Field::Nodes), FieldSource::Fallback);
    }

    #[test]
    fn test_cpu_request_over_largest_node_names_ceiling() {
        let inventory = Inventory::new(vec![
            node("a", "a1", 64, 256, 0),
            node("b", "b1", 32, 256, 0),
        ]);
        let defaults = Defaults::default();
        let request = ResourceRequest {
            cpus_per_task: Some(128),
            ..Default::default()
        };

        let err = Selector::new(&inventory, &defaults).select(&request).unwrap_err();
        match &err {
            WrapSlurmError::Unsatisfiable { field, requested, limit, .. } => {
                assert_eq!(*field, "cpus-per-task");
                assert_eq!(requested, "128");
                assert_eq!(limit, "64 CPUs");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("64 CPUs"));
    }

    #[test]
    fn test_tasks_per_node_steers_partition_choice() {
        let mut nodes = vec![node("big", "b1", 128, 512, 0)];
        nodes.extend((1..=3).map(|i| node("small", &format!("s{}", i), 64, 256, 0)));
        let inventory = Inventory::new(nodes);
        let defaults = Defaults::default();
        let request = ResourceRequest {
            tasks_per_node: Some(96),
            ..Default::default()
        };

        let plan = Selector::new(&inventory, &defaults).select(&request).unwrap();
        assert_eq!(plan.partition, "big");
        assert_eq!(plan.tasks_per_node, 96);
        assert_eq!(plan.cpus_per_task, 1);

        let saved = Defaults {
            tasks_per_node: Some(96),
            ..Default::default()
        };
        let plan = Selector::new(&inventory, &saved)
            .select(&ResourceRequest::default())
            .unwrap();
        assert_eq!(plan.partition, "big");
    }

    #[test]
    fn test_no_fit_error_names_the_flag_given() {
        let inventory = Inventory::new(vec![node("a", "a1", 64, 256, 0)]);
        let defaults = Defaults::default();

        let request = ResourceRequest {
            cpus_per_task: Some(32),
            tasks_per_node: Some(4),
            ..Default::default()
        };
        let err = Selector::new(&inventory, &defaults).select(&request).unwrap_err();
        match &err {
            WrapSlurmError::Unsatisfiable { field, requested, .. } => {
                assert_eq!(*field, "cpus-per-task");
                assert_eq!(requested, "32");
            }
            other => panic!("unexpected error: {other}"),
        }

        let request = ResourceRequest {
            tasks_per_node: Some(96),
            ..Default::default()
        };
        let err = Selector::new(&inventory, &defaults).select(&request).unwrap_err();
        match &err {
            WrapSlurmError::Unsatisfiable { field, requested, limit, .. } => {
                assert_eq!(*field, "tasks-per-node");
                assert_eq!(requested, "96");
                assert_eq!(limit, "64 CPUs");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_counts_are_rejected() {
        let inventory = Inventory::new(vec![node("a", "a1", 8, 32, 0)]);
        let defaults = Defaults::default();
        let selector = Selector::new(&inventory, &defaults);

        for (request, flag) in [
            (ResourceRequest { nodes: Some(0), ..Default::default() }, "nodes"),
            (
                ResourceRequest { tasks_per_node: Some(0), ..Default::default() },
                "tasks-per-node",
            ),
            (
                ResourceRequest { cpus_per_task: Some(0), ..Default::default() },
                "cpus-per-task",
            ),
        ] {
            let err = selector.select(&request).unwrap_err();
            assert!(matches!(err, WrapSlurmError::ConfigError(_)));
            assert!(err.to_string().contains(flag));
        }

        let saved = Defaults {
            nodes: Some(0),
            ..Default::default()
        };
        assert!(Selector::new(&inventory, &saved)
            .select(&ResourceRequest::default())
            .is_err());
    }

    #[test]
    fn test_explicit_partition_is_checked_not_clamped() {
        let inventory = cluster();
        let defaults = Defaults::default();
        let request = ResourceRequest {
            partition: Some("cpu1".into()),
            gpus: Some(1),
            ..Default::default()
        };
        let err = Selector::new(&inventory, &defaults).select(&request).unwrap_err();
        assert!(matches!(err, WrapSlurmError::Unsatisfiable { field: "gpus", .. }));

        let request = ResourceRequest {
            partition: Some("cpu1".into()),
            memory: Some(MemorySize::from_gb(200)),
            ..Default::default()
        };
        let err = Selector::new(&inventory, &defaults).select(&request).unwrap_err();
        assert!(matches!(err, WrapSlurmError::Unsatisfiable { field: "mem", .. }));
    }

    #[test]
    fn test_unknown_partition() {
        let inventory = cluster();
        let defaults = Defaults {
            partition: Some("gone".into()),
            ..Default::default()
        };
        let err = Selector::new(&inventory, &defaults)
            .select(&ResourceRequest::default())
            .unwrap_err();
        match err {
            WrapSlurmError::UnknownPartition { partition, available } => {
                assert_eq!(partition, "gone");
                assert_eq!(available, vec!["cpu1", "gp4d"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_partition_up() {
        let mut down = node("a", "a1", 8, 16, 0);
        down.state = NodeState::Down;
        let mut drained = node("b", "b1", 8, 16, 0);
        drained.state = NodeState::Drained;
        let inventory = Inventory::new(vec![down, drained]);
        let defaults = Defaults::default();

        let err = Selector::new(&inventory, &defaults)
            .select(&ResourceRequest::default())
            .unwrap_err();
        assert!(matches!(err, WrapSlurmError::NoPartitionUp));
    }

    #[test]
    fn test_most_idle_partition_wins_with_name_tiebreak() {
        let mut busy = node("alpha", "a2", 8, 16, 0);
        busy.state = NodeState::Allocated;
        busy.cpus_alloc = 8;
        let inventory = Inventory::new(vec![
            node("zeta", "z1", 8, 16, 0),
            node("zeta", "z2", 8, 16, 0),
            node("beta", "b1", 8, 16, 0),
            node("beta", "b2", 8, 16, 0),
            node("alpha", "a1", 8, 16, 0),
            busy,
        ]);
        let defaults = Defaults::default();

        let plan = Selector::new(&inventory, &defaults)
            .select(&ResourceRequest::default())
            .unwrap();
        assert_eq!(plan.partition, "beta");
    }

    #[test]
    fn test_cpu_partition_gets_whole_node_without_gpus() {
        let inventory = cluster();
        let defaults = Defaults::default();
        let request = ResourceRequest {
            partition: Some("cpu1".into()),
            tasks_per_node: Some(4),
            ..Default::default()
        };
        let plan = Selector::new(&inventory, &defaults).select(&request).unwrap();
        assert_eq!(plan.gpus, 0);
        assert_eq!(plan.cpus_per_task, 8);
        assert_eq!(plan.memory, MemorySize::from_gb(128));
        assert_eq!(plan.time.as_str(), "7-00:00:00");
    }

    #[test]
    fn test_defaults_fill_between_cli_and_auto() {
        let inventory = cluster();
        let defaults = Defaults {
            partition: Some("cpu1".into()),
            account: Some("proj42".into()),
            cpus_per_task: Some(4),
            ..Default::default()
        };
        let request = ResourceRequest {
            cpus_per_task: Some(2),
            ..Default::default()
        };
        let plan = Selector::new(&inventory, &defaults)
            .with_detected_account(Some("fromdb".into()))
            .select(&request)
            .unwrap();

        assert_eq!(plan.partition, "cpu1");
        assert_eq!(plan.source(Field::Partition), FieldSource::Default);
        assert_eq!(plan.cpus_per_task, 2);
        assert_eq!(plan.source(Field::CpusPerTask), FieldSource::Cli);
        assert_eq!(plan.account.as_deref(), Some("proj42"));
        assert_eq!(plan.default_fields(), vec![Field::Partition, Field::Account]);
    }

    #[test]
    fn test_detected_account_used_last() {
        let inventory = cluster();
        let defaults = Defaults::default();
        let plan = Selector::new(&inventory, &defaults)
            .with_detected_account(Some("fromdb".into()))
            .select(&ResourceRequest::default())
            .unwrap();
        assert_eq!(plan.account.as_deref(), Some("fromdb"));
        assert_eq!(plan.source(Field::Account), FieldSource::Auto);
    }

    #[test]
    fn test_empty_inventory_needs_partition() {
        let inventory = Inventory::empty();
        let defaults = Defaults::default();
        let err = Selector::new(&inventory, &defaults)
            .select(&ResourceRequest::default())
            .unwrap_err();
        assert!(matches!(err, WrapSlurmError::InventoryUnavailable("partition")));

        let request = ResourceRequest {
            partition: Some("anything".into()),
            ..Default::default()
        };
        let plan = Selector::new(&inventory, &defaults).select(&request).unwrap();
        assert_eq!(plan.memory, FALLBACK_MEMORY);
        assert_eq!(plan.time.as_str(), FALLBACK_TIME);
        assert_eq!(plan.source(Field::Time), FieldSource::Fallback);
    }

    fn full_request(
        partition: &str,
        nodes: u32,
        tasks: u32,
        cpus: u32,
        mem_gb: u64,
        gpus: u32,
        time_secs: u64,
    ) -> ResourceRequest {
        ResourceRequest {
            partition: Some(partition.to_string()),
            account: Some("acct".to_string()),
            nodes: Some(nodes),
            tasks_per_node: Some(tasks),
            cpus_per_task: Some(cpus),
            memory: Some(MemorySize::from_gb(mem_gb)),
            gpus: Some(gpus),
            time: Some(TimeLimit::from_seconds(time_secs)),
            nodelist: None,
            exclude: Some("gpn04".to_string()),
            job_name: Some("job".to_string()),
            report_dir: Some(PathBuf::from("logs")),
            script_dir: Some(PathBuf::from("scripts")),
        }
    }

    proptest! {
        #[test]
        fn prop_full_overrides_win(
            nodes in 1u32..=4,
            tasks in 1u32..=4,
            cpus in 1u32..=16,
            mem_gb in 1u64..=512,
            gpus in 0u32..=8,
            time_secs in 60u64..=400_000,
        ) {
            let inventory = cluster();
            let defaults = Defaults {
                partition: Some("cpu1".into()),
                cpus_per_task: Some(1),
                ..Default::default()
            };
            let request = full_request("gp4d", nodes, tasks, cpus, mem_gb, gpus, time_secs);

            let plan = Selector::new(&inventory, &defaults).select(&request).unwrap();
            prop_assert_eq!(plan.partition.as_str(), "gp4d");
            prop_assert_eq!(plan.account.as_deref(), Some("acct"));
            prop_assert_eq!(plan.nodes, nodes);
            prop_assert_eq!(plan.tasks_per_node, tasks);
            prop_assert_eq!(plan.cpus_per_task, cpus);
            prop_assert_eq!(plan.memory, MemorySize::from_gb(mem_gb));
            prop_assert_eq!(plan.gpus, gpus);
            prop_assert_eq!(plan.time.seconds(), Some(time_secs));
            prop_assert_eq!(plan.exclude.as_deref(), Some("gpn04"));
            prop_assert_eq!(plan.report_dir, PathBuf::from("logs"));
            prop_assert!(plan.sources.values().all(|s| *s == FieldSource::Cli));
        }

        #[test]
        fn prop_auto_partition_is_deterministic(
            idle in proptest::collection::vec((0usize..4, 0u32..3, any::<bool>()), 1..20),
        ) {
            let names = ["p0", "p1", "p2", "p3"];
            let nodes: Vec<NodeRecord> = idle
                .iter()
                .enumerate()
                .map(|(i, (part, gpus, busy))| {
                    let mut n = node(names[*part], &format!("n{}", i), 16, 64, *gpus);
                    if *busy {
                        n.state = NodeState::Mixed;
                        n.cpus_alloc = 4;
                    }
                    n
                })
                .collect();
            let mut reversed = nodes.clone();
            reversed.reverse();

            let defaults = Defaults::default();
            let first = Inventory::new(nodes);
            let second = Inventory::new(reversed);
            let a = Selector::new(&first, &defaults).select(&ResourceRequest::default()).unwrap();
            let b = Selector::new(&first, &defaults).select(&ResourceRequest::default()).unwrap();
            let c = Selector::new(&second, &defaults).select(&ResourceRequest::default()).unwrap();
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(&a.partition, &c.partition);
        }
    }
}
