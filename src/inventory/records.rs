//! Node and partition records for a single inventory snapshot

use crate::units::{MemorySize, TimeLimit};
use std::collections::BTreeMap;
use std::fmt;

/// Scheduler state of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeState {
    /// No jobs running
    Idle,
    /// Partially allocated
    Mixed,
    /// Fully allocated (or completing)
    Allocated,
    /// Down or not responding
    Down,
    /// Drained or draining
    Drained,
    /// Anything else SLURM reports (reserved, planned, maint, ...)
    Other(String),
}

impl NodeState {
    /// Parse a short (`idle*`, `mix`) or long (`MIXED+DRAIN`) SLURM node state
    pub fn parse(raw: &str) -> Self {
        let state = raw.trim().to_lowercase();

        if state.contains("drain") || state.contains("drng") {
            return NodeState::Drained;
        }
        if state.contains("down")
            || state.contains("fail")
            || state.contains("not_responding")
            || state.ends_with('*')
        {
            return NodeState::Down;
        }

        let base = state.trim_end_matches(|c: char| "~#!%$@^-+".contains(c));
        if base.starts_with("idle") {
            NodeState::Idle
        } else if base.starts_with("mix") {
            NodeState::Mixed
        } else if base.starts_with("alloc") || base.starts_with("comp") {
            NodeState::Allocated
        } else {
            NodeState::Other(raw.trim().to_string())
        }
    }

    /// Whether jobs can be scheduled on the node
    pub fn is_up(&self) -> bool {
        matches!(self, NodeState::Idle | NodeState::Mixed | NodeState::Allocated)
    }

    /// Whether the node is down or drained
    pub fn is_unavailable(&self) -> bool {
        matches!(self, NodeState::Down | NodeState::Drained)
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Idle => f.write_str("IDLE"),
            NodeState::Mixed => f.write_str("MIXED"),
            NodeState::Allocated => f.write_str("ALLOCATED"),
            NodeState::Down => f.write_str("DOWN"),
            NodeState::Drained => f.write_str("DRAINED"),
            NodeState::Other(raw) => f.write_str(&raw.to_uppercase()),
        }
    }
}

/// One node as seen in one partition
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    /// Partition the node was listed under
    pub partition: String,
    /// Node hostname
    pub name: String,
    /// Total CPUs
    pub cpus_total: u32,
    /// Allocated CPUs
    pub cpus_alloc: u32,
    /// Total memory in MB
    pub memory_mb: u64,
    /// Allocated memory in MB
    pub memory_alloc_mb: u64,
    /// GPUs on the node
    pub gpus_total: u32,
    /// Allocated GPUs
    pub gpus_alloc: u32,
    /// Node state
    pub state: NodeState,
    /// Partition wall-clock limit as reported by sinfo
    pub time_limit: Option<String>,
    /// One-minute CPU load, when reported
    pub cpu_load: Option<f64>,
}

impl NodeRecord {
    /// Whether no CPU or GPU on the node is allocated and it accepts jobs
    pub fn is_idle(&self) -> bool {
        self.state == NodeState::Idle
            || (self.state.is_up() && self.cpus_alloc == 0 && self.gpus_alloc == 0)
    }

    /// Total node memory
    pub fn memory(&self) -> MemorySize {
        MemorySize::from_mb(self.memory_mb)
    }
}

/// Resources of a single node shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeShape {
    /// CPUs per node
    pub cpus: u32,
    /// Memory per node
    pub memory: MemorySize,
    /// GPUs per node
    pub gpus: u32,
}

impl NodeShape {
    /// CPUs available per GPU on this shape
    pub fn cpus_per_gpu(&self) -> Option<u32> {
        (self.gpus > 0).then(|| self.cpus / self.gpus)
    }
}

/// Aggregated view of one partition
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionSummary {
    /// Partition name
    pub name: String,
    /// Nodes listed in the partition
    pub nodes: usize,
    /// Nodes that accept jobs
    pub up_nodes: usize,
    /// Nodes with nothing allocated
    pub idle_nodes: usize,
    /// Per-node maxima across the partition
    pub max: NodeShape,
    /// Node with the most GPUs (CPU count breaks ties), used for per-GPU ratios
    pub gpu_shape: Option<NodeShape>,
    /// Maximum wall-clock time
    pub time_limit: Option<String>,
}

impl PartitionSummary {
    /// Whether at least one node accepts jobs
    pub fn is_up(&self) -> bool {
        self.up_nodes > 0
    }

    /// Partition time limit, if sinfo reported a parseable one
    pub fn max_time(&self) -> Option<TimeLimit> {
        self.time_limit.as_deref().and_then(|t| t.parse().ok())
    }
}

/// Parsed state of all nodes at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    nodes: Vec<NodeRecord>,
}

impl Inventory {
    /// Wrap parsed node records
    pub fn new(nodes: Vec<NodeRecord>) -> Self {
        Self { nodes }
    }

    /// Snapshot with no nodes (inventory could not be read)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the snapshot holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node records in input order
    pub fn nodes(&self) -> &[NodeRecord] {
        &self.nodes
    }

    /// Partition summaries sorted by name
    pub fn partitions(&self) -> Vec<PartitionSummary> {
        let mut grouped: BTreeMap<&str, Vec<&NodeRecord>> = BTreeMap::new();
        for node in &self.nodes {
            grouped.entry(node.partition.as_str()).or_default().push(node);
        }

        grouped
            .into_iter()
            .map(|(name, nodes)| summarize(name, &nodes))
            .collect()
    }

    /// Summary of one partition
    pub fn partition(&self, name: &str) -> Option<PartitionSummary> {
        let nodes: Vec<&NodeRecord> = self.nodes.iter().filter(|n| n.partition == name).collect();
        if nodes.is_empty() {
            None
        } else {
            Some(summarize(name, &nodes))
        }
    }

    /// Names of all partitions, sorted
    pub fn partition_names(&self) -> Vec<String> {
        self.partitions().into_iter().map(|p| p.name).collect()
    }

    /// Per-node maxima across the whole cluster
    pub fn cluster_max(&self) -> NodeShape {
        let refs: Vec<&NodeRecord> = self.nodes.iter().collect();
        max_shape(&refs)
    }
}

fn max_shape(nodes: &[&NodeRecord]) -> NodeShape {
    NodeShape {
        cpus: nodes.iter().map(|n| n.cpus_total).max().unwrap_or(0),
        memory: MemorySize::from_mb(nodes.iter().map(|n| n.memory_mb).max().unwrap_or(0)),
        gpus: nodes.iter().map(|n| n.gpus_total).max().unwrap_or(0),
    }
}

fn summarize(name: &str, nodes: &[&NodeRecord]) -> PartitionSummary {
    let gpu_shape = nodes
        .iter()
        .filter(|n| n.gpus_total > 0)
        .max_by_key(|n| (n.gpus_total, n.cpus_total, n.memory_mb))
        .map(|n| NodeShape {
            cpus: n.cpus_total,
            memory: n.memory(),
            gpus: n.gpus_total,
        });

    PartitionSummary {
        name: name.to_string(),
        nodes: nodes.len(),
        up_nodes: nodes.iter().filter(|n| n.state.is_up()).count(),
        idle_nodes: nodes.iter().filter(|n| n.is_idle()).count(),
        max: max_shape(nodes),
        gpu_shape,
        time_limit: nodes.iter().find_map(|n| n.time_limit.clone()),
    }
}
