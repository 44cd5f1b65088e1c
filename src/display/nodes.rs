//! Node utilisation listing

use super::{percent, render_table};
use crate::inventory::{NodeRecord, NodeState};
use crate::units::MemorySize;
use console::style;
use humansize::{format_size, BINARY};
use tabled::Tabled;

/// Width of a utilisation bar in graph mode
const BAR_WIDTH: usize = 20;

/// One node with all of its partitions
#[derive(Debug, Clone, PartialEq)]
pub struct NodeView {
    pub name: String,
    pub state: NodeState,
    pub partitions: Vec<String>,
    pub cpus_alloc: u32,
    pub cpus_total: u32,
    pub cpu_load: Option<f64>,
    pub memory_alloc_mb: u64,
    pub memory_mb: u64,
    pub gpus_alloc: u32,
    pub gpus_total: u32,
}

impl NodeView {
    /// Fold per-partition records into one view per node, in input order
    ///
    /// Down and drained nodes are dropped unless `include_down` is set.
    pub fn collect(records: &[NodeRecord], include_down: bool) -> Vec<NodeView> {
        let mut views: Vec<NodeView> = Vec::new();

        for record in records {
            if !include_down && record.state.is_unavailable() {
                continue;
            }
            if let Some(view) = views.iter_mut().find(|v| v.name == record.name) {
                if !record.partition.is_empty() && !view.partitions.contains(&record.partition) {
                    view.partitions.push(record.partition.clone());
                }
                continue;
            }
            views.push(NodeView {
                name: record.name.clone(),
                state: record.state.clone(),
                partitions: if record.partition.is_empty() {
                    Vec::new()
                } else {
                    vec![record.partition.clone()]
                },
                cpus_alloc: record.cpus_alloc,
                cpus_total: record.cpus_total,
                cpu_load: record.cpu_load,
                memory_alloc_mb: record.memory_alloc_mb,
                memory_mb: record.memory_mb,
                gpus_alloc: record.gpus_alloc,
                gpus_total: record.gpus_total,
            });
        }

        views
    }

    fn partitions_label(&self) -> String {
        if self.partitions.is_empty() {
            "-".to_string()
        } else {
            self.partitions.join(",")
        }
    }
}

fn paint_state(state: &NodeState) -> String {
    let text = style(state.to_string()).bold();
    match state {
        NodeState::Idle => text.green(),
        NodeState::Mixed => text.yellow(),
        NodeState::Down | NodeState::Drained => text.red(),
        NodeState::Allocated | NodeState::Other(_) => text.cyan(),
    }
    .to_string()
}

fn mb(megabytes: u64) -> String {
    format_size(MemorySize::from_mb(megabytes).bytes(), BINARY)
}

/// `[#####...............]  25.0%`
pub fn usage_bar(used: u64, total: u64, width: usize) -> String {
    let pct = percent(used, total).clamp(0.0, 100.0);
    let filled = ((pct / 100.0) * width as f64).round() as usize;
    format!(
        "[{}{}] {:5.1}%",
        "#".repeat(filled.min(width)),
        ".".repeat(width - filled.min(width)),
        pct
    )
}

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "NodeName")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Partitions")]
    partitions: String,
    #[tabled(rename = "CPUs")]
    cpus: String,
    #[tabled(rename = "GPUs")]
    gpus: String,
    #[tabled(rename = "Memory")]
    memory: String,
}

#[derive(Tabled)]
struct NodeGraphRow {
    #[tabled(rename = "NodeName")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "CPUld")]
    cpu_load: String,
    #[tabled(rename = "GPU")]
    gpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
}

/// Render nodes as numbers, or as utilisation bars when `graph` is set
pub fn render_nodes(nodes: &[NodeView], graph: bool) -> String {
    if nodes.is_empty() {
        return "No node information to display.".to_string();
    }

    if graph {
        let rows: Vec<NodeGraphRow> = nodes
            .iter()
            .map(|node| NodeGraphRow {
                name: node.name.clone(),
                state: paint_state(&node.state),
                cpu: usage_bar(node.cpus_alloc.into(), node.cpus_total.into(), BAR_WIDTH),
                cpu_load: node
                    .cpu_load
                    .map(|load| format!("{:.2}", load))
                    .unwrap_or_else(|| "-".to_string()),
                gpu: if node.gpus_total > 0 {
                    usage_bar(node.gpus_alloc.into(), node.gpus_total.into(), BAR_WIDTH)
                } else {
                    "-".to_string()
                },
                memory: usage_bar(node.memory_alloc_mb, node.memory_mb, BAR_WIDTH),
            })
            .collect();
        return render_table(&rows);
    }

    let rows: Vec<NodeRow> = nodes
        .iter()
        .map(|node| NodeRow {
            name: node.name.clone(),
            state: paint_state(&node.state),
            partitions: node.partitions_label(),
            cpus: format!(
                "{} Alloc ({:.1}%) / {} Total",
                node.cpus_alloc,
                percent(node.cpus_alloc.into(), node.cpus_total.into()),
                node.cpus_total
            ),
            gpus: if node.gpus_total > 0 {
                format!("{} / {}", node.gpus_alloc, node.gpus_total)
            } else {
                "-".to_string()
            },
            memory: format!(
                "{} Used / {} ({:.1}%)",
                mb(node.memory_alloc_mb),
                mb(node.memory_mb),
                percent(node.memory_alloc_mb, node.memory_mb)
            ),
        })
        .collect();
    render_table(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::parse_scontrol_nodes;

    const SCONTROL: &str = "\
NodeName=gpn01 Arch=x86_64 CoresPerSocket=32
   CPUAlloc=16 CPUTot=64 CPULoad=15.20
   Gres=gpu:a100:8(S:0-1)
   RealMemory=524288 AllocMem=131072 FreeMem=300000
   State=MIXED ThreadsPerCore=1
   Partitions=gp4d,debug
   CfgTRES=cpu=64,mem=512G,billing=64,gres/gpu=8
   AllocTRES=cpu=16,mem=128G,gres/gpu=2

NodeName=cn01 Arch=x86_64
   CPUAlloc=0 CPUTot=32 CPULoad=0.01
   RealMemory=131072 AllocMem=0
   State=DOWN+DRAIN ThreadsPerCore=1
   Partitions=cpu1
";

    #[test]
    fn test_collect_merges_partitions_and_hides_down() {
        let records = parse_scontrol_nodes(SCONTROL);
        let views = NodeView::collect(&records, false);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].partitions, vec!["gp4d", "debug"]);
        assert_eq!(views[0].gpus_alloc, 2);

        let all = NodeView::collect(&records, true);
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].name, "cn01");
    }

    #[test]
    fn test_usage_bar() {
        assert_eq!(usage_bar(5, 20, 4), "[#...]  25.0%");
        assert_eq!(usage_bar(0, 0, 4), "[....]   0.0%");
        assert_eq!(usage_bar(64, 64, 4), "[####] 100.0%");
    }

    #[test]
    fn test_render_numbers() {
        let records = parse_scontrol_nodes(SCONTROL);
        let table = render_nodes(&NodeView::collect(&records, false), false);
        let plain = console::strip_ansi_codes(&table);
        assert!(plain.contains("gpn01"));
        assert!(plain.contains("16 Alloc (25.0%) / 64 Total"));
        assert!(plain.contains("128 GiB Used / 512 GiB (25.0%)"));
        assert!(plain.contains("gp4d,debug"));
        assert!(!plain.contains("cn01"));
    }

    #[test]
    fn test_render_graph() {
        let records = parse_scontrol_nodes(SCONTROL);
        let table = render_nodes(&NodeView::collect(&records, true), true);
        let plain = console::strip_ansi_codes(&table);
        assert!(plain.contains("CPUld"));
        assert!(plain.contains("15.20"));
        assert!(plain.contains("#####"));
        assert!(plain.contains("DRAINED"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_nodes(&[], false), "No node information to display.");
    }
}
