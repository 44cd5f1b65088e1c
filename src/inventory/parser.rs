//! Parsers for `sinfo` and `scontrol show node` text
//!
//! Both parsers are lenient: a line or block that cannot be understood is
//! logged and skipped, the rest of the snapshot is still returned.

use super::records::{NodeRecord, NodeState};
use std::collections::HashMap;

/// Field separator of the sinfo line format
pub const SINFO_SEPARATOR: char = '|';

/// `--Format` argument producing the line format [`parse_sinfo`] expects:
///
/// `NODE|PARTITION|CPUS(A/I/O/T)|MEMORY|ALLOC_MEM|TIMELIMIT|STATE|GRES|GRES_USED`
pub const SINFO_FORMAT: &str = "NodeHost:64|,Partition:32|,CPUsState:24|,Memory:16|,AllocMem:16|,Time:16|,StateLong:24|,Gres:64|,GresUsed:64";

const SINFO_REQUIRED_FIELDS: usize = 7;

/// Parse `sinfo --Node --noheader --Format=...` output, one record per line
pub fn parse_sinfo(text: &str) -> Vec<NodeRecord> {
    let mut nodes = Vec::new();

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_sinfo_line(line) {
            Ok(node) => nodes.push(node),
            Err(reason) => {
                tracing::warn!("Skipping sinfo line {}: {} ({:?})", index + 1, reason, line.trim());
            }
        }
    }

    tracing::debug!("Parsed {} node records from sinfo", nodes.len());
    nodes
}

fn parse_sinfo_line(line: &str) -> Result<NodeRecord, String> {
    let fields: Vec<&str> = line.split(SINFO_SEPARATOR).map(str::trim).collect();
    if fields.len() < SINFO_REQUIRED_FIELDS {
        return Err(format!(
            "expected at least {} fields, found {}",
            SINFO_REQUIRED_FIELDS,
            fields.len()
        ));
    }

    let name = fields[0];
    let partition = fields[1].trim_end_matches('*');
    if name.is_empty() || partition.is_empty() {
        return Err("missing node or partition name".to_string());
    }

    let (cpus_alloc, cpus_total) = parse_cpu_state(fields[2])?;
    let memory_mb =
        leading_number(fields[3]).ok_or_else(|| format!("invalid memory '{}'", fields[3]))?;
    let memory_alloc_mb = leading_number(fields[4]).unwrap_or(0);
    let time_limit = match fields[5] {
        "" | "n/a" | "N/A" => None,
        t => Some(t.to_string()),
    };
    let state = NodeState::parse(fields[6]);
    let gpus_total = fields.get(7).map(|g| parse_gres_gpus(g)).unwrap_or(0);
    let gpus_alloc = fields.get(8).map(|g| parse_gres_gpus(g)).unwrap_or(0);

    Ok(NodeRecord {
        partition: partition.to_string(),
        name: name.to_string(),
        cpus_total,
        cpus_alloc,
        memory_mb,
        memory_alloc_mb,
        gpus_total,
        gpus_alloc,
        state,
        time_limit,
        cpu_load: None,
    })
}

/// Parse `A/I/O/T` (or a bare total) into (allocated, total)
fn parse_cpu_state(field: &str) -> Result<(u32, u32), String> {
    let parts: Vec<&str> = field.split('/').collect();
    let parse = |s: &str| s.trim().parse::<u32>().map_err(|_| format!("invalid CPU count '{}'", field));
    match parts.as_slice() {
        [total] => Ok((0, parse(total)?)),
        [alloc, _idle, _other, total] => Ok((parse(alloc)?, parse(total)?)),
        _ => Err(format!("invalid CPU state '{}'", field)),
    }
}

/// Number at the start of a field (`191997+` -> 191997)
fn leading_number(field: &str) -> Option<u64> {
    let digits: String = field.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// GPU count from a GRES column such as `gpu:a100:8(S:0-1),shard:4`
pub fn parse_gres_gpus(field: &str) -> u32 {
    strip_parenthesized(field)
        .split(',')
        .map(str::trim)
        .filter(|entry| entry.starts_with("gpu"))
        .filter_map(|entry| entry.rsplit(':').next())
        .filter_map(|count| count.parse::<u32>().ok())
        .sum()
}

fn strip_parenthesized(field: &str) -> String {
    let mut depth = 0usize;
    field
        .chars()
        .filter(|c| match c {
            '(' => {
                depth += 1;
                false
            }
            ')' => {
                depth = depth.saturating_sub(1);
                false
            }
            _ => depth == 0,
        })
        .collect()
}

/// Parse `scontrol show node` output into one record per (node, partition)
pub fn parse_scontrol_nodes(text: &str) -> Vec<NodeRecord> {
    let mut nodes = Vec::new();

    for block in split_blocks(text) {
        let fields = key_values(&block);
        let Some(name) = fields.get("NodeName") else {
            tracing::warn!("Skipping scontrol block without NodeName");
            continue;
        };

        let number = |key: &str| fields.get(key).and_then(|v| leading_number(v)).unwrap_or(0);
        let cfg_gpus = fields.get("CfgTRES").map(|t| tres_gpus(t)).unwrap_or(0);
        let gres_gpus = fields.get("Gres").map(|g| parse_gres_gpus(g)).unwrap_or(0);

        let record = NodeRecord {
            partition: String::new(),
            name: name.to_string(),
            cpus_total: number("CPUTot") as u32,
            cpus_alloc: number("CPUAlloc") as u32,
            memory_mb: number("RealMemory"),
            memory_alloc_mb: number("AllocMem"),
            gpus_total: cfg_gpus.max(gres_gpus),
            gpus_alloc: fields.get("AllocTRES").map(|t| tres_gpus(t)).unwrap_or(0),
            state: NodeState::parse(fields.get("State").copied().unwrap_or("UNKNOWN")),
            time_limit: None,
            cpu_load: fields.get("CPULoad").and_then(|v| v.parse::<f64>().ok()),
        };

        let partitions: Vec<&str> = fields
            .get("Partitions")
            .map(|p| p.split(',').filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        if partitions.is_empty() {
            nodes.push(record);
        } else {
            for partition in partitions {
                nodes.push(NodeRecord {
                    partition: partition.to_string(),
                    ..record.clone()
                });
            }
        }
    }

    nodes
}

fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.trim().is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    if !current.trim().is_empty() {
        blocks.push(current);
    }
    blocks
}

fn key_values(block: &str) -> HashMap<&str, &str> {
    let mut fields = HashMap::new();
    for token in block.split_whitespace() {
        if let Some((key, value)) = token.split_once('=') {
            fields.entry(key).or_insert(value);
        }
    }
    fields
}

/// GPU count from a TRES list (`cpu=64,mem=191997M,gres/gpu=8`)
fn tres_gpus(tres: &str) -> u32 {
    let entries: Vec<(&str, &str)> = tres
        .split(',')
        .filter_map(|entry| entry.split_once('='))
        .collect();

    if let Some((_, count)) = entries.iter().find(|(key, _)| *key == "gres/gpu") {
        return count.parse().unwrap_or(0);
    }
    entries
        .iter()
        .filter(|(key, _)| key.starts_with("gres/gpu:"))
        .filter_map(|(_, count)| count.parse::<u32>().ok())
        .sum()
}
