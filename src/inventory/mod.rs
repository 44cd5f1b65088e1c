//! Cluster inventory module
//!
//! Turns the text printed by `sinfo` and `scontrol show node` into
//! [`NodeRecord`]s and aggregates them into per-partition summaries.

mod parser;
mod records;

pub use parser::*;
pub use records::*;
