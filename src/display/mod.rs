//! Terminal presentation: queue, node and job summary tables
//!
//! Rendering functions return strings so callers decide where they go.
//! Colour comes from `console`, which switches itself off when stdout is
//! not a terminal.

mod nodes;
mod queue;
mod summary;

pub use nodes::*;
pub use queue::*;
pub use summary::*;

use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Style};
use tabled::{Table, Tabled};

/// Render rows as a table with the first column right-aligned
pub(crate) fn render_table<T: Tabled>(rows: &[T]) -> String {
    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .modify(Columns::first(), Alignment::right());
    table.to_string()
}

/// Percentage of `used` in `total`, zero when the total is unknown
pub(crate) fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 * 100.0 / total as f64
    }
}
