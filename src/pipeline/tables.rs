//! Markdown pipe-table formatting.
//!
//! The first grid row is the header. Every row is padded with empty cells to
//! the widest row, every cell is trimmed, and a `| --- |` separator follows
//! the header:
//!
//! ```text
//! | A | B |
//! | --- | --- |
//! | 1 | 2 |
//! ```

use crate::model::{DetectedTable, RenderedTable};
use tracing::debug;

/// Format a grid as a pipe table.
///
/// Returns an empty string when the grid has no rows.
pub fn format_table_markdown(grid: &[Vec<String>]) -> String {
    let Some(header) = grid.first() else {
        return String::new();
    };
    let max_cols = grid.iter().map(Vec::len).max().unwrap_or(0);

    let mut lines = Vec::with_capacity(grid.len() + 1);
    lines.push(format_row(header, max_cols));
    lines.push(format!("|{}|", vec![" --- "; max_cols].join("|")));
    for row in &grid[1..] {
        lines.push(format_row(row, max_cols));
    }
    lines.join("\n")
}

fn format_row(row: &[String], max_cols: usize) -> String {
    let cells: Vec<String> = (0..max_cols)
        .map(|i| row.get(i).map(|c| clean_cell(c)).unwrap_or_default())
        .collect();
    format!("| {} |", cells.join(" | "))
}

/// Trim a cell and keep it on one line without breaking the pipe grammar.
fn clean_cell(cell: &str) -> String {
    cell.trim()
        .split(['\n', '\r'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

/// Render every non-empty detected table, assigning ids `table_1`, `table_2`…
pub fn render_tables(tables: &[DetectedTable]) -> Vec<RenderedTable> {
    let rendered: Vec<RenderedTable> = tables
        .iter()
        .filter(|t| !t.grid.is_empty())
        .enumerate()
        .map(|(i, t)| RenderedTable {
            id: format!("table_{}", i + 1),
            bbox: t.bbox,
            markdown: format_table_markdown(&t.grid),
            row_count: t.grid.len(),
            col_count: t.grid.iter().map(Vec::len).max().unwrap_or(0),
        })
        .collect();
    if rendered.len() != tables.len() {
        debug!("Dropped {} empty table(s)", tables.len() - rendered.len());
    }
    rendered
}
