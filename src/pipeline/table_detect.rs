//! Table detection from text alignment.
//!
//! Born-digital PDFs rarely tag their tables, but tabular text gives itself
//! away: several consecutive rows whose cells start on the same x positions.
//! The detector works purely on positioned spans:
//!
//! 1. Cluster spans into rows (top edge within a fraction of the font size).
//! 2. Within a row, merge runs separated by less than the column gap into one
//!    cell chunk, so multi-word cells and ordinary prose collapse.
//! 3. Bucket the left edges of chunks in multi-chunk rows; edges seen on
//!    enough rows become column candidates.
//! 4. Runs of consecutive rows that align with those columns become table
//!    regions; each region is re-analysed on its own and turned into a grid.

use crate::config::TableDetectionConfig;
use crate::model::{BBox, DetectedTable, TextSpan};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Text-alignment table detector.
#[derive(Debug, Clone, Default)]
pub struct TableDetector {
    config: TableDetectionConfig,
}

/// A horizontal run of text that belongs to one cell.
#[derive(Debug, Clone)]
struct Chunk {
    text: String,
    bbox: BBox,
}

#[derive(Debug, Clone)]
struct Row {
    chunks: Vec<Chunk>,
}

impl TableDetector {
    pub fn new(config: TableDetectionConfig) -> Self {
        Self { config }
    }

    /// Find tables among the page's spans.
    pub fn detect(&self, spans: &[TextSpan]) -> Vec<DetectedTable> {
        if !self.config.enabled || spans.is_empty() {
            return vec![];
        }

        let rows = self.group_rows(spans);
        if rows.len() < self.config.min_rows {
            return vec![];
        }

        let columns = self.column_edges(&rows);
        if columns.len() < self.config.min_columns {
            trace!("Only {} column candidates, no tables", columns.len());
            return vec![];
        }

        let tables: Vec<DetectedTable> = self
            .find_regions(&rows, &columns)
            .into_iter()
            .filter_map(|(start, end)| self.build_table(&rows[start..end]))
            .collect();
        debug!("Detected {} table(s) from {} rows", tables.len(), rows.len());
        tables
    }

    fn group_rows(&self, spans: &[TextSpan]) -> Vec<Row> {
        let mut sorted: Vec<&TextSpan> = spans
            .iter()
            .filter(|s| !s.text.trim().is_empty())
            .collect();
        sorted.sort_by(|a, b| {
            a.bbox
                .y0
                .total_cmp(&b.bbox.y0)
                .then(a.bbox.x0.total_cmp(&b.bbox.x0))
        });

        let mut rows: Vec<Vec<&TextSpan>> = Vec::new();
        let mut row_y: Option<f32> = None;
        for span in sorted {
            let tolerance = span.font_size.max(1.0) * self.config.row_tolerance_factor;
            let same_row = row_y.is_some_and(|y| (span.bbox.y0 - y).abs() <= tolerance);
            if same_row {
                if let Some(row) = rows.last_mut() {
                    row.push(span);
                    continue;
                }
            }
            row_y = Some(span.bbox.y0);
            rows.push(vec![span]);
        }

        rows.into_iter().map(|r| self.chunk_row(r)).collect()
    }

    /// Merge a row's spans into cell chunks.
    fn chunk_row(&self, mut spans: Vec<&TextSpan>) -> Row {
        spans.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
        let mut chunks: Vec<Chunk> = Vec::new();
        for span in spans {
            let text = span.text.trim();
            if let Some(last) = chunks.last_mut() {
                if span.bbox.x0 - last.bbox.x1 < self.config.min_column_gap {
                    if !last.text.is_empty() {
                        last.text.push(' ');
                    }
                    last.text.push_str(text);
                    last.bbox = last.bbox.union(&span.bbox);
                    continue;
                }
            }
            chunks.push(Chunk {
                text: text.to_string(),
                bbox: span.bbox,
            });
        }
        Row { chunks }
    }

    /// Column left edges shared by enough multi-chunk rows.
    fn column_edges(&self, rows: &[Row]) -> Vec<f32> {
        let multi: Vec<&Row> = rows.iter().filter(|r| r.chunks.len() >= 2).collect();
        if multi.len() < self.config.min_rows {
            return vec![];
        }

        let bucket = self.config.bucket_size.max(1.0);
        let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
        for row in &multi {
            let mut seen: Vec<i64> = row
                .chunks
                .iter()
                .map(|c| (c.bbox.x0 / bucket).round() as i64)
                .collect();
            seen.dedup();
            for key in seen {
                *counts.entry(key).or_default() += 1;
            }
        }

        let needed = ((multi.len() as f32 * self.config.min_alignment_ratio).ceil() as usize).max(2);
        let candidates: Vec<f32> = counts
            .into_iter()
            .filter(|(_, n)| *n >= needed)
            .map(|(key, _)| key as f32 * bucket)
            .collect();

        let mut merged: Vec<f32> = Vec::new();
        for edge in candidates {
            match merged.last() {
                Some(last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    /// Share of a row's chunks whose left edge sits on a column.
    fn alignment(&self, row: &Row, columns: &[f32]) -> f32 {
        if row.chunks.is_empty() {
            return 0.0;
        }
        let tolerance = self.config.bucket_size.max(1.0);
        let aligned = row
            .chunks
            .iter()
            .filter(|c| columns.iter().any(|col| (c.bbox.x0 - col).abs() <= tolerance))
            .count();
        aligned as f32 / row.chunks.len() as f32
    }

    /// `[start, end)` row ranges that look tabular.
    fn find_regions(&self, rows: &[Row], columns: &[f32]) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            let tabular =
                row.chunks.len() >= 2 && self.alignment(row, columns) >= self.config.min_alignment_ratio;
            match (tabular, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    if i - s >= self.config.min_rows {
                        regions.push((s, i));
                    }
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            if rows.len() - s >= self.config.min_rows {
                regions.push((s, rows.len()));
            }
        }
        regions
    }

    fn build_table(&self, rows: &[Row]) -> Option<DetectedTable> {
        let columns = self.column_edges(rows);
        if columns.len() < self.config.min_columns || columns.len() > self.config.max_columns {
            trace!("Rejecting region with {} columns", columns.len());
            return None;
        }

        let tolerance = self.config.bucket_size.max(1.0);
        let mut grid = Vec::with_capacity(rows.len());
        for row in rows {
            let mut cells = vec![String::new(); columns.len()];
            for chunk in &row.chunks {
                let col = columns
                    .iter()
                    .rposition(|edge| *edge <= chunk.bbox.x0 + tolerance)
                    .unwrap_or(0);
                if !cells[col].is_empty() {
                    cells[col].push(' ');
                }
                cells[col].push_str(&chunk.text);
            }
            while cells.last().is_some_and(|c| c.is_empty()) {
                cells.pop();
            }
            grid.push(cells);
        }

        let bbox = BBox::union_all(rows.iter().flat_map(|r| r.chunks.iter().map(|c| &c.bbox)))?;
        Some(DetectedTable { bbox, grid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(text: &str, x: f32, y: f32) -> TextSpan {
        let width = text.len() as f32 * 5.0;
        TextSpan::new(text, 10.0, BBox::new(x, y, x + width, y + 10.0))
    }

    fn three_by_three() -> Vec<TextSpan> {
        vec![
            cell("Name", 50.0, 100.0),
            cell("Qty", 200.0, 100.0),
            cell("Price", 300.0, 100.0),
            cell("Apple", 50.0, 115.0),
            cell("3", 200.0, 115.0),
            cell("1.20", 300.0, 115.0),
            cell("Pear", 50.0, 130.0),
            cell("5", 200.0, 130.0),
            cell("0.80", 300.0, 130.0),
        ]
    }

    #[test]
    fn detects_aligned_grid() {
        let tables = TableDetector::default().detect(&three_by_three());
        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0].grid,
            vec![
                vec!["Name", "Qty", "Price"],
                vec!["Apple", "3", "1.20"],
                vec!["Pear", "5", "0.80"],
            ]
        );
        assert_eq!(tables[0].bbox.x0, 50.0);
        assert_eq!(tables[0].bbox.y0, 100.0);
    }

    #[test]
    fn prose_is_not_a_table() {
        let spans = vec![
            cell("The", 50.0, 100.0),
            cell("quick", 70.0, 100.0),
            cell("brown", 100.0, 100.0),
            cell("fox", 50.0, 114.0),
            cell("jumps", 70.0, 114.0),
            cell("over", 100.0, 114.0),
        ];
        assert!(TableDetector::default().detect(&spans).is_empty());
    }

    #[test]
    fn missing_trailing_cell_gives_short_row() {
        let mut spans = three_by_three();
        spans.retain(|s| s.text != "0.80");
        let tables = TableDetector::default().detect(&spans);
        assert_eq!(tables[0].grid[2], vec!["Pear", "5"]);
    }

    #[test]
    fn disabled_detector_finds_nothing() {
        let config = TableDetectionConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(TableDetector::new(config).detect(&three_by_three()).is_empty());
    }

    #[test]
    fn single_row_is_not_a_table() {
        let spans = vec![cell("a", 50.0, 100.0), cell("b", 200.0, 100.0)];
        assert!(TableDetector::default().detect(&spans).is_empty());
    }
}
