//! Span → line → block grouping.
//!
//! pdfium reports text as a flat list of text objects (roughly one per run or
//! word). The classifier works on blocks, so the adapter rebuilds them here:
//!
//! 1. **Lines**: spans whose top edges sit within 30% of their font size of
//!    each other share a line; spans are ordered left to right and a space is
//!    inserted where a visible gap separates two runs.
//! 2. **Blocks**: consecutive lines stay together unless the vertical gap is
//!    well above the page's average line pitch, the font size jumps, or the
//!    left margin moves (indented list, new column).

use crate::model::{TextBlock, TextLine, TextSpan};
use tracing::debug;

/// Tolerances for [`group_spans`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockGrouping {
    /// Spans within this fraction of their font size share a line.
    pub line_tolerance_factor: f32,
    /// A horizontal gap above this fraction of the font size becomes a space.
    pub word_gap_factor: f32,
    /// Break a block when the line pitch exceeds this multiple of the average.
    pub paragraph_gap_factor: f32,
    /// Break a block on a font size change larger than this (points).
    pub font_size_jump: f32,
    /// Break a block on a left-margin change larger than this (points).
    pub indent_jump: f32,
}

impl Default for BlockGrouping {
    fn default() -> Self {
        Self {
            line_tolerance_factor: 0.3,
            word_gap_factor: 0.15,
            paragraph_gap_factor: 1.5,
            font_size_jump: 1.0,
            indent_jump: 20.0,
        }
    }
}

/// Group raw spans into blocks in top-to-bottom order.
pub fn group_spans(spans: Vec<TextSpan>, grouping: &BlockGrouping) -> Vec<TextBlock> {
    let span_count = spans.len();
    let lines = group_into_lines(spans, grouping);
    let blocks = group_into_blocks(lines, grouping);
    debug!("Grouped {} spans into {} blocks", span_count, blocks.len());
    blocks
}

fn group_into_lines(spans: Vec<TextSpan>, grouping: &BlockGrouping) -> Vec<TextLine> {
    let mut spans: Vec<TextSpan> = spans
        .into_iter()
        .filter(|s| !s.text.is_empty())
        .collect();
    spans.sort_by(|a, b| {
        a.bbox
            .y0
            .total_cmp(&b.bbox.y0)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    let mut lines: Vec<Vec<TextSpan>> = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in spans {
        let tolerance = span.font_size.max(1.0) * grouping.line_tolerance_factor;
        match current_y {
            Some(y) if (span.bbox.y0 - y).abs() <= tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                current_y = Some(span.bbox.y0);
                current.push(span);
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
        .into_iter()
        .map(|spans| TextLine::from_spans(join_runs(spans, grouping)))
        .collect()
}

/// Sort a line's spans left to right and add a space between runs that are
/// visibly apart and do not already carry one.
fn join_runs(mut spans: Vec<TextSpan>, grouping: &BlockGrouping) -> Vec<TextSpan> {
    spans.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
    for i in 1..spans.len() {
        let gap = spans[i].bbox.x0 - spans[i - 1].bbox.x1;
        let threshold = spans[i].font_size.max(1.0) * grouping.word_gap_factor;
        let needs_space = gap > threshold
            && !spans[i - 1].text.ends_with(char::is_whitespace)
            && !spans[i].text.starts_with(char::is_whitespace);
        if needs_space {
            spans[i - 1].text.push(' ');
        }
    }
    spans
}

fn group_into_blocks(lines: Vec<TextLine>, grouping: &BlockGrouping) -> Vec<TextBlock> {
    if lines.is_empty() {
        return vec![];
    }

    let avg_pitch = average_line_pitch(&lines);
    let mut blocks = Vec::new();
    let mut current: Vec<TextLine> = Vec::new();

    for line in lines {
        if let Some(prev) = current.last() {
            if should_break_block(prev, &line, avg_pitch, grouping) {
                blocks.push(TextBlock::from_lines(std::mem::take(&mut current)));
            }
        }
        current.push(line);
    }
    if !current.is_empty() {
        blocks.push(TextBlock::from_lines(current));
    }
    blocks
}

fn line_font_size(line: &TextLine) -> f32 {
    line.spans.first().map(|s| s.font_size).unwrap_or(0.0)
}

fn average_line_pitch(lines: &[TextLine]) -> f32 {
    let pitches: Vec<f32> = lines
        .windows(2)
        .map(|w| w[1].bbox.y0 - w[0].bbox.y0)
        .filter(|p| *p > 0.1)
        .collect();
    if pitches.is_empty() {
        return 12.0;
    }
    pitches.iter().sum::<f32>() / pitches.len() as f32
}

fn should_break_block(
    prev: &TextLine,
    curr: &TextLine,
    avg_pitch: f32,
    grouping: &BlockGrouping,
) -> bool {
    let pitch = curr.bbox.y0 - prev.bbox.y0;
    if pitch > avg_pitch * grouping.paragraph_gap_factor {
        return true;
    }
    if (line_font_size(prev) - line_font_size(curr)).abs() > grouping.font_size_jump {
        return true;
    }
    (prev.bbox.x0 - curr.bbox.x0).abs() > grouping.indent_jump
}
