//! Content classification for text blocks.
//!
//! Each retained block gets exactly one [`SegmentKind`]. The rules are an
//! ordered table and the first one that fires wins:
//!
//! | order | rule      | fires when                                               |
//! |-------|-----------|----------------------------------------------------------|
//! | 1     | formula   | a LaTeX-like pattern matches, or math symbols dominate    |
//! | 2     | heading   | font size above the heading minimum, and short or `:`-ended |
//! | 3     | list      | starts with `-`, `•`, `*` or `N.` followed by whitespace  |
//! | 4     | paragraph | always                                                    |
//!
//! The thresholds come from [`ClassifierThresholds`].

use crate::config::ClassifierThresholds;
use crate::model::{BBox, ClassifiedSegment, SegmentKind, TextBlock};
use crate::pipeline::normalize::normalize_block_text;
use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};
use tracing::trace;

/// LaTeX-like markers that make a block a formula outright.
static FORMULA_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"\\frac\{",
        r"\\sqrt\{",
        r"\\sum\{",
        r"\\int\{",
        r"\{.*\}_\{.*\}",
        r"\{.*\}\^\{.*\}",
        r"\\(?:alpha|beta|gamma|delta|theta|lambda|mu|pi|sigma|phi|omega)",
        r"\\(?:leq|geq|neq|approx|infty)",
        r"\$.*\$",
    ])
    .unwrap()
});

static BULLET_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[-•*]\s+").unwrap());
static NUMBERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d+\.\s+").unwrap());

/// Characters counted by the math-symbol ratio.
const MATH_SYMBOLS: &str = "∑∏∫√±≤≥≠∞∂∇∆αβγδεζηθικλμνξοπρστυφχψω";

/// What a rule sees of a block.
#[derive(Debug, Clone, Copy)]
pub struct BlockFeatures<'a> {
    /// Trimmed text.
    pub text: &'a str,
    /// Size of the block's first span.
    pub font_size: f32,
}

type Rule = fn(&BlockFeatures<'_>, &ClassifierThresholds) -> Option<SegmentKind>;

const RULES: [(&str, Rule); 4] = [
    ("formula", formula_rule),
    ("heading", heading_rule),
    ("list", list_rule),
    ("paragraph", paragraph_rule),
];

/// Classify trimmed text at a given font size.
pub fn classify_text(text: &str, font_size: f32, t: &ClassifierThresholds) -> SegmentKind {
    let features = BlockFeatures { text, font_size };
    RULES
        .iter()
        .find_map(|(name, rule)| {
            let kind = rule(&features, t)?;
            trace!("Rule '{}' fired for {:?}", name, truncate(text, 40));
            Some(kind)
        })
        .unwrap_or(SegmentKind::Paragraph)
}

/// Classify one engine block.
///
/// Returns `None` when the block's text is empty after normalisation.
pub fn classify_block(block: &TextBlock, t: &ClassifierThresholds) -> Option<ClassifiedSegment> {
    let text = normalize_block_text(&block.text());
    if text.is_empty() {
        return None;
    }
    let font_size = block.first_font_size().unwrap_or(t.default_font_size);
    Some(ClassifiedSegment {
        kind: classify_text(&text, font_size, t),
        text,
        bbox: block.bbox,
        font_size,
    })
}

/// Classify the blocks that remain after removing table regions, top to
/// bottom.
///
/// A block is dropped when its box has a positive-area overlap with any table
/// region; edge contact alone keeps it.
pub fn classify_blocks(
    blocks: &[TextBlock],
    table_regions: &[BBox],
    t: &ClassifierThresholds,
) -> Vec<ClassifiedSegment> {
    let mut ordered: Vec<&TextBlock> = blocks.iter().collect();
    ordered.sort_by(|a, b| a.bbox.y0.total_cmp(&b.bbox.y0));
    ordered
        .into_iter()
        .filter(|b| !table_regions.iter().any(|r| b.bbox.intersects(r)))
        .filter_map(|b| classify_block(b, t))
        .collect()
}

/// Heading level for a font size already past the heading minimum.
pub fn heading_level(font_size: f32, t: &ClassifierThresholds) -> u8 {
    if font_size > t.heading_level1_font_size {
        1
    } else if font_size > t.heading_level2_font_size {
        2
    } else if font_size > t.heading_min_font_size {
        3
    } else {
        4
    }
}

/// True when the text matches a formula pattern, or is short and rich in
/// math symbols.
pub fn is_math_formula(text: &str, t: &ClassifierThresholds) -> bool {
    if FORMULA_PATTERNS.is_match(text) {
        return true;
    }
    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    let math = text.chars().filter(|c| MATH_SYMBOLS.contains(*c)).count();
    let ratio = math as f32 / total as f32;
    ratio > t.math_symbol_ratio && total < t.formula_max_chars
}

fn formula_rule(f: &BlockFeatures<'_>, t: &ClassifierThresholds) -> Option<SegmentKind> {
    is_math_formula(f.text, t).then_some(SegmentKind::Formula)
}

fn heading_rule(f: &BlockFeatures<'_>, t: &ClassifierThresholds) -> Option<SegmentKind> {
    if f.font_size <= t.heading_min_font_size {
        return None;
    }
    let short = f.text.chars().count() < t.heading_max_chars;
    (f.text.ends_with(':') || short).then(|| SegmentKind::Heading {
        level: heading_level(f.font_size, t),
    })
}

fn list_rule(f: &BlockFeatures<'_>, _t: &ClassifierThresholds) -> Option<SegmentKind> {
    (BULLET_ITEM.is_match(f.text) || NUMBERED_ITEM.is_match(f.text)).then_some(SegmentKind::ListItem)
}

fn paragraph_rule(_f: &BlockFeatures<'_>, _t: &ClassifierThresholds) -> Option<SegmentKind> {
    Some(SegmentKind::Paragraph)
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TextLine, TextSpan};

    fn t() -> ClassifierThresholds {
        ClassifierThresholds::default()
    }

    fn block(text: &str, size: f32, y: f32) -> TextBlock {
        let span = TextSpan::new(text, size, BBox::new(50.0, y, 300.0, y + size));
        TextBlock::from_lines(vec![TextLine::from_spans(vec![span])])
    }

    #[test]
    fn large_short_text_is_level_one_heading() {
        assert_eq!(
            classify_text("Introduction", 20.0, &t()),
            SegmentKind::Heading { level: 1 }
        );
    }

    #[test]
    fn heading_levels_follow_size_bands() {
        assert_eq!(heading_level(18.5, &t()), 1);
        assert_eq!(heading_level(18.0, &t()), 2);
        assert_eq!(heading_level(17.0, &t()), 2);
        assert_eq!(heading_level(16.0, &t()), 3);
        assert_eq!(heading_level(15.0, &t()), 3);
        assert_eq!(heading_level(14.0, &t()), 4);
    }

    #[test]
    fn size_at_minimum_is_not_a_heading() {
        assert_eq!(classify_text("Section", 14.0, &t()), SegmentKind::Paragraph);
    }

    #[test]
    fn long_large_text_needs_colon() {
        let long = "word ".repeat(30);
        let long = long.trim();
        assert_eq!(classify_text(long, 17.0, &t()), SegmentKind::Paragraph);
        let with_colon = format!("{long}:");
        assert_eq!(
            classify_text(&with_colon, 17.0, &t()),
            SegmentKind::Heading { level: 2 }
        );
    }

    #[test]
    fn latex_markers_are_formulas() {
        for text in [
            r"\frac{a}{b}",
            r"x \leq y",
            r"{x}_{i}",
            r"$E = mc^2$",
            r"\alpha + 1",
        ] {
            assert_eq!(classify_text(text, 12.0, &t()), SegmentKind::Formula, "{text}");
        }
    }

    #[test]
    fn inline_latex_versus_prose() {
        assert_eq!(
            classify_text("E = mc^2, \\alpha + \\beta", 12.0, &t()),
            SegmentKind::Formula
        );
        assert_eq!(
            classify_text("This is a normal sentence about physics.", 12.0, &t()),
            SegmentKind::Paragraph
        );
    }

    #[test]
    fn formula_beats_heading() {
        assert_eq!(classify_text(r"\sqrt{2}", 24.0, &t()), SegmentKind::Formula);
    }

    #[test]
    fn math_symbol_ratio() {
        // 3 of 5 chars are math symbols.
        assert!(is_math_formula("∑ ∫ √", &t()));
        // 1 of 12.
        assert!(!is_math_formula("the value α", &t()));
        // Ratio passes but too long.
        let long = "∑a".repeat(150);
        assert!(!is_math_formula(&long, &t()));
    }

    #[test]
    fn list_markers() {
        assert_eq!(classify_text("- apples", 12.0, &t()), SegmentKind::ListItem);
        assert_eq!(classify_text("• pears", 12.0, &t()), SegmentKind::ListItem);
        assert_eq!(classify_text("* plums", 12.0, &t()), SegmentKind::ListItem);
        assert_eq!(classify_text("12. figs", 12.0, &t()), SegmentKind::ListItem);
        assert_eq!(classify_text("3.14 is pi", 12.0, &t()), SegmentKind::Paragraph);
        assert_eq!(classify_text("-dash", 12.0, &t()), SegmentKind::Paragraph);
    }

    #[test]
    fn empty_block_is_discarded() {
        assert!(classify_block(&block("   ", 12.0, 0.0), &t()).is_none());
        assert!(classify_block(&TextBlock::default(), &t()).is_none());
    }

    #[test]
    fn classified_block_keeps_trimmed_text_and_size() {
        let seg = classify_block(&block("  Plain words \n", 11.0, 0.0), &t()).unwrap();
        assert_eq!(seg.kind, SegmentKind::Paragraph);
        assert_eq!(seg.text, "Plain words");
        assert_eq!(seg.font_size, 11.0);
    }

    #[test]
    fn blocks_sorted_and_table_regions_removed() {
        let blocks = vec![
            block("Second", 12.0, 200.0),
            block("Inside table", 12.0, 120.0),
            block("First", 12.0, 50.0),
        ];
        let region = BBox::new(40.0, 110.0, 320.0, 150.0);
        let segs = classify_blocks(&blocks, &[region], &t());
        let texts: Vec<&str> = segs.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["First", "Second"]);
    }

    #[test]
    fn edge_contact_with_table_keeps_block() {
        // Block spans y 100..112, table starts at 112.
        let blocks = vec![block("Caption", 12.0, 100.0)];
        let region = BBox::new(40.0, 112.0, 320.0, 150.0);
        assert_eq!(classify_blocks(&blocks, &[region], &t()).len(), 1);
    }
}
