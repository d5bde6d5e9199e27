//! Layout assembly: merge text segments, tables and images into one
//! top-to-bottom Markdown page.
//!
//! Ordering uses each element's top edge only. The sort is stable and the
//! input is concatenated text → tables → images, so elements sharing a top
//! edge keep that order.
//!
//! Fragment formats:
//!
//! | element   | fragment                                  |
//! |-----------|-------------------------------------------|
//! | heading   | `\n{#×level} {text}\n`                    |
//! | formula   | `\n$$\n{text}\n$$\n` if `$` present, else ``\n`{text}`\n`` |
//! | list item, paragraph, table, image | `\n{content}\n`  |
//!
//! Fragments are joined with `\n`. A non-empty page gets the
//! `\n\n---\n\n*Page N*\n` footer.

use crate::model::{BBox, ClassifiedSegment, RenderedImage, RenderedTable, SegmentKind};

/// One positioned element of the page.
#[derive(Debug, Clone, Copy)]
pub enum Segment<'a> {
    Text(&'a ClassifiedSegment),
    Table(&'a RenderedTable),
    Image(&'a RenderedImage),
}

impl Segment<'_> {
    pub fn bbox(&self) -> &BBox {
        match self {
            Segment::Text(s) => &s.bbox,
            Segment::Table(t) => &t.bbox,
            Segment::Image(i) => &i.bbox,
        }
    }

    /// Markdown fragment for this element.
    pub fn render(&self) -> String {
        match self {
            Segment::Text(s) => render_text(s),
            Segment::Table(t) => format!("\n{}\n", t.markdown),
            Segment::Image(i) => format!("\n{}\n", i.markdown),
        }
    }
}

fn render_text(seg: &ClassifiedSegment) -> String {
    match seg.kind {
        SegmentKind::Heading { level } => {
            format!("\n{} {}\n", "#".repeat(usize::from(level)), seg.text.trim())
        }
        SegmentKind::Formula if seg.text.contains('$') => format!("\n$$\n{}\n$$\n", seg.text),
        SegmentKind::Formula => format!("\n`{}`\n", seg.text),
        SegmentKind::ListItem | SegmentKind::Paragraph => format!("\n{}\n", seg.text),
    }
}

/// All elements sorted by top edge.
pub fn order_segments<'a>(
    text: &'a [ClassifiedSegment],
    tables: &'a [RenderedTable],
    images: &'a [RenderedImage],
) -> Vec<Segment<'a>> {
    let mut all: Vec<Segment<'a>> = text
        .iter()
        .map(Segment::Text)
        .chain(tables.iter().map(Segment::Table))
        .chain(images.iter().map(Segment::Image))
        .collect();
    all.sort_by(|a, b| a.bbox().y0.total_cmp(&b.bbox().y0));
    all
}

/// Page footer appended to non-empty pages.
pub fn page_footer(page: usize) -> String {
    format!("\n\n---\n\n*Page {page}*\n")
}

/// Assemble a page's Markdown.
///
/// Returns an empty string when there is nothing to render; the footer is
/// only added when the body has non-whitespace content and `footer` is set.
pub fn assemble_page(
    text: &[ClassifiedSegment],
    tables: &[RenderedTable],
    images: &[RenderedImage],
    page: usize,
    footer: bool,
) -> String {
    let parts: Vec<String> = order_segments(text, tables, images)
        .iter()
        .map(Segment::render)
        .collect();
    let mut markdown = parts.join("\n");
    if footer && !markdown.trim().is_empty() {
        markdown.push_str(&page_footer(page));
    }
    markdown
}

/// Whitespace-delimited word count divided by `words_per_minute`, rounded
/// down.
pub fn reading_time_minutes(markdown: &str, words_per_minute: usize) -> usize {
    markdown.split_whitespace().count() / words_per_minute.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(kind: SegmentKind, text: &str, y: f32) -> ClassifiedSegment {
        ClassifiedSegment {
            kind,
            text: text.into(),
            bbox: BBox::new(0.0, y, 100.0, y + 10.0),
            font_size: 12.0,
        }
    }

    fn table(md: &str, y: f32) -> RenderedTable {
        RenderedTable {
            id: "table_1".into(),
            bbox: BBox::new(0.0, y, 100.0, y + 40.0),
            markdown: md.into(),
            row_count: 2,
            col_count: 2,
        }
    }

    fn image(md: &str, y: f32) -> RenderedImage {
        RenderedImage {
            id: "image_1".into(),
            bbox: BBox::new(0.0, y, 100.0, y + 40.0),
            markdown: md.into(),
            storage_path: String::new(),
            width: 1,
            height: 1,
        }
    }

    #[test]
    fn heading_fragment() {
        let s = seg(SegmentKind::Heading { level: 2 }, "Results", 0.0);
        assert_eq!(Segment::Text(&s).render(), "\n## Results\n");
    }

    #[test]
    fn formula_fragments() {
        let dollar = seg(SegmentKind::Formula, "$x^2$", 0.0);
        assert_eq!(Segment::Text(&dollar).render(), "\n$$\n$x^2$\n$$\n");
        let plain = seg(SegmentKind::Formula, "∑ ∫ √", 0.0);
        assert_eq!(Segment::Text(&plain).render(), "\n`∑ ∫ √`\n");
    }

    #[test]
    fn single_heading_page() {
        let text = vec![seg(SegmentKind::Heading { level: 1 }, "Introduction", 50.0)];
        let md = assemble_page(&text, &[], &[], 1, true);
        assert_eq!(md, "\n# Introduction\n\n\n---\n\n*Page 1*\n");
    }

    #[test]
    fn elements_are_ordered_by_top_edge() {
        let text = vec![
            seg(SegmentKind::Paragraph, "below", 300.0),
            seg(SegmentKind::Paragraph, "above", 10.0),
        ];
        let tables = vec![table("| a |\n| --- |", 100.0)];
        let images = vec![image("![image1](/x.png)", 200.0)];
        let md = assemble_page(&text, &tables, &images, 2, false);
        assert_eq!(
            md,
            "\nabove\n\n\n| a |\n| --- |\n\n\n![image1](/x.png)\n\n\nbelow\n"
        );
    }

    #[test]
    fn ties_keep_text_table_image_order() {
        let text = vec![seg(SegmentKind::Paragraph, "t", 100.0)];
        let tables = vec![table("T", 100.0)];
        let images = vec![image("I", 100.0)];
        let kinds: Vec<&str> = order_segments(&text, &tables, &images)
            .iter()
            .map(|s| match s {
                Segment::Text(_) => "text",
                Segment::Table(_) => "table",
                Segment::Image(_) => "image",
            })
            .collect();
        assert_eq!(kinds, vec!["text", "table", "image"]);
    }

    #[test]
    fn empty_page_has_no_footer() {
        assert_eq!(assemble_page(&[], &[], &[], 4, true), "");
    }

    #[test]
    fn footer_can_be_disabled() {
        let text = vec![seg(SegmentKind::Paragraph, "body", 0.0)];
        assert_eq!(assemble_page(&text, &[], &[], 1, false), "\nbody\n");
    }

    #[test]
    fn reading_time_rounds_down() {
        let words = |n: usize| vec!["word"; n].join(" ");
        assert_eq!(reading_time_minutes(&words(400), 200), 2);
        assert_eq!(reading_time_minutes(&words(150), 200), 0);
        assert_eq!(reading_time_minutes(&words(399), 200), 1);
        assert_eq!(reading_time_minutes("", 200), 0);
    }
}
