//! Page content types shared by every pipeline stage.
//!
//! All coordinates are PDF points in a **top-down** page space: `y0` is the
//! top edge and grows towards the bottom of the page. The engine adapter
//! flips pdfium's bottom-up coordinates once, on the way in, so the rest of
//! the pipeline never has to think about it.
//!
//! Everything here is transient: built for one page request and dropped
//! once its Markdown has been returned.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box `(x0, y0, x1, y1)`, top-down page space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// A box with no area (or inverted) never intersects anything.
    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    /// True when the two boxes share a region of positive area.
    ///
    /// Boxes that merely touch along an edge do not intersect.
    pub fn intersects(&self, other: &BBox) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Union of every box in the iterator; `None` when it is empty.
    pub fn union_all<'a>(boxes: impl IntoIterator<Item = &'a BBox>) -> Option<BBox> {
        boxes.into_iter().fold(None, |acc, b| match acc {
            None => Some(*b),
            Some(a) => Some(a.union(b)),
        })
    }
}

/// Page size in points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PageRect {
    pub width: f32,
    pub height: f32,
}

/// A glyph span: one run of text sharing a font and size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub text: String,
    pub font_size: f32,
    pub font_name: String,
    pub bbox: BBox,
}

impl TextSpan {
    pub fn new(text: impl Into<String>, font_size: f32, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            font_size,
            font_name: String::new(),
            bbox,
        }
    }

    pub fn with_font(mut self, name: impl Into<String>) -> Self {
        self.font_name = name.into();
        self
    }
}

/// Spans on one baseline, left to right.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
    pub bbox: BBox,
}

impl TextLine {
    /// Build a line from spans, computing its bbox.
    pub fn from_spans(spans: Vec<TextSpan>) -> Self {
        let bbox = BBox::union_all(spans.iter().map(|s| &s.bbox)).unwrap_or_default();
        Self { spans, bbox }
    }

    /// Concatenated span text.
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// A raw text block as handed over by the engine: lines → spans.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
    pub bbox: BBox,
}

impl TextBlock {
    /// Build a block from lines, computing its bbox.
    pub fn from_lines(lines: Vec<TextLine>) -> Self {
        let bbox = BBox::union_all(lines.iter().map(|l| &l.bbox)).unwrap_or_default();
        Self { lines, bbox }
    }

    /// Block text: each line's spans concatenated, lines joined by `\n`.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.text());
            out.push('\n');
        }
        out
    }

    /// Size of the first span of the first line, if any.
    pub fn first_font_size(&self) -> Option<f32> {
        self.lines
            .first()
            .and_then(|l| l.spans.first())
            .map(|s| s.font_size)
    }

    pub fn spans(&self) -> impl Iterator<Item = &TextSpan> {
        self.lines.iter().flat_map(|l| l.spans.iter())
    }
}

/// A table found on the page, as rows of raw cell strings.
///
/// Rows may have unequal lengths; the table formatter pads them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectedTable {
    pub bbox: BBox,
    pub grid: Vec<Vec<String>>,
}

/// Opaque handle the engine uses to load an image's pixels later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageHandle(pub usize);

/// An image placed on the page. Pixels are not loaded yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedImage {
    pub bbox: BBox,
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Colour components including alpha (RGB = 3, RGBA = 4, CMYK = 4).
    pub channels: u8,
    pub has_alpha: bool,
    pub handle: ImageHandle,
}

impl DetectedImage {
    /// Colour channels excluding alpha.
    pub fn color_channels(&self) -> u8 {
        self.channels.saturating_sub(u8::from(self.has_alpha))
    }
}

/// Everything the engine reports about one page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageContent {
    /// 1-based.
    pub page_number: usize,
    pub rect: PageRect,
    pub text_blocks: Vec<TextBlock>,
    pub tables: Vec<DetectedTable>,
    pub images: Vec<DetectedImage>,
}

/// Semantic type assigned to a retained text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SegmentKind {
    /// Level 1–4, decided from the block's font size.
    Heading { level: u8 },
    Paragraph,
    ListItem,
    Formula,
}

/// One classified text block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSegment {
    pub kind: SegmentKind,
    /// Trimmed block text; internal line breaks preserved.
    pub text: String,
    pub bbox: BBox,
    pub font_size: f32,
}

/// A detected table rendered to a Markdown pipe table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedTable {
    pub id: String,
    pub bbox: BBox,
    pub markdown: String,
    pub row_count: usize,
    pub col_count: usize,
}

/// A stored image and the Markdown reference pointing at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedImage {
    pub id: String,
    pub bbox: BBox,
    pub markdown: String,
    /// Where the image store put the file (or an in-memory key).
    pub storage_path: String,
    pub width: u32,
    pub height: u32,
}
