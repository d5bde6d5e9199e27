//! Configuration types for page extraction and document conversion.
//!
//! All behaviour is controlled through [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`]. The classification heuristics are plain
//! numbers with no documented derivation, so every one of them lives here as
//! a named, overridable constant instead of being buried in the classifier.

use crate::error::PageMdError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default retrieval route the Markdown image references point at.
pub const DEFAULT_IMAGE_URL_PREFIX: &str = "/api/temp-image/";

/// Font-size and length thresholds used by the content classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierThresholds {
    /// A block is a heading candidate only above this size. Default: 14.
    /// Headings at or below the level-2 bound render as level 3.
    pub heading_min_font_size: f32,
    /// Above this size a heading renders as level 2. Default: 16.
    pub heading_level2_font_size: f32,
    /// Above this size a heading renders as level 1. Default: 18.
    pub heading_level1_font_size: f32,
    /// Headings not ending in `:` must be shorter than this. Default: 100.
    pub heading_max_chars: usize,
    /// Font size assumed when a block has no span. Default: 12.
    pub default_font_size: f32,
    /// Share of math symbols above which short text is a formula. Default: 0.2.
    pub math_symbol_ratio: f32,
    /// The symbol-ratio rule only applies below this length. Default: 200.
    pub formula_max_chars: usize,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            heading_min_font_size: 14.0,
            heading_level2_font_size: 16.0,
            heading_level1_font_size: 18.0,
            heading_max_chars: 100,
            default_font_size: 12.0,
            math_symbol_ratio: 0.2,
            formula_max_chars: 200,
        }
    }
}

/// Tuning for the text-alignment table detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TableDetectionConfig {
    /// Turn detection off entirely (pages then never carry tables).
    pub enabled: bool,
    /// Minimum consecutive aligned rows. Default: 2.
    pub min_rows: usize,
    /// Minimum columns. Default: 2.
    pub min_columns: usize,
    /// More columns than this is usually word-level splitting. Default: 8.
    pub max_columns: usize,
    /// Spans within this fraction of their font size share a row. Default: 0.4.
    pub row_tolerance_factor: f32,
    /// Fraction of a row's cells that must sit on a column edge. Default: 0.5.
    pub min_alignment_ratio: f32,
    /// Column edges closer than this (points) are merged. Default: 15.
    pub min_column_gap: f32,
    /// Edge bucketing width in points. Default: 5.
    pub bucket_size: f32,
}

impl Default for TableDetectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_rows: 2,
            min_columns: 2,
            max_columns: 8,
            row_tolerance_factor: 0.4,
            min_alignment_ratio: 0.5,
            min_column_gap: 15.0,
            bucket_size: 5.0,
        }
    }
}

/// Configuration for page extraction and multi-page conversion.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdfpage2md::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .words_per_minute(250)
///     .page_footer(false)
///     .build()
///     .unwrap();
/// assert_eq!(config.words_per_minute, 250);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Classifier thresholds (heading sizes, math-symbol ratio, …).
    pub thresholds: ClassifierThresholds,

    /// Table detector tuning.
    pub table_detection: TableDetectionConfig,

    /// Reading speed used for `estimated_reading_time_minutes`. Default: 200.
    pub words_per_minute: usize,

    /// Append `---` and `*Page N*` to every non-empty page. Default: true.
    pub page_footer: bool,

    /// Directory extracted images are written to. Default: system temp dir.
    pub image_dir: PathBuf,

    /// Route prefix used in `![imageN](<prefix><filename>)`.
    /// Default: `/api/temp-image/`.
    pub image_url_prefix: String,

    /// Pixel width of the raster layer in the vector render. Default: 1200.
    pub render_width: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection for multi-page conversion. Default: all pages.
    pub pages: PageSelection,

    /// Separator between pages in assembled documents. Default: None.
    pub page_separator: PageSeparator,

    /// Pages processed at once by the streaming converter. Default: 4.
    ///
    /// pdfium serialises calls behind a global lock, so the win comes from
    /// overlapping image encoding and disk writes, not from parallel parsing.
    pub concurrency: usize,

    /// Per-page progress events for multi-page conversion.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            thresholds: ClassifierThresholds::default(),
            table_detection: TableDetectionConfig::default(),
            words_per_minute: 200,
            page_footer: true,
            image_dir: std::env::temp_dir(),
            image_url_prefix: DEFAULT_IMAGE_URL_PREFIX.to_string(),
            render_width: 1200,
            password: None,
            pages: PageSelection::default(),
            page_separator: PageSeparator::default(),
            concurrency: 4,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("thresholds", &self.thresholds)
            .field("table_detection", &self.table_detection)
            .field("words_per_minute", &self.words_per_minute)
            .field("page_footer", &self.page_footer)
            .field("image_dir", &self.image_dir)
            .field("image_url_prefix", &self.image_url_prefix)
            .field("render_width", &self.render_width)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pages", &self.pages)
            .field("page_separator", &self.page_separator)
            .field("concurrency", &self.concurrency)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn thresholds(mut self, thresholds: ClassifierThresholds) -> Self {
        self.config.thresholds = thresholds;
        self
    }

    pub fn heading_font_sizes(mut self, min: f32, level2: f32, level1: f32) -> Self {
        self.config.thresholds.heading_min_font_size = min;
        self.config.thresholds.heading_level2_font_size = level2;
        self.config.thresholds.heading_level1_font_size = level1;
        self
    }

    pub fn math_symbol_ratio(mut self, ratio: f32) -> Self {
        self.config.thresholds.math_symbol_ratio = ratio;
        self
    }

    pub fn table_detection(mut self, table: TableDetectionConfig) -> Self {
        self.config.table_detection = table;
        self
    }

    pub fn detect_tables(mut self, enabled: bool) -> Self {
        self.config.table_detection.enabled = enabled;
        self
    }

    pub fn words_per_minute(mut self, wpm: usize) -> Self {
        self.config.words_per_minute = wpm;
        self
    }

    pub fn page_footer(mut self, v: bool) -> Self {
        self.config.page_footer = v;
        self
    }

    pub fn image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.image_dir = dir.into();
        self
    }

    pub fn image_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.image_url_prefix = prefix.into();
        self
    }

    pub fn render_width(mut self, px: u32) -> Self {
        self.config.render_width = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, PageMdError> {
        let c = &self.config;
        let t = &c.thresholds;
        if !(t.heading_min_font_size <= t.heading_level2_font_size
            && t.heading_level2_font_size <= t.heading_level1_font_size)
        {
            return Err(PageMdError::InvalidConfig(format!(
                "heading font sizes must be ascending, got {} / {} / {}",
                t.heading_min_font_size, t.heading_level2_font_size, t.heading_level1_font_size
            )));
        }
        if !(t.math_symbol_ratio > 0.0 && t.math_symbol_ratio <= 1.0) {
            return Err(PageMdError::InvalidConfig(format!(
                "math symbol ratio must be in (0, 1], got {}",
                t.math_symbol_ratio
            )));
        }
        if c.words_per_minute == 0 {
            return Err(PageMdError::InvalidConfig(
                "words per minute must be ≥ 1".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(PageMdError::InvalidConfig("concurrency must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to convert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page (1-indexed).
    Single(usize),
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 1-based
    /// page numbers that exist in a document of `total_pages` pages.
    pub fn to_page_numbers(&self, total_pages: usize) -> Vec<usize> {
        let mut pages: Vec<usize> = match self {
            PageSelection::All => (1..=total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![*p]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1);
                let e = (*end).min(total_pages);
                (s..=e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .copied()
                .filter(|&p| p >= 1 && p <= total_pages)
                .collect(),
        };
        pages.sort_unstable();
        pages.dedup();
        pages
    }

    /// Parse `all`, `5`, `3-15`, or `1,3,5`.
    pub fn parse(s: &str) -> Result<Self, PageMdError> {
        let s = s.trim().to_lowercase();
        let number = |p: &str| -> Result<usize, PageMdError> {
            let n: usize = p
                .trim()
                .parse()
                .map_err(|_| PageMdError::InvalidConfig(format!("invalid page number: '{}'", p.trim())))?;
            if n < 1 {
                return Err(PageMdError::InvalidConfig(
                    "pages are 1-indexed, minimum is 1".into(),
                ));
            }
            Ok(n)
        };

        if s == "all" {
            return Ok(PageSelection::All);
        }
        if let Some((start, end)) = s.split_once('-') {
            let (start, end) = (number(start)?, number(end)?);
            if start > end {
                return Err(PageMdError::InvalidConfig(format!(
                    "invalid page range '{start}-{end}': start must be <= end"
                )));
            }
            return Ok(PageSelection::Range(start, end));
        }
        if s.contains(',') {
            let pages = s.split(',').map(number).collect::<Result<Vec<_>, _>>()?;
            return Ok(PageSelection::Set(pages));
        }
        Ok(PageSelection::Single(number(&s)?))
    }
}

/// How to separate pages in an assembled multi-page document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// No separator; pages joined with "\n\n". (default)
    #[default]
    None,
    /// Horizontal rule: "\n\n---\n\n"
    HorizontalRule,
    /// HTML comment with page number: "<!-- page N -->"
    Comment,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator string for the given page number (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::None => "\n\n".to_string(),
            PageSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            PageSeparator::Comment => format!("\n\n<!-- page {} -->\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }

    /// Parse `none`, `hr`, `comment`, or any custom string.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "none" => PageSeparator::None,
            "hr" | "---" => PageSeparator::HorizontalRule,
            "comment" => PageSeparator::Comment,
            _ => PageSeparator::Custom(s.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let c = ExtractionConfig::default();
        assert_eq!(c.thresholds.heading_min_font_size, 14.0);
        assert_eq!(c.thresholds.heading_level2_font_size, 16.0);
        assert_eq!(c.thresholds.heading_level1_font_size, 18.0);
        assert_eq!(c.thresholds.math_symbol_ratio, 0.2);
        assert_eq!(c.words_per_minute, 200);
        assert_eq!(c.image_url_prefix, "/api/temp-image/");
        assert!(c.page_footer);
    }

    #[test]
    fn builder_rejects_inverted_heading_sizes() {
        let err = ExtractionConfig::builder()
            .heading_font_sizes(20.0, 16.0, 18.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, PageMdError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_reading_speed() {
        assert!(ExtractionConfig::builder().words_per_minute(0).build().is_err());
        assert!(ExtractionConfig::builder().concurrency(0).build().is_err());
        assert!(ExtractionConfig::builder().math_symbol_ratio(1.5).build().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let c = ExtractionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
    }

    #[test]
    fn page_selection_to_page_numbers() {
        assert_eq!(PageSelection::All.to_page_numbers(3), vec![1, 2, 3]);
        assert_eq!(PageSelection::Single(3).to_page_numbers(5), vec![3]);
        assert!(PageSelection::Single(6).to_page_numbers(5).is_empty());
        assert_eq!(PageSelection::Range(2, 9).to_page_numbers(4), vec![2, 3, 4]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3, 7]).to_page_numbers(5),
            vec![1, 3]
        );
    }

    #[test]
    fn page_selection_parse() {
        assert_eq!(PageSelection::parse("all").unwrap(), PageSelection::All);
        assert_eq!(PageSelection::parse(" 4 ").unwrap(), PageSelection::Single(4));
        assert_eq!(PageSelection::parse("2-5").unwrap(), PageSelection::Range(2, 5));
        assert_eq!(
            PageSelection::parse("1,3,5").unwrap(),
            PageSelection::Set(vec![1, 3, 5])
        );
        assert!(PageSelection::parse("0").is_err());
        assert!(PageSelection::parse("5-2").is_err());
        assert!(PageSelection::parse("x").is_err());
    }

    #[test]
    fn separator_render_and_parse() {
        assert_eq!(PageSeparator::parse("hr"), PageSeparator::HorizontalRule);
        assert_eq!(PageSeparator::Comment.render(4), "\n\n<!-- page 4 -->\n\n");
        assert_eq!(
            PageSeparator::parse("~~~").render(1),
            "\n\n~~~\n\n"
        );
    }
}
