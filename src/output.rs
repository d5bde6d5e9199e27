//! Result types returned by the public entry points.

use crate::error::PageWarning;
use crate::model::BBox;
use serde::{Deserialize, Serialize};

/// The Markdown for one page plus the metadata the reader UI shows with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMarkdown {
    /// 1-based page number.
    pub page: usize,
    /// Page body; empty when the page carries no content.
    pub markdown: String,
    pub has_tables: bool,
    pub has_images: bool,
    /// `word_count(markdown) / words_per_minute`, integer division.
    pub estimated_reading_time_minutes: usize,
    /// Elements that were dropped without failing the page.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PageWarning>,
}

impl PageMarkdown {
    pub fn word_count(&self) -> usize {
        self.markdown.split_whitespace().count()
    }
}

/// Document-level information, available without processing any page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
    /// The document needed a password to open.
    #[serde(default)]
    pub encrypted: bool,
}

/// A whole page rasterised to PNG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    /// 1-based page number.
    pub page: usize,
    /// Bare file name, servable through the temp-image route.
    pub filename: String,
    /// Where the PNG was written.
    pub location: String,
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
}

/// Counters for a multi-page conversion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_pages: usize,
    pub processed_pages: usize,
    pub failed_pages: usize,
    pub skipped_pages: usize,
    pub pages_with_tables: usize,
    pub pages_with_images: usize,
    pub warnings: usize,
    pub word_count: usize,
    pub estimated_reading_time_minutes: usize,
    pub total_duration_ms: u64,
}

/// Result of [`crate::convert::convert_document`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentOutput {
    /// Page bodies joined with the configured separator.
    pub markdown: String,
    /// Successful pages in page order.
    pub pages: Vec<PageMarkdown>,
    pub metadata: DocumentMetadata,
    pub stats: ConversionStats,
}

/// One text-search match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// 1-based page number.
    pub page: usize,
    /// Text of the block the match sits in.
    pub text: String,
    pub bbox: BBox,
}
