//! # pdfpage2md
//!
//! Rebuild a single PDF page as reading-ordered Markdown.
//!
//! ## Why this crate?
//!
//! Plain text extraction flattens a page: headings lose their weight, tables
//! turn into runs of words, formulas become symbol soup and figures vanish.
//! This crate works from the page's positioned text, tables and images,
//! classifies each text block, renders tables as pipe tables and images as
//! links to stored PNGs, then stitches everything back together top to
//! bottom.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF page
//!  │
//!  ├─ 1. Engine    open via pdfium, read spans / tables / images
//!  ├─ 2. Tables    pipe tables; text inside table regions is dropped
//!  ├─ 3. Images    PNG to the image store; CMYK skipped
//!  ├─ 4. Classify  formula → heading → list → paragraph
//!  ├─ 5. Layout    sort by top edge, render fragments, page footer
//!  └─ 6. Output    Markdown + has_tables / has_images / reading time
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfpage2md::{extract_page_markdown, ExtractionConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::default();
//!     let page = extract_page_markdown("paper.pdf", 3, &config)?;
//!     println!("{}", page.markdown);
//!     eprintln!(
//!         "tables: {}, images: {}, ~{} min",
//!         page.has_tables, page.has_images, page.estimated_reading_time_minutes
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfpage` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdfpage2md = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! The engine binds to a pdfium shared library at first use. Point
//! `PDFIUM_LIB_PATH` at the library (or its directory), or install it where
//! the system loader finds it.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod input;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ClassifierThresholds, ExtractionConfig, ExtractionConfigBuilder, PageSelection, PageSeparator,
    TableDetectionConfig,
};
pub use convert::{
    convert_document, convert_document_async, convert_document_from_bytes,
    convert_document_to_file, convert_document_with, extract_page_markdown,
    extract_page_markdown_async, extract_page_markdown_with, extract_page_text,
    extract_page_text_with, inspect, inspect_with, render_page_png, render_page_png_async,
    render_page_png_with, render_page_vector, render_page_vector_async, render_page_vector_with,
    search_text, search_text_with, DEFAULT_PNG_DPI, MAX_PNG_DPI,
};
pub use engine::{PageSource, PdfEngine, PdfiumEngine};
pub use error::{PageMdError, PageWarning};
pub use model::{BBox, ClassifiedSegment, SegmentKind};
pub use output::{
    ConversionStats, DocumentMetadata, DocumentOutput, PageImage, PageMarkdown, SearchHit,
};
pub use pipeline::images::{ImageStore, MemoryImageStore, StoredImage, TempDirImageStore};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{convert_stream, convert_stream_with, PageStream};
