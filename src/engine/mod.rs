//! The PDF engine port.
//!
//! Container access (open, page count, raw text/table/image extraction,
//! rasterisation) is delegated to an engine. The page pipeline only ever
//! talks to these two traits, which keeps it testable against an in-memory
//! fake and lets the pdfium adapter stay in one file.
//!
//! ```text
//! PdfEngine::open ──▶ PageSource ──▶ pipeline::page ──▶ PageMarkdown
//!  (pdfium)           (read-only)      (pure transform)
//! ```
//!
//! A [`PageSource`] is read-only: nothing in the pipeline mutates the
//! document, so the same source can serve any number of page requests.

pub mod pdfium;

use crate::config::TableDetectionConfig;
use crate::error::PageMdError;
use crate::model::{DetectedImage, DetectedTable, ImageHandle, PageRect, TextBlock};
use crate::output::DocumentMetadata;
use image::DynamicImage;
use std::path::Path;

pub use self::pdfium::PdfiumEngine;

/// Opens documents.
///
/// Shared across threads by the async entry points, hence `Send + Sync`.
pub trait PdfEngine: Send + Sync {
    /// Open a document. Unreadable or corrupt files fail here, before any
    /// page work begins.
    fn open<'a>(
        &'a self,
        path: &Path,
        password: Option<&'a str>,
    ) -> Result<Box<dyn PageSource + 'a>, PageMdError>;
}

/// Read-only access to one open document. Page indices are 0-based.
pub trait PageSource {
    fn page_count(&self) -> usize;

    fn metadata(&self) -> DocumentMetadata;

    fn page_rect(&self, index: usize) -> Result<PageRect, PageMdError>;

    /// Structured text: blocks → lines → spans, top-down coordinates.
    fn text_blocks(&self, index: usize) -> Result<Vec<TextBlock>, PageMdError>;

    /// Tables on the page. Callers treat an `Err` as "no tables".
    fn detect_tables(
        &self,
        index: usize,
        config: &TableDetectionConfig,
    ) -> Result<Vec<DetectedTable>, PageMdError>;

    /// Images placed on the page, without their pixels.
    fn images(&self, index: usize) -> Result<Vec<DetectedImage>, PageMdError>;

    /// Decode the pixels behind `handle`.
    fn load_image(&self, index: usize, handle: ImageHandle) -> Result<DynamicImage, PageMdError>;

    /// Rasterise the page to `width_px` pixels wide.
    fn render_raster(&self, index: usize, width_px: u32) -> Result<DynamicImage, PageMdError>;
}

/// Validate a 1-based page number against `total` and return the 0-based index.
///
/// This is the only check that short-circuits a page request.
pub fn page_index(page: usize, total: usize) -> Result<usize, PageMdError> {
    if page < 1 || page > total {
        return Err(PageMdError::PageOutOfRange { page, total });
    }
    Ok(page - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_index_accepts_full_range() {
        for p in 1..=5 {
            assert_eq!(page_index(p, 5).unwrap(), p - 1);
        }
    }

    #[test]
    fn page_index_rejects_outside() {
        assert!(matches!(
            page_index(0, 5),
            Err(PageMdError::PageOutOfRange { page: 0, total: 5 })
        ));
        assert!(page_index(6, 5).is_err());
        assert!(page_index(1, 0).is_err());
    }
}
