//! Progress-callback trait for multi-page conversion.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to hear
//! about each page as [`crate::convert::convert_document`] or
//! [`crate::stream::convert_stream`] works through a document.
//!
//! Single-page entry points never fire these events.
//!
//! # Example
//!
//! ```rust
//! use pdfpage2md::{ConversionProgressCallback, ExtractionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct TableCounter {
//!     pages: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for TableCounter {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, markdown_len: usize) {
//!         self.pages.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}/{total_pages}: {markdown_len} bytes");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(TableCounter { pages: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the converter as it processes each page.
///
/// Implementations must be `Send + Sync`: the streaming converter runs
/// pages on blocking worker threads and may report from any of them. All
/// methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once, after page selection, before any page is processed.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is extracted (`page_num` is 1-based).
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page produced Markdown (possibly empty).
    fn on_page_complete(&self, page_num: usize, total_pages: usize, markdown_len: usize) {
        let _ = (page_num, total_pages, markdown_len);
    }

    /// Called when a page failed fatally.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every selected page has been attempted.
    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// No-op callback.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
