//! Error types for the pdfpage2md library.
//!
//! Two distinct types reflect two distinct failure modes:
//!
//! * [`PageMdError`]: **Fatal**: the request cannot proceed at all (bad
//!   input file, wrong password, page number outside the document). Returned
//!   as `Err(PageMdError)` from the public entry points.
//!
//! * [`PageWarning`]: **Non-fatal**: one element of a page could not be
//!   extracted (table detection blew up, one image failed to decode) but the
//!   rest of the page is fine. Stored on [`crate::output::PageMarkdown`] so
//!   callers can see what was dropped without losing the page.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdfpage2md library.
///
/// Element-level failures use [`PageWarning`] and never surface here.
#[derive(Debug, Error)]
pub enum PageMdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}' (first bytes: {magic:?})")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Requested page number is outside `1..=total`.
    #[error("Page {page} out of range (valid range: 1-{total})")]
    PageOutOfRange { page: usize, total: usize },

    /// The engine could not read or rasterise a page.
    #[error("Rendering failed for page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    // ── Image store errors ────────────────────────────────────────────────
    /// Writing an extracted image to storage failed.
    #[error("Failed to store image '{name}': {detail}")]
    ImageStoreFailed { name: String, detail: String },

    /// A temp-image filename was rejected (traversal, absolute path, empty).
    #[error("Invalid image path: '{name}'")]
    InvalidImagePath { name: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed, or a request argument was unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PageMdError {
    /// Short machine-readable tag, handy for JSON error bodies and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PageMdError::FileNotFound { .. } => "file_not_found",
            PageMdError::PermissionDenied { .. } => "permission_denied",
            PageMdError::NotAPdf { .. } => "not_a_pdf",
            PageMdError::CorruptPdf { .. } => "corrupt_pdf",
            PageMdError::PasswordRequired { .. } => "password_required",
            PageMdError::WrongPassword { .. } => "wrong_password",
            PageMdError::PageOutOfRange { .. } => "page_out_of_range",
            PageMdError::RenderFailed { .. } => "render_failed",
            PageMdError::ImageStoreFailed { .. } => "image_store_failed",
            PageMdError::InvalidImagePath { .. } => "invalid_image_path",
            PageMdError::OutputWriteFailed { .. } => "output_write_failed",
            PageMdError::InvalidConfig(_) => "invalid_config",
            PageMdError::PdfiumBindingFailed(_) => "pdfium_binding_failed",
            PageMdError::Internal(_) => "internal",
        }
    }
}

/// A non-fatal problem with one element of a page.
///
/// The page is still produced; the element named here is simply absent
/// from its Markdown.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageWarning {
    /// Table detection failed; the page was assembled with zero tables.
    #[error("Page {page}: table detection failed: {detail}")]
    TableDetectionFailed { page: usize, detail: String },

    /// The page's image list could not be read; zero images emitted.
    #[error("Page {page}: image listing failed: {detail}")]
    ImageListFailed { page: usize, detail: String },

    /// One image could not be loaded or stored; the others are unaffected.
    #[error("Page {page}: image {image} skipped: {detail}")]
    ImageFailed {
        page: usize,
        image: usize,
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_mentions_valid_range() {
        let e = PageMdError::PageOutOfRange { page: 9, total: 4 };
        let msg = e.to_string();
        assert!(msg.contains("Page 9"), "got: {msg}");
        assert!(msg.contains("1-4"), "got: {msg}");
        assert_eq!(e.kind(), "page_out_of_range");
    }

    #[test]
    fn image_warning_display() {
        let w = PageWarning::ImageFailed {
            page: 3,
            image: 2,
            detail: "decode error".into(),
        };
        let msg = w.to_string();
        assert!(msg.contains("Page 3"));
        assert!(msg.contains("image 2"));
        assert!(msg.contains("decode error"));
    }

    #[test]
    fn warning_serialises() {
        let w = PageWarning::TableDetectionFailed {
            page: 1,
            detail: "boom".into(),
        };
        let json = serde_json::to_string(&w).expect("serialise");
        assert!(json.contains("TableDetectionFailed"));
    }

    #[test]
    fn invalid_image_path_display() {
        let e = PageMdError::InvalidImagePath {
            name: "../etc/passwd".into(),
        };
        assert!(e.to_string().contains("../etc/passwd"));
    }
}
