//! Public entry points.
//!
//! Every operation comes in two flavours:
//!
//! * a plain function (`extract_page_markdown`, `render_page_vector`, …) that
//!   uses the process-wide [`PdfiumEngine`] and, where images are written, a
//!   [`TempDirImageStore`] rooted at `config.image_dir`;
//! * a `*_with` variant that takes the engine (and store) explicitly, for
//!   embedders and tests.
//!
//! Each call opens the document, does its work, and drops the handle before
//! returning. The core is synchronous; the `*_async` wrappers move it onto
//! tokio's blocking pool because pdfium calls block.

use crate::config::{ExtractionConfig, PageSelection};
use crate::engine::{page_index, PageSource, PdfEngine, PdfiumEngine};
use crate::error::PageMdError;
use crate::output::{
    ConversionStats, DocumentMetadata, DocumentOutput, PageImage, PageMarkdown, SearchHit,
};
use crate::pipeline::images::{ImageStore, TempDirImageStore};
use crate::pipeline::layout::reading_time_minutes;
use crate::pipeline::{page, search, vector};
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Resolution used when a PNG render does not ask for one.
pub const DEFAULT_PNG_DPI: u32 = 144;

/// Highest accepted PNG render resolution.
pub const MAX_PNG_DPI: u32 = 1200;

fn open_document<'e>(
    engine: &'e dyn PdfEngine,
    path: &Path,
    config: &'e ExtractionConfig,
) -> Result<Box<dyn PageSource + 'e>, PageMdError> {
    engine.open(path, config.password.as_deref())
}

// ── Single page ──────────────────────────────────────────────────────────────

/// Rebuild one page (1-based) as Markdown.
///
/// # Errors
/// Fails for unreadable documents and with [`PageMdError::PageOutOfRange`]
/// (carrying the valid range) before any page work starts. Table and image
/// problems never fail the call; they show up in `PageMarkdown::warnings`.
///
/// # Example
/// ```rust,no_run
/// use pdfpage2md::{extract_page_markdown, ExtractionConfig};
///
/// let page = extract_page_markdown("paper.pdf", 1, &ExtractionConfig::default())?;
/// println!("{}", page.markdown);
/// eprintln!("~{} min read", page.estimated_reading_time_minutes);
/// # Ok::<(), pdfpage2md::PageMdError>(())
/// ```
pub fn extract_page_markdown(
    path: impl AsRef<Path>,
    page: usize,
    config: &ExtractionConfig,
) -> Result<PageMarkdown, PageMdError> {
    let engine = PdfiumEngine::shared()?;
    let store = TempDirImageStore::new(&config.image_dir);
    extract_page_markdown_with(engine, &store, path.as_ref(), page, config)
}

/// [`extract_page_markdown`] against an explicit engine and image store.
pub fn extract_page_markdown_with(
    engine: &dyn PdfEngine,
    store: &dyn ImageStore,
    path: &Path,
    page: usize,
    config: &ExtractionConfig,
) -> Result<PageMarkdown, PageMdError> {
    let doc = open_document(engine, path, config)?;
    page::process_page(doc.as_ref(), page, config, store)
}

/// Render one page (1-based) as an SVG document.
pub fn render_page_vector(
    path: impl AsRef<Path>,
    page: usize,
    config: &ExtractionConfig,
) -> Result<String, PageMdError> {
    render_page_vector_with(PdfiumEngine::shared()?, path.as_ref(), page, config)
}

/// [`render_page_vector`] against an explicit engine.
pub fn render_page_vector_with(
    engine: &dyn PdfEngine,
    path: &Path,
    page: usize,
    config: &ExtractionConfig,
) -> Result<String, PageMdError> {
    let doc = open_document(engine, path, config)?;
    let index = page_index(page, doc.page_count())?;
    vector::render_svg(doc.as_ref(), index, config.render_width)
}

/// Rasterise one page (1-based) at `dpi` and store it as
/// `pdf_page_{page}_{random}.png` in `config.image_dir`.
///
/// # Errors
/// [`PageMdError::InvalidConfig`] for a `dpi` outside `1..=MAX_PNG_DPI`, and
/// [`PageMdError::PageOutOfRange`] before anything is rendered.
pub fn render_page_png(
    path: impl AsRef<Path>,
    page: usize,
    dpi: u32,
    config: &ExtractionConfig,
) -> Result<PageImage, PageMdError> {
    let engine = PdfiumEngine::shared()?;
    let store = TempDirImageStore::new(&config.image_dir);
    render_page_png_with(engine, &store, path.as_ref(), page, dpi, config)
}

/// [`render_page_png`] against an explicit engine and image store.
pub fn render_page_png_with(
    engine: &dyn PdfEngine,
    store: &dyn ImageStore,
    path: &Path,
    page: usize,
    dpi: u32,
    config: &ExtractionConfig,
) -> Result<PageImage, PageMdError> {
    if dpi == 0 || dpi > MAX_PNG_DPI {
        return Err(PageMdError::InvalidConfig(format!(
            "dpi must be in 1..={MAX_PNG_DPI}, got {dpi}"
        )));
    }
    let doc = open_document(engine, path, config)?;
    let index = page_index(page, doc.page_count())?;
    let image = vector::render_png(doc.as_ref(), index, dpi, store)?;
    info!("Page {} rendered to {}", page, image.location);
    Ok(image)
}

/// Plain text of one page (1-based), blocks separated by blank lines.
pub fn extract_page_text(
    path: impl AsRef<Path>,
    page: usize,
    config: &ExtractionConfig,
) -> Result<String, PageMdError> {
    extract_page_text_with(PdfiumEngine::shared()?, path.as_ref(), page, config)
}

/// [`extract_page_text`] against an explicit engine.
pub fn extract_page_text_with(
    engine: &dyn PdfEngine,
    path: &Path,
    page: usize,
    config: &ExtractionConfig,
) -> Result<String, PageMdError> {
    let doc = open_document(engine, path, config)?;
    let index = page_index(page, doc.page_count())?;
    search::page_text(doc.as_ref(), index)
}

// ── Document level ───────────────────────────────────────────────────────────

/// Document metadata without processing any page.
pub fn inspect(path: impl AsRef<Path>, config: &ExtractionConfig) -> Result<DocumentMetadata, PageMdError> {
    inspect_with(PdfiumEngine::shared()?, path.as_ref(), config)
}

/// [`inspect`] against an explicit engine.
pub fn inspect_with(
    engine: &dyn PdfEngine,
    path: &Path,
    config: &ExtractionConfig,
) -> Result<DocumentMetadata, PageMdError> {
    Ok(open_document(engine, path, config)?.metadata())
}

/// Case-insensitive text search over every page; at most `max_hits` results.
pub fn search_text(
    path: impl AsRef<Path>,
    query: &str,
    max_hits: usize,
    config: &ExtractionConfig,
) -> Result<Vec<SearchHit>, PageMdError> {
    search_text_with(PdfiumEngine::shared()?, path.as_ref(), query, max_hits, config)
}

/// [`search_text`] against an explicit engine.
pub fn search_text_with(
    engine: &dyn PdfEngine,
    path: &Path,
    query: &str,
    max_hits: usize,
    config: &ExtractionConfig,
) -> Result<Vec<SearchHit>, PageMdError> {
    if query.trim().is_empty() {
        return Err(PageMdError::InvalidConfig("search query is empty".into()));
    }
    let doc = open_document(engine, path, config)?;
    search::search(doc.as_ref(), query, max_hits)
}

/// Convert the pages selected by `config.pages` and join them into one
/// Markdown document.
///
/// Pages are processed in order. A failing page is reported through the
/// progress callback and counted in `stats.failed_pages`; the call only
/// fails when no page succeeds or the selection is empty.
pub fn convert_document(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<DocumentOutput, PageMdError> {
    let engine = PdfiumEngine::shared()?;
    let store = TempDirImageStore::new(&config.image_dir);
    convert_document_with(engine, &store, path.as_ref(), config)
}

/// [`convert_document`] against an explicit engine and image store.
pub fn convert_document_with(
    engine: &dyn PdfEngine,
    store: &dyn ImageStore,
    path: &Path,
    config: &ExtractionConfig,
) -> Result<DocumentOutput, PageMdError> {
    let total_start = Instant::now();
    info!("Starting conversion: {}", path.display());

    let doc = open_document(engine, path, config)?;
    let metadata = doc.metadata();
    let total_pages = doc.page_count();

    let selected = config.pages.to_page_numbers(total_pages);
    if selected.is_empty() {
        return Err(PageMdError::PageOutOfRange {
            page: first_requested_page(&config.pages),
            total: total_pages,
        });
    }
    debug!("Selected {} of {} pages", selected.len(), total_pages);

    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_conversion_start(selected.len());
    }

    let mut pages = Vec::with_capacity(selected.len());
    let mut first_error = None;
    for &page_num in &selected {
        if let Some(cb) = cb {
            cb.on_page_start(page_num, selected.len());
        }
        match page::process_page(doc.as_ref(), page_num, config, store) {
            Ok(p) => {
                if let Some(cb) = cb {
                    cb.on_page_complete(page_num, selected.len(), p.markdown.len());
                }
                pages.push(p);
            }
            Err(e) => {
                warn!("Page {} failed: {}", page_num, e);
                if let Some(cb) = cb {
                    cb.on_page_error(page_num, selected.len(), &e.to_string());
                }
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(cb) = cb {
        cb.on_conversion_complete(selected.len(), pages.len());
    }
    if pages.is_empty() {
        return Err(first_error
            .unwrap_or_else(|| PageMdError::Internal("no page was processed".into())));
    }

    let markdown = assemble_document(&pages, config);
    let word_count: usize = pages.iter().map(PageMarkdown::word_count).sum();
    let stats = ConversionStats {
        total_pages,
        processed_pages: pages.len(),
        failed_pages: selected.len() - pages.len(),
        skipped_pages: total_pages - selected.len(),
        pages_with_tables: pages.iter().filter(|p| p.has_tables).count(),
        pages_with_images: pages.iter().filter(|p| p.has_images).count(),
        warnings: pages.iter().map(|p| p.warnings.len()).sum(),
        word_count,
        estimated_reading_time_minutes: reading_time_minutes(&markdown, config.words_per_minute),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {}/{} pages, {}ms total",
        stats.processed_pages, selected.len(), stats.total_duration_ms
    );

    Ok(DocumentOutput {
        markdown,
        pages,
        metadata,
        stats,
    })
}

/// Convert a PDF and write the Markdown to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub fn convert_document_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ConversionStats, PageMdError> {
    let output = convert_document(path, config)?;
    write_atomic(output_path.as_ref(), &output.markdown)?;
    Ok(output.stats)
}

/// Convert PDF bytes held in memory.
///
/// The bytes go to a managed [`tempfile`] that is removed on return.
pub fn convert_document_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<DocumentOutput, PageMdError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| PageMdError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| PageMdError::Internal(format!("tempfile write: {e}")))?;
    convert_document(tmp.path(), config)
}

pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<(), PageMdError> {
    let write_err = |source: std::io::Error| PageMdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let tmp_path = path.with_extension("md.tmp");
    std::fs::write(&tmp_path, contents).map_err(write_err)?;
    std::fs::rename(&tmp_path, path).map_err(write_err)
}

/// Join successful, non-empty page bodies with the configured separator.
fn assemble_document(pages: &[PageMarkdown], config: &ExtractionConfig) -> String {
    let mut out = String::new();
    for (i, page) in pages.iter().filter(|p| !p.markdown.trim().is_empty()).enumerate() {
        if i > 0 {
            out.push_str(&config.page_separator.render(page.page));
        }
        out.push_str(&page.markdown);
    }
    out
}

pub(crate) fn first_requested_page(selection: &PageSelection) -> usize {
    match selection {
        PageSelection::All => 1,
        PageSelection::Single(p) => *p,
        PageSelection::Range(start, _) => *start,
        PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(1),
    }
}

// ── Async wrappers ───────────────────────────────────────────────────────────

/// [`extract_page_markdown`] on tokio's blocking pool.
pub async fn extract_page_markdown_async(
    path: impl AsRef<Path>,
    page: usize,
    config: &ExtractionConfig,
) -> Result<PageMarkdown, PageMdError> {
    let path = path.as_ref().to_path_buf();
    let config = config.clone();
    tokio::task::spawn_blocking(move || extract_page_markdown(&path, page, &config))
        .await
        .map_err(|e| PageMdError::Internal(format!("Page task panicked: {}", e)))?
}

/// [`render_page_vector`] on tokio's blocking pool.
pub async fn render_page_vector_async(
    path: impl AsRef<Path>,
    page: usize,
    config: &ExtractionConfig,
) -> Result<String, PageMdError> {
    let path = path.as_ref().to_path_buf();
    let config = config.clone();
    tokio::task::spawn_blocking(move || render_page_vector(&path, page, &config))
        .await
        .map_err(|e| PageMdError::Internal(format!("Render task panicked: {}", e)))?
}

/// [`render_page_png`] on tokio's blocking pool.
pub async fn render_page_png_async(
    path: impl AsRef<Path>,
    page: usize,
    dpi: u32,
    config: &ExtractionConfig,
) -> Result<PageImage, PageMdError> {
    let path = path.as_ref().to_path_buf();
    let config = config.clone();
    tokio::task::spawn_blocking(move || render_page_png(&path, page, dpi, &config))
        .await
        .map_err(|e| PageMdError::Internal(format!("Render task panicked: {}", e)))?
}

/// [`convert_document`] on tokio's blocking pool.
pub async fn convert_document_async(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<DocumentOutput, PageMdError> {
    let path = path.as_ref().to_path_buf();
    let config = config.clone();
    tokio::task::spawn_blocking(move || convert_document(&path, &config))
        .await
        .map_err(|e| PageMdError::Internal(format!("Conversion task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageSeparator;

    fn page(n: usize, md: &str) -> PageMarkdown {
        PageMarkdown {
            page: n,
            markdown: md.into(),
            has_tables: false,
            has_images: false,
            estimated_reading_time_minutes: 0,
            warnings: vec![],
        }
    }

    #[test]
    fn document_skips_empty_pages_between_separators() {
        let config = ExtractionConfig::builder()
            .page_separator(PageSeparator::Comment)
            .build()
            .unwrap();
        let pages = vec![page(1, "one"), page(2, ""), page(3, "three")];
        assert_eq!(
            assemble_document(&pages, &config),
            "one\n\n<!-- page 3 -->\n\nthree"
        );
    }

    #[test]
    fn first_requested_page_for_errors() {
        assert_eq!(first_requested_page(&PageSelection::Single(9)), 9);
        assert_eq!(first_requested_page(&PageSelection::Range(4, 8)), 4);
        assert_eq!(first_requested_page(&PageSelection::Set(vec![7, 5])), 5);
        assert_eq!(first_requested_page(&PageSelection::All), 1);
    }

    #[test]
    fn atomic_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out.md");
        write_atomic(&out, "# hi\n").unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "# hi\n");
        assert!(!dir.path().join("nested/out.md.tmp").exists());
    }
}
