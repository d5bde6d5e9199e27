//! Streaming conversion API: emit pages as they complete.
//!
//! Unlike [`crate::convert::convert_document`], which returns only after all
//! selected pages finish, [`convert_stream`] yields one
//! `Result<PageMarkdown, PageMdError>` per page as soon as it is ready.
//! Up to `config.concurrency` pages are in flight at once, each on tokio's
//! blocking pool with its own document handle, so pages may arrive out of
//! order (sort by `page` if order matters).
//!
//! A failing page is an `Err` item in the stream; it never ends the stream.

use crate::config::ExtractionConfig;
use crate::convert::{extract_page_markdown_with, first_requested_page};
use crate::engine::{PdfEngine, PdfiumEngine};
use crate::error::PageMdError;
use crate::output::PageMarkdown;
use crate::pipeline::images::{ImageStore, TempDirImageStore};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::{info, warn};

/// A boxed stream of page results.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<PageMarkdown, PageMdError>> + Send>>;

/// Convert the pages selected by `config.pages`, streaming them as they are
/// ready.
///
/// # Returns
/// - `Ok(PageStream)` once the document opened and the selection is non-empty
/// - `Err(PageMdError)` for fatal errors (file not found, not a PDF, empty
///   selection, …)
///
/// # Example
/// ```rust,no_run
/// use futures::StreamExt;
/// use pdfpage2md::{convert_stream, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut pages = convert_stream("report.pdf", &ExtractionConfig::default()).await?;
/// while let Some(page) = pages.next().await {
///     match page {
///         Ok(p) => println!("page {}: {} chars", p.page, p.markdown.len()),
///         Err(e) => eprintln!("error: {e}"),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub async fn convert_stream(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<PageStream, PageMdError> {
    let engine = tokio::task::spawn_blocking(PdfiumEngine::shared)
        .await
        .map_err(|e| PageMdError::Internal(format!("Bind task panicked: {}", e)))??;
    let store = Arc::new(TempDirImageStore::new(&config.image_dir));
    convert_stream_with(Arc::new(StaticEngine(engine)), store, path, config).await
}

/// [`convert_stream`] against an explicit engine and image store.
pub async fn convert_stream_with(
    engine: Arc<dyn PdfEngine>,
    store: Arc<dyn ImageStore>,
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<PageStream, PageMdError> {
    let path = path.as_ref().to_path_buf();
    info!("Starting streaming conversion: {}", path.display());

    // ── Page count ───────────────────────────────────────────────────────
    let total_pages = {
        let engine = Arc::clone(&engine);
        let path = path.clone();
        let password = config.password.clone();
        tokio::task::spawn_blocking(move || {
            engine
                .open(&path, password.as_deref())
                .map(|doc| doc.page_count())
        })
        .await
        .map_err(|e| PageMdError::Internal(format!("Open task panicked: {}", e)))??
    };

    // ── Selection ────────────────────────────────────────────────────────
    let selected = config.pages.to_page_numbers(total_pages);
    let Some(&first) = selected.first() else {
        return Err(PageMdError::PageOutOfRange {
            page: first_requested_page(&config.pages),
            total: total_pages,
        });
    };
    let selected_count = selected.len();
    if let Some(cb) = &config.progress_callback {
        cb.on_conversion_start(selected_count);
    }
    info!(
        "Streaming {} page(s) starting at page {}, concurrency {}",
        selected_count, first, config.concurrency
    );

    // ── Build the stream ─────────────────────────────────────────────────
    let config = config.clone();
    let concurrency = config.concurrency.max(1);
    let done_cb = config.progress_callback.clone();
    let successes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&successes);

    let pages = stream::iter(selected.into_iter().map(move |page_num| {
        let engine = Arc::clone(&engine);
        let store = Arc::clone(&store);
        let path = path.clone();
        let cfg = config.clone();
        async move { run_page(engine, store, path, page_num, selected_count, cfg).await }
    }))
    .buffer_unordered(concurrency)
    .inspect(move |r| {
        if r.is_ok() {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    // Fires on_conversion_complete once the last page has been yielded.
    let finish = stream::once(async move {
        if let Some(cb) = done_cb {
            cb.on_conversion_complete(selected_count, successes.load(Ordering::SeqCst));
        }
    })
    .filter_map(|()| async { None::<Result<PageMarkdown, PageMdError>> });

    let s = pages.chain(finish);

    Ok(Box::pin(s))
}

async fn run_page(
    engine: Arc<dyn PdfEngine>,
    store: Arc<dyn ImageStore>,
    path: PathBuf,
    page_num: usize,
    total: usize,
    config: ExtractionConfig,
) -> Result<PageMarkdown, PageMdError> {
    if let Some(cb) = &config.progress_callback {
        cb.on_page_start(page_num, total);
    }
    let cfg = config.clone();
    let result = tokio::task::spawn_blocking(move || {
        extract_page_markdown_with(engine.as_ref(), store.as_ref(), &path, page_num, &cfg)
    })
    .await
    .map_err(|e| PageMdError::Internal(format!("Page task panicked: {}", e)))
    .and_then(|r| r);

    if let Err(e) = &result {
        warn!("Page {} failed: {}", page_num, e);
    }
    if let Some(cb) = &config.progress_callback {
        match &result {
            Ok(p) => cb.on_page_complete(page_num, total, p.markdown.len()),
            Err(e) => cb.on_page_error(page_num, total, &e.to_string()),
        }
    }
    result
}

/// Lets the process-wide engine travel in an `Arc<dyn PdfEngine>`.
struct StaticEngine(&'static PdfiumEngine);

impl PdfEngine for StaticEngine {
    fn open<'a>(
        &'a self,
        path: &Path,
        password: Option<&'a str>,
    ) -> Result<Box<dyn crate::engine::PageSource + 'a>, PageMdError> {
        self.0.open(path, password)
    }
}
