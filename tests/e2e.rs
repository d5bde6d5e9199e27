//! End-to-end tests against a real pdfium library and a real PDF.
//!
//! Gated so they do not run in CI unless explicitly requested:
//!
//! ```text
//! PDFIUM_LIB_PATH=/opt/pdfium/lib PDFPAGE_SAMPLE_PDF=paper.pdf \
//!     cargo test --test e2e -- --nocapture
//! ```
//!
//! The sample should have a text layer on page 1.

use pdfpage2md::{
    convert_document_async, extract_page_markdown_async, extract_page_text, inspect,
    render_page_png, render_page_vector, search_text, ExtractionConfig, PageMdError, PageSelection,
};
use std::path::PathBuf;

/// Skip unless pdfium and a sample PDF are configured.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var_os("PDFIUM_LIB_PATH").is_none() {
            println!("SKIP: set PDFIUM_LIB_PATH to run e2e tests");
            return;
        }
        let Some(p) = std::env::var_os("PDFPAGE_SAMPLE_PDF").map(PathBuf::from) else {
            println!("SKIP: set PDFPAGE_SAMPLE_PDF to a PDF with a text layer");
            return;
        };
        if !p.exists() {
            println!("SKIP: sample not found: {}", p.display());
            return;
        }
        p
    }};
}

fn config_in(dir: &tempfile::TempDir) -> ExtractionConfig {
    ExtractionConfig::builder()
        .image_dir(dir.path())
        .build()
        .expect("valid config")
}

/// Assert the Markdown is clean enough to hand to a renderer.
fn assert_markdown_quality(md: &str, context: &str) {
    assert!(!md.trim().is_empty(), "[{context}] Markdown is empty");

    let invisible = ['\u{200B}', '\u{FEFF}', '\u{200C}', '\u{200D}', '\u{2060}'];
    for ch in invisible {
        assert!(
            !md.contains(ch),
            "[{context}] Output contains invisible char U+{:04X}",
            ch as u32
        );
    }

    for line in md.lines().filter(|l| l.starts_with('|')) {
        assert!(line.ends_with('|'), "[{context}] Broken table row: {line:?}");
    }

    println!("[{context}] ✓  {} bytes", md.len());
}

#[test]
fn test_inspect_sample() {
    let path = e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();

    let meta = inspect(&path, &config_in(&dir)).expect("inspect() should succeed");
    assert!(meta.page_count >= 1);
    assert!(!meta.pdf_version.is_empty());
    println!("Metadata: {:?}", meta);
}

#[test]
fn test_missing_file_is_reported() {
    let _ = e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();

    let err = inspect("/definitely/not/a/real/file.pdf", &config_in(&dir)).unwrap_err();
    assert!(matches!(err, PageMdError::FileNotFound { .. }));
}

#[tokio::test]
async fn test_page_one_markdown() {
    let path = e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);

    let page = extract_page_markdown_async(&path, 1, &config)
        .await
        .expect("page 1 should convert");

    assert_eq!(page.page, 1);
    assert_markdown_quality(&page.markdown, "page 1");
    assert!(page.markdown.ends_with("*Page 1*\n"));

    if page.has_images {
        let stored = std::fs::read_dir(dir.path()).unwrap().count();
        assert!(stored >= 1, "images referenced but none stored");
    }
}

#[test]
fn test_out_of_range_page() {
    let path = e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);

    let total = inspect(&path, &config).unwrap().page_count;
    let err = extract_page_text(&path, total + 1, &config).unwrap_err();
    assert!(err.to_string().contains(&format!("1-{total}")), "{err}");
}

#[test]
fn test_vector_render() {
    let path = e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let config = ExtractionConfig::builder()
        .image_dir(dir.path())
        .render_width(400)
        .build()
        .unwrap();

    let svg = render_page_vector(&path, 1, &config).expect("SVG render");
    assert!(svg.contains("<svg"));
    assert!(svg.contains("data:image/png;base64,"));
}

#[test]
fn test_png_render() {
    let path = e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);

    let image = render_page_png(&path, 1, 72, &config).expect("PNG render");
    assert!(image.filename.starts_with("pdf_page_1_"));
    let bytes = std::fs::read(&image.location).unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!(decoded.width(), image.width);
}

#[test]
fn test_text_and_search_agree() {
    let path = e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);

    let text = extract_page_text(&path, 1, &config).unwrap();
    let Some(word) = text.split_whitespace().find(|w| w.chars().all(char::is_alphabetic) && w.len() > 3) else {
        println!("SKIP: page 1 has no plain word to search for");
        return;
    };

    let hits = search_text(&path, &word.to_uppercase(), 5, &config).unwrap();
    assert!(!hits.is_empty(), "expected a hit for {word:?}");
    assert!(hits.len() <= 5);
    assert_eq!(hits[0].page, 1);
}

#[tokio::test]
async fn test_document_conversion() {
    let path = e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let config = ExtractionConfig::builder()
        .image_dir(dir.path())
        .pages(PageSelection::Range(1, 3))
        .build()
        .unwrap();

    let out = convert_document_async(&path, &config).await.expect("conversion");
    assert_eq!(out.stats.failed_pages, 0);
    assert_eq!(
        out.stats.processed_pages + out.stats.skipped_pages,
        out.stats.total_pages
    );
    assert_markdown_quality(&out.markdown, "document");
}
