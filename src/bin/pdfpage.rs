//! CLI binary for pdfpage2md.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use pdfpage2md::{
    convert_document_async, convert_document_to_file, extract_page_markdown_async,
    extract_page_text, inspect, render_page_png_async, render_page_vector_async, search_text,
    ConversionProgressCallback, ExtractionConfig, PageSelection, PageSeparator, ProgressCallback,
    DEFAULT_PNG_DPI,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` reports the selected page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(&page_num)
            .map(|t| t.elapsed().as_millis() as f64 / 1000.0)
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert(page_num, Instant::now());
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, markdown_len: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{markdown_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages extracted",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages extracted  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One page as Markdown (stdout)
  pdfpage paper.pdf --page 3

  # Whole document to a file, pages separated by comments
  pdfpage paper.pdf --separator comment -o paper.md

  # A range of pages, images written next to the output
  pdfpage report.pdf --pages 2-6 --image-dir ./img -o report.md

  # Page 1 as SVG (raster + invisible text layer)
  pdfpage paper.pdf --page 1 --svg -o page1.svg

  # Page 4 as a 200 dpi PNG in ./img, path printed on stdout
  pdfpage paper.pdf --page 4 --png --dpi 200 --image-dir ./img

  # Plain text of one page
  pdfpage paper.pdf --page 2 --text

  # Case-insensitive search, first 5 hits as JSON
  pdfpage paper.pdf --search "transformer" --max-hits 5 --json

  # Metadata only
  pdfpage --inspect-only paper.pdf

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH     pdfium shared library, or the directory holding it
  PDFPAGE_*           most long flags, e.g. PDFPAGE_IMAGE_DIR=/srv/img
  RUST_LOG            log filter, overrides -v / -q
"#;

/// Rebuild PDF pages as reading-ordered Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "pdfpage",
    version,
    about = "Rebuild PDF pages as reading-ordered Markdown",
    long_about = "Rebuild PDF pages as reading-ordered Markdown: headings, paragraphs, lists, \
formulas, pipe tables and extracted images, stitched back together top to bottom.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Extract a single page (1-based).
    #[arg(long, env = "PDFPAGE_PAGE", conflicts_with = "pages")]
    page: Option<usize>,

    /// Pages for document conversion: "all", "5", "3-15", or "1,3,5".
    #[arg(long, env = "PDFPAGE_PAGES", default_value = "all")]
    pages: String,

    /// Render the page as SVG instead of Markdown (needs --page).
    #[arg(long, requires = "page", conflicts_with_all = ["text", "search"])]
    svg: bool,

    /// Rasterise the page to PNG in the image directory (needs --page).
    #[arg(long, requires = "page", conflicts_with_all = ["svg", "text", "search"])]
    png: bool,

    /// Resolution of --png output.
    #[arg(long, env = "PDFPAGE_DPI", default_value_t = DEFAULT_PNG_DPI)]
    dpi: u32,

    /// Print the page's plain text instead of Markdown (needs --page).
    #[arg(long, requires = "page", conflicts_with = "search")]
    text: bool,

    /// Search every page for this text (case-insensitive).
    #[arg(long, env = "PDFPAGE_SEARCH")]
    search: Option<String>,

    /// Maximum number of search hits.
    #[arg(long, env = "PDFPAGE_MAX_HITS", default_value_t = 20)]
    max_hits: usize,

    /// Print PDF metadata only, no extraction.
    #[arg(long)]
    inspect_only: bool,

    /// Output structured JSON instead of Markdown.
    #[arg(long, env = "PDFPAGE_JSON")]
    json: bool,

    /// Write output to this file instead of stdout.
    #[arg(short, long, env = "PDFPAGE_OUTPUT")]
    output: Option<PathBuf>,

    /// Directory for extracted images (default: system temp dir).
    #[arg(long, env = "PDFPAGE_IMAGE_DIR")]
    image_dir: Option<PathBuf>,

    /// URL prefix placed before image filenames in Markdown links.
    #[arg(long, env = "PDFPAGE_IMAGE_URL_PREFIX")]
    image_url_prefix: Option<String>,

    /// Page separator: none, hr, comment, or a custom string.
    #[arg(long, env = "PDFPAGE_SEPARATOR", default_value = "none")]
    separator: String,

    /// Do not append the "*Page N*" footer to each page.
    #[arg(long, env = "PDFPAGE_NO_FOOTER")]
    no_footer: bool,

    /// Skip alignment-based table detection.
    #[arg(long, env = "PDFPAGE_NO_TABLES")]
    no_tables: bool,

    /// Password for encrypted PDFs.
    #[arg(long, env = "PDFPAGE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Width in pixels of the raster layer of --svg output.
    #[arg(long, env = "PDFPAGE_RENDER_WIDTH", default_value_t = 1200)]
    render_width: u32,

    /// Reading speed used for the reading-time estimate.
    #[arg(long, env = "PDFPAGE_WPM", default_value_t = 200)]
    words_per_minute: usize,

    /// Disable progress bar.
    #[arg(long, env = "PDFPAGE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFPAGE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFPAGE_QUIET", conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn document_mode(&self) -> bool {
        !self.inspect_only && self.page.is_none() && self.search.is_none()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level logs unless -v asks for them.
    let show_progress = cli.document_mode() && !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = blocking({
            let (input, config) = (cli.input.clone(), config.clone());
            move || inspect(&input, &config)
        })
        .await
        .context("Failed to inspect PDF")?;

        if cli.json {
            emit(
                &cli,
                &serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?,
            )?;
        } else {
            let mut s = format!("File:         {}\n", cli.input.display());
            let mut line = |label: &str, value: &Option<String>| {
                if let Some(v) = value {
                    s.push_str(&format!("{label:<14}{v}\n"));
                }
            };
            line("Title:", &meta.title);
            line("Author:", &meta.author);
            line("Subject:", &meta.subject);
            line("Producer:", &meta.producer);
            line("Creator:", &meta.creator);
            line("Created:", &meta.creation_date);
            line("Modified:", &meta.modification_date);
            s.push_str(&format!("Pages:        {}\n", meta.page_count));
            s.push_str(&format!("Encrypted:    {}\n", meta.encrypted));
            s.push_str(&format!("PDF Version:  {}", meta.pdf_version));
            emit(&cli, &s)?;
        }
        return Ok(());
    }

    // ── Search ───────────────────────────────────────────────────────────
    if let Some(query) = cli.search.clone() {
        let hits = blocking({
            let (input, config, max_hits) = (cli.input.clone(), config.clone(), cli.max_hits);
            move || search_text(&input, &query, max_hits, &config)
        })
        .await
        .context("Search failed")?;

        if cli.json {
            emit(
                &cli,
                &serde_json::to_string_pretty(&hits).context("Failed to serialise hits")?,
            )?;
        } else {
            let body = hits
                .iter()
                .map(|h| format!("{} {}", bold(&format!("p.{:<4}", h.page)), h.text.replace('\n', " ")))
                .collect::<Vec<_>>()
                .join("\n");
            emit(&cli, &body)?;
            if !cli.quiet {
                eprintln!("{} hit(s)", hits.len());
            }
        }
        return Ok(());
    }

    // ── Single page ──────────────────────────────────────────────────────
    if let Some(page) = cli.page {
        if cli.png {
            let image = render_page_png_async(&cli.input, page, cli.dpi, &config)
                .await
                .context("PNG render failed")?;
            return match (&cli.output, cli.json) {
                (Some(out), false) => {
                    std::fs::copy(&image.location, out)
                        .with_context(|| format!("Failed to write {}", out.display()))?;
                    if !cli.quiet {
                        eprintln!(
                            "{} {}  {}",
                            green("✔"),
                            bold(&out.display().to_string()),
                            dim(&format!("{}x{} px @ {} dpi", image.width, image.height, image.dpi))
                        );
                    }
                    Ok(())
                }
                (_, true) => emit(
                    &cli,
                    &serde_json::to_string_pretty(&image).context("Failed to serialise image")?,
                ),
                (None, false) => emit(&cli, &image.location),
            };
        }
        if cli.svg {
            let svg = render_page_vector_async(&cli.input, page, &config)
                .await
                .context("SVG render failed")?;
            return emit(&cli, &svg);
        }
        if cli.text {
            let text = blocking({
                let (input, config) = (cli.input.clone(), config.clone());
                move || extract_page_text(&input, page, &config)
            })
            .await
            .context("Text extraction failed")?;
            return emit(&cli, &text);
        }

        let result = extract_page_markdown_async(&cli.input, page, &config)
            .await
            .context("Page extraction failed")?;
        if cli.json {
            emit(
                &cli,
                &serde_json::to_string_pretty(&result).context("Failed to serialise output")?,
            )?;
        } else {
            emit(&cli, &result.markdown)?;
        }
        if !cli.quiet {
            for w in &result.warnings {
                eprintln!("{} {}", cyan("⚠"), w);
            }
            eprintln!(
                "{}",
                dim(&format!(
                    "page {}  tables: {}  images: {}  ~{} min read",
                    result.page,
                    result.has_tables,
                    result.has_images,
                    result.estimated_reading_time_minutes
                ))
            );
        }
        return Ok(());
    }

    // ── Whole document ───────────────────────────────────────────────────
    match (&cli.output, cli.json) {
        (Some(output_path), false) => {
            let stats = blocking({
                let (input, out, config) = (cli.input.clone(), output_path.clone(), config.clone());
                move || convert_document_to_file(&input, &out, &config)
            })
            .await
            .context("Conversion failed")?;

            if !cli.quiet {
                let selected = stats.processed_pages + stats.failed_pages;
                eprintln!(
                    "{}  {}/{} pages  {}ms  →  {}",
                    if stats.failed_pages == 0 {
                        green("✔")
                    } else {
                        cyan("⚠")
                    },
                    stats.processed_pages,
                    selected,
                    stats.total_duration_ms,
                    bold(&output_path.display().to_string()),
                );
                eprintln!(
                    "   {} words  /  ~{} min read  /  {} warning(s)",
                    dim(&stats.word_count.to_string()),
                    dim(&stats.estimated_reading_time_minutes.to_string()),
                    stats.warnings,
                );
            }
        }
        _ => {
            let output = convert_document_async(&cli.input, &config)
                .await
                .context("Conversion failed")?;

            if cli.json {
                emit(
                    &cli,
                    &serde_json::to_string_pretty(&output).context("Failed to serialise output")?,
                )?;
            } else {
                emit(&cli, &output.markdown)?;
            }

            if !cli.quiet && !show_progress {
                let selected = output.stats.processed_pages + output.stats.failed_pages;
                eprintln!(
                    "Extracted {}/{} pages in {}ms",
                    output.stats.processed_pages, selected, output.stats.total_duration_ms
                );
                if output.stats.failed_pages > 0 {
                    eprintln!("  {} pages failed", output.stats.failed_pages);
                }
            } else if !cli.quiet && !cli.json {
                eprintln!(
                    "   {} words  /  ~{} min read  /  {}ms total",
                    dim(&output.stats.word_count.to_string()),
                    dim(&output.stats.estimated_reading_time_minutes.to_string()),
                    output.stats.total_duration_ms,
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let pages = PageSelection::parse(&cli.pages).context("Invalid --pages")?;

    let mut builder = ExtractionConfig::builder()
        .pages(pages)
        .page_separator(PageSeparator::parse(&cli.separator))
        .page_footer(!cli.no_footer)
        .detect_tables(!cli.no_tables)
        .render_width(cli.render_width)
        .words_per_minute(cli.words_per_minute);

    if let Some(ref dir) = cli.image_dir {
        builder = builder.image_dir(dir);
    }
    if let Some(ref prefix) = cli.image_url_prefix {
        builder = builder.image_url_prefix(prefix);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Run a blocking library call off the async executor.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T, pdfpage2md::PageMdError> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f)
        .await
        .context("Worker task panicked")??)
}

/// Write `body` to `--output` or stdout, with a trailing newline.
fn emit(cli: &Cli, body: &str) -> Result<()> {
    match cli.output {
        Some(ref path) => write_output(path, body, cli.quiet),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(body.as_bytes())
                .context("Failed to write to stdout")?;
            if !body.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
            Ok(())
        }
    }
}

fn write_output(path: &Path, body: &str, quiet: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))?;
    if !quiet {
        eprintln!("{} {}", green("✔"), bold(&path.display().to_string()));
    }
    Ok(())
}
