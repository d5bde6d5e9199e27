//! Plain-text extraction and case-insensitive text search.

use crate::engine::PageSource;
use crate::error::PageMdError;
use crate::output::SearchHit;
use crate::pipeline::normalize::normalize_block_text;
use tracing::{debug, warn};

/// Default cap on returned matches.
pub const DEFAULT_MAX_HITS: usize = 20;

/// Text of one page: normalised blocks, top to bottom, separated by blank
/// lines.
pub fn page_text(source: &dyn PageSource, index: usize) -> Result<String, PageMdError> {
    let mut blocks = source.text_blocks(index)?;
    blocks.sort_by(|a, b| a.bbox.y0.total_cmp(&b.bbox.y0));
    let parts: Vec<String> = blocks
        .iter()
        .map(|b| normalize_block_text(&b.text()))
        .filter(|t| !t.is_empty())
        .collect();
    Ok(parts.join("\n\n"))
}

/// Find blocks containing `query`, case-insensitively, in page order.
///
/// At most `max_hits` matches are returned. A page whose text cannot be read
/// is skipped with a warning.
pub fn search(
    source: &dyn PageSource,
    query: &str,
    max_hits: usize,
) -> Result<Vec<SearchHit>, PageMdError> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Err(PageMdError::InvalidConfig("search query is empty".into()));
    }

    let mut hits = Vec::new();
    'pages: for index in 0..source.page_count() {
        let mut blocks = match source.text_blocks(index) {
            Ok(b) => b,
            Err(e) => {
                warn!("Search: skipping page {}: {}", index + 1, e);
                continue;
            }
        };
        blocks.sort_by(|a, b| a.bbox.y0.total_cmp(&b.bbox.y0));
        for block in blocks {
            let text = normalize_block_text(&block.text());
            if !text.to_lowercase().contains(&needle) {
                continue;
            }
            if hits.len() >= max_hits {
                break 'pages;
            }
            hits.push(SearchHit {
                page: index + 1,
                text,
                bbox: block.bbox,
            });
        }
    }

    debug!("Search {:?}: {} hit(s)", query, hits.len());
    Ok(hits)
}
