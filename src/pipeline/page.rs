//! Page orchestration: one page in, one [`PageMarkdown`] out.
//!
//! ```text
//! page_index ─▶ tables ─▶ images ─▶ text blocks ─▶ classify ─▶ assemble
//!  (fatal)    (fail-open) (per-image)   (fatal)
//! ```
//!
//! Only the range check, text extraction, and the page geometry can fail the
//! request. Table detection and image listing degrade to "none found" with a
//! [`PageWarning`]; individual images degrade on their own inside
//! [`extract_images`].

use crate::config::ExtractionConfig;
use crate::engine::{page_index, PageSource};
use crate::error::{PageMdError, PageWarning};
use crate::model::{BBox, PageContent};
use crate::output::PageMarkdown;
use crate::pipeline::classify::classify_blocks;
use crate::pipeline::images::{extract_images, ImageStore};
use crate::pipeline::layout::{assemble_page, reading_time_minutes};
use crate::pipeline::tables::render_tables;
use tracing::{debug, info, warn};

/// Gather everything the engine reports for one page.
///
/// Warnings for the fail-open parts are appended to `warnings`.
pub fn collect_content(
    source: &dyn PageSource,
    index: usize,
    config: &ExtractionConfig,
    warnings: &mut Vec<PageWarning>,
) -> Result<PageContent, PageMdError> {
    let page = index + 1;
    let rect = source.page_rect(index)?;

    let tables = if config.table_detection.enabled {
        match source.detect_tables(index, &config.table_detection) {
            Ok(t) => t,
            Err(e) => {
                warn!("Page {}: table detection failed: {}", page, e);
                warnings.push(PageWarning::TableDetectionFailed {
                    page,
                    detail: e.to_string(),
                });
                vec![]
            }
        }
    } else {
        vec![]
    };

    let images = match source.images(index) {
        Ok(i) => i,
        Err(e) => {
            warn!("Page {}: image listing failed: {}", page, e);
            warnings.push(PageWarning::ImageListFailed {
                page,
                detail: e.to_string(),
            });
            vec![]
        }
    };

    let text_blocks = source.text_blocks(index)?;

    Ok(PageContent {
        page_number: page,
        rect,
        text_blocks,
        tables,
        images,
    })
}

/// Convert one 1-based page of an open document to Markdown.
pub fn process_page(
    source: &dyn PageSource,
    page: usize,
    config: &ExtractionConfig,
    store: &dyn ImageStore,
) -> Result<PageMarkdown, PageMdError> {
    let index = page_index(page, source.page_count())?;
    let mut warnings = Vec::new();
    let content = collect_content(source, index, config, &mut warnings)?;

    let tables = render_tables(&content.tables);
    let (images, image_warnings) = extract_images(
        source,
        index,
        page,
        &content.images,
        store,
        &config.image_url_prefix,
    );
    warnings.extend(image_warnings);

    let regions: Vec<BBox> = tables.iter().map(|t| t.bbox).collect();
    let text = classify_blocks(&content.text_blocks, &regions, &config.thresholds);
    debug!(
        "Page {}: {} text segments, {} tables, {} images",
        page,
        text.len(),
        tables.len(),
        images.len()
    );

    let markdown = assemble_page(&text, &tables, &images, page, config.page_footer);
    let estimated_reading_time_minutes = reading_time_minutes(&markdown, config.words_per_minute);
    info!(
        "Page {} → {} chars, ~{} min",
        page,
        markdown.len(),
        estimated_reading_time_minutes
    );

    Ok(PageMarkdown {
        page,
        markdown,
        has_tables: !tables.is_empty(),
        has_images: !images.is_empty(),
        estimated_reading_time_minutes,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableDetectionConfig;
    use crate::model::{
        DetectedImage, DetectedTable, ImageHandle, PageRect, TextBlock, TextLine, TextSpan,
    };
    use crate::output::DocumentMetadata;
    use crate::pipeline::images::MemoryImageStore;
    use image::{DynamicImage, RgbImage};

    /// One page: a heading, a table that overlaps a stray text block, and
    /// two images, the first of them CMYK.
    struct OnePage {
        fail_tables: bool,
    }

    fn block(text: &str, size: f32, y: f32) -> TextBlock {
        let span = TextSpan::new(text, size, BBox::new(50.0, y, 400.0, y + size));
        TextBlock::from_lines(vec![TextLine::from_spans(vec![span])])
    }

    impl PageSource for OnePage {
        fn page_count(&self) -> usize {
            1
        }

        fn metadata(&self) -> DocumentMetadata {
            DocumentMetadata::default()
        }

        fn page_rect(&self, _index: usize) -> Result<PageRect, PageMdError> {
            Ok(PageRect {
                width: 612.0,
                height: 792.0,
            })
        }

        fn text_blocks(&self, _index: usize) -> Result<Vec<TextBlock>, PageMdError> {
            Ok(vec![
                block("Cell text", 10.0, 210.0),
                block("Overview", 20.0, 60.0),
            ])
        }

        fn detect_tables(
            &self,
            _index: usize,
            _config: &TableDetectionConfig,
        ) -> Result<Vec<DetectedTable>, PageMdError> {
            if self.fail_tables {
                return Err(PageMdError::Internal("detector crashed".into()));
            }
            Ok(vec![DetectedTable {
                bbox: BBox::new(40.0, 200.0, 500.0, 260.0),
                grid: vec![vec!["A".into(), "B".into()], vec!["1".into()]],
            }])
        }

        fn images(&self, _index: usize) -> Result<Vec<DetectedImage>, PageMdError> {
            let img = |channels, handle| DetectedImage {
                bbox: BBox::new(50.0, 400.0, 300.0, 500.0),
                pixel_width: 2,
                pixel_height: 2,
                channels,
                has_alpha: false,
                handle: ImageHandle(handle),
            };
            Ok(vec![img(4, 0), img(3, 1)])
        }

        fn load_image(&self, _index: usize, handle: ImageHandle) -> Result<DynamicImage, PageMdError> {
            assert_ne!(handle, ImageHandle(0), "CMYK pixels must never be loaded");
            Ok(DynamicImage::ImageRgb8(RgbImage::new(2, 2)))
        }

        fn render_raster(&self, _index: usize, _width_px: u32) -> Result<DynamicImage, PageMdError> {
            Ok(DynamicImage::ImageRgb8(RgbImage::new(1, 1)))
        }
    }

    #[test]
    fn assembles_heading_table_and_image() {
        let store = MemoryImageStore::new();
        let md = process_page(
            &OnePage { fail_tables: false },
            1,
            &ExtractionConfig::default(),
            &store,
        )
        .unwrap();

        assert!(md.has_tables);
        assert!(md.has_images);
        assert!(md.warnings.is_empty());
        assert_eq!(store.len(), 1);
        let name = &store.filenames()[0];
        assert!(name.starts_with("pdf_p1_img2_"));

        let expected = format!(
            "\n# Overview\n\n\n| A | B |\n| --- | --- |\n| 1 |  |\n\n\n\
             ![image2](/api/temp-image/{name})\n\n\n---\n\n*Page 1*\n"
        );
        assert_eq!(md.markdown, expected);
        assert!(!md.markdown.contains("Cell text"));
    }

    #[test]
    fn table_failure_keeps_the_text() {
        let store = MemoryImageStore::new();
        let md = process_page(
            &OnePage { fail_tables: true },
            1,
            &ExtractionConfig::default(),
            &store,
        )
        .unwrap();

        assert!(!md.has_tables);
        assert!(md.markdown.contains("Cell text"));
        assert!(matches!(
            md.warnings.as_slice(),
            [PageWarning::TableDetectionFailed { page: 1, .. }]
        ));
    }

    #[test]
    fn out_of_range_page_fails_before_any_work() {
        let err = process_page(
            &OnePage { fail_tables: false },
            2,
            &ExtractionConfig::default(),
            &MemoryImageStore::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("1-1"));
    }
}
