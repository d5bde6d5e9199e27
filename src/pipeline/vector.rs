//! Whole-page renders.
//!
//! The SVG form is sized to the page in points. The page is rasterised once
//! and embedded as a PNG `<image>`; every text span is laid over it as an
//! invisible `<text>` element so the render stays searchable and selectable
//! in a browser.
//!
//! The PNG form is a plain raster at a requested resolution, handed to an
//! [`ImageStore`].

use crate::engine::PageSource;
use crate::error::PageMdError;
use crate::output::PageImage;
use crate::pipeline::encode::png_data_uri;
use crate::pipeline::images::ImageStore;
use quick_xml::escape::escape;
use std::fmt::Write as _;
use tracing::debug;

/// Render the page at `index` as SVG.
pub fn render_svg(source: &dyn PageSource, index: usize, width_px: u32) -> Result<String, PageMdError> {
    let page = index + 1;
    let rect = source.page_rect(index)?;
    let raster = source.render_raster(index, width_px)?;
    let href = png_data_uri(&raster).map_err(|e| PageMdError::RenderFailed {
        page,
        detail: e.to_string(),
    })?;
    let blocks = source.text_blocks(index)?;

    let (w, h) = (rect.width, rect.height);
    let mut svg = String::with_capacity(href.len() + 1024);
    svg.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    svg.push('\n');
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}pt" height="{h}pt" viewBox="0 0 {w} {h}">"#
    );
    let _ = writeln!(
        svg,
        r#"<image x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none" href="{href}"/>"#
    );
    svg.push_str(r#"<g fill-opacity="0">"#);
    svg.push('\n');

    let mut spans = 0usize;
    for span in blocks.iter().flat_map(|b| b.spans()) {
        let text = span.text.trim_end();
        if text.is_empty() {
            continue;
        }
        spans += 1;
        let _ = writeln!(
            svg,
            r#"<text x="{:.2}" y="{:.2}" font-size="{:.2}" textLength="{:.2}">{}</text>"#,
            span.bbox.x0,
            span.bbox.y1,
            span.font_size.max(1.0),
            span.bbox.width().max(0.0),
            escape(text)
        );
    }
    svg.push_str("</g>\n</svg>\n");

    debug!(
        "Page {}: SVG with {}x{} raster, {} text spans, {} bytes",
        page,
        raster.width(),
        raster.height(),
        spans,
        svg.len()
    );
    Ok(svg)
}

/// Pixel width of a page `width_pt` points wide rendered at `dpi`.
pub fn raster_width(width_pt: f32, dpi: u32) -> u32 {
    ((width_pt * dpi as f32 / 72.0).round() as u32).max(1)
}

/// Rasterise the page at `index` at `dpi` and store it as PNG.
pub fn render_png(
    source: &dyn PageSource,
    index: usize,
    dpi: u32,
    store: &dyn ImageStore,
) -> Result<PageImage, PageMdError> {
    let page = index + 1;
    let rect = source.page_rect(index)?;
    let raster = source.render_raster(index, raster_width(rect.width, dpi))?;
    let stored = store.put_page(page, &raster)?;
    debug!(
        "Page {}: {}x{} PNG at {} dpi → {}",
        page,
        raster.width(),
        raster.height(),
        dpi,
        stored.filename
    );
    Ok(PageImage {
        page,
        filename: stored.filename,
        location: stored.location,
        width: raster.width(),
        height: raster.height(),
        dpi,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_width_scales_points_by_dpi() {
        assert_eq!(raster_width(612.0, 72), 612);
        assert_eq!(raster_width(612.0, 144), 1224);
        assert_eq!(raster_width(595.3, 150), 1240);
        assert_eq!(raster_width(0.0, 144), 1);
    }
}
