//! pdfium-backed engine.
//!
//! ## Binding
//!
//! The library is located once per process:
//!
//! 1. `PDFIUM_LIB_PATH`, either the library file itself or its directory
//! 2. the platform library in the working directory
//! 3. the system library search path
//!
//! [`PdfiumEngine::shared`] keeps the bound engine in a `OnceLock` so every
//! request reuses it.
//!
//! ## Coordinates
//!
//! pdfium reports bottom-up PDF space. Every box leaving this module is
//! flipped to top-down (`y0 = page_height - top`).
//!
//! ## Threading
//!
//! `PdfDocument` is tied to the `Pdfium` it came from and is not `Send`.
//! Async callers open their own document inside `spawn_blocking`.

use crate::config::TableDetectionConfig;
use crate::engine::{PageSource, PdfEngine};
use crate::error::PageMdError;
use crate::input::validate_pdf_path;
use crate::model::{BBox, DetectedImage, DetectedTable, ImageHandle, PageRect, TextBlock, TextSpan};
use crate::output::DocumentMetadata;
use crate::pipeline::blocks::{group_spans, BlockGrouping};
use crate::pipeline::table_detect::TableDetector;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Environment variable pointing at a pdfium library file or directory.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

static SHARED: OnceLock<PdfiumEngine> = OnceLock::new();

/// Owns the pdfium bindings.
pub struct PdfiumEngine {
    pdfium: Pdfium,
    grouping: BlockGrouping,
}

impl std::fmt::Debug for PdfiumEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfiumEngine")
            .field("grouping", &self.grouping)
            .finish_non_exhaustive()
    }
}

impl PdfiumEngine {
    /// Bind to pdfium using `PDFIUM_LIB_PATH`, the working directory, or the
    /// system library, in that order.
    pub fn bind() -> Result<Self, PageMdError> {
        let bindings = match std::env::var_os(PDFIUM_LIB_PATH_ENV) {
            Some(raw) => {
                let path = PathBuf::from(raw);
                let lib = if path.is_dir() {
                    Pdfium::pdfium_platform_library_name_at_path(&path)
                } else {
                    path
                };
                debug!("Binding pdfium from {}", lib.display());
                Pdfium::bind_to_library(&lib).map_err(|e| {
                    PageMdError::PdfiumBindingFailed(format!("{}: {:?}", lib.display(), e))
                })?
            }
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())
                .map_err(|e| PageMdError::PdfiumBindingFailed(format!("{:?}", e)))?,
        };
        info!("pdfium bound");
        Ok(Self {
            pdfium: Pdfium::new(bindings),
            grouping: BlockGrouping::default(),
        })
    }

    /// Process-wide engine, bound on first use.
    ///
    /// A failed bind is not cached; the next call tries again.
    pub fn shared() -> Result<&'static PdfiumEngine, PageMdError> {
        if let Some(engine) = SHARED.get() {
            return Ok(engine);
        }
        let engine = Self::bind()?;
        Ok(SHARED.get_or_init(|| engine))
    }

    /// Override the span → block grouping tolerances.
    pub fn with_grouping(mut self, grouping: BlockGrouping) -> Self {
        self.grouping = grouping;
        self
    }
}

impl PdfEngine for PdfiumEngine {
    fn open<'a>(
        &'a self,
        path: &Path,
        password: Option<&'a str>,
    ) -> Result<Box<dyn PageSource + 'a>, PageMdError> {
        validate_pdf_path(path)?;

        let document = self
            .pdfium
            .load_pdf_from_file(path, password)
            .map_err(|e| map_load_error(path, password, e))?;
        info!(
            "PDF loaded: {} ({} pages)",
            path.display(),
            document.pages().len()
        );

        Ok(Box::new(PdfiumDocument {
            document,
            grouping: self.grouping,
            encrypted: password.is_some(),
        }))
    }
}

fn map_load_error(path: &Path, password: Option<&str>, e: PdfiumError) -> PageMdError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            PageMdError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            PageMdError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        PageMdError::CorruptPdf {
            path: path.to_path_buf(),
            detail: err_str,
        }
    }
}

/// One open document.
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
    grouping: BlockGrouping,
    encrypted: bool,
}

impl<'a> PdfiumDocument<'a> {
    fn page(&self, index: usize) -> Result<PdfPage<'a>, PageMdError> {
        let page_num = index + 1;
        let idx = PdfPageIndex::try_from(index).map_err(|_| PageMdError::PageOutOfRange {
            page: page_num,
            total: self.page_count(),
        })?;
        self.document
            .pages()
            .get(idx)
            .map_err(|e| PageMdError::RenderFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })
    }

    /// All non-empty text objects on the page as top-down spans.
    fn spans(&self, index: usize) -> Result<Vec<TextSpan>, PageMdError> {
        let page = self.page(index)?;
        let height = page.height().value;
        let mut spans = Vec::new();

        for object in page.objects().iter() {
            let Some(text_obj) = object.as_text_object() else {
                continue;
            };
            let text = text_obj.text();
            if text.trim().is_empty() {
                continue;
            }
            let bbox = match object.bounds() {
                Ok(b) => top_down([b.left(), b.top(), b.right(), b.bottom()], height),
                Err(e) => {
                    warn!("Page {}: text object without bounds: {:?}", index + 1, e);
                    continue;
                }
            };
            let font_size = text_obj.scaled_font_size().value;
            spans.push(TextSpan::new(text, font_size, bbox).with_font(text_obj.font().name()));
        }

        debug!("Page {}: {} text spans", index + 1, spans.len());
        Ok(spans)
    }
}

/// Flip `[left, top, right, bottom]` from PDF space to top-down.
fn top_down([left, top, right, bottom]: [PdfPoints; 4], page_height: f32) -> BBox {
    BBox::new(
        left.value,
        page_height - top.value,
        right.value,
        page_height - bottom.value,
    )
}

fn color_channels(space: Option<PdfColorSpace>) -> u8 {
    match space {
        Some(PdfColorSpace::DeviceCMYK) | Some(PdfColorSpace::DeviceN) => 4,
        Some(PdfColorSpace::DeviceGray) | Some(PdfColorSpace::CalibratedCIEGray) => 1,
        _ => 3,
    }
}

/// What pdfium reports about one image object before its pixels are read.
struct ImageObjectInfo {
    object_index: usize,
    bounds: Result<BBox, PdfiumError>,
    pixel_width: u32,
    pixel_height: u32,
    channels: u8,
}

/// Turn one image object into a [`DetectedImage`].
///
/// An object without bounds cannot be placed in reading order; it is logged
/// and left out while the rest of the page's images carry on.
fn place_image(page: usize, info: ImageObjectInfo) -> Option<DetectedImage> {
    match info.bounds {
        Ok(bbox) => Some(DetectedImage {
            bbox,
            pixel_width: info.pixel_width,
            pixel_height: info.pixel_height,
            channels: info.channels,
            has_alpha: false,
            handle: ImageHandle(info.object_index),
        }),
        Err(e) => {
            warn!(
                "Page {}: skipping image object {} without bounds: {:?}",
                page, info.object_index, e
            );
            None
        }
    }
}

impl PageSource for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn metadata(&self) -> DocumentMetadata {
        let metadata = self.document.metadata();

        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
            modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
            page_count: self.page_count(),
            pdf_version: format!("{:?}", self.document.version()),
            encrypted: self.encrypted,
        }
    }

    fn page_rect(&self, index: usize) -> Result<PageRect, PageMdError> {
        let page = self.page(index)?;
        Ok(PageRect {
            width: page.width().value,
            height: page.height().value,
        })
    }

    fn text_blocks(&self, index: usize) -> Result<Vec<TextBlock>, PageMdError> {
        Ok(group_spans(self.spans(index)?, &self.grouping))
    }

    fn detect_tables(
        &self,
        index: usize,
        config: &TableDetectionConfig,
    ) -> Result<Vec<DetectedTable>, PageMdError> {
        let spans = self.spans(index)?;
        Ok(TableDetector::new(*config).detect(&spans))
    }

    fn images(&self, index: usize) -> Result<Vec<DetectedImage>, PageMdError> {
        let page = self.page(index)?;
        let height = page.height().value;
        let mut images = Vec::new();

        for (object_index, object) in page.objects().iter().enumerate() {
            let Some(image_obj) = object.as_image_object() else {
                continue;
            };
            let info = ImageObjectInfo {
                object_index,
                bounds: object
                    .bounds()
                    .map(|b| top_down([b.left(), b.top(), b.right(), b.bottom()], height)),
                pixel_width: image_obj.width().map(|w| w.max(0) as u32).unwrap_or(0),
                pixel_height: image_obj.height().map(|h| h.max(0) as u32).unwrap_or(0),
                channels: color_channels(image_obj.color_space().ok()),
            };
            images.extend(place_image(index + 1, info));
        }

        debug!("Page {}: {} image objects", index + 1, images.len());
        Ok(images)
    }

    fn load_image(&self, index: usize, handle: ImageHandle) -> Result<DynamicImage, PageMdError> {
        let page = self.page(index)?;
        let failed = |detail: String| PageMdError::RenderFailed {
            page: index + 1,
            detail,
        };
        let object = page
            .objects()
            .get(handle.0)
            .map_err(|e| failed(format!("image object {}: {:?}", handle.0, e)))?;
        let image_obj = object
            .as_image_object()
            .ok_or_else(|| failed(format!("object {} is not an image", handle.0)))?;
        image_obj
            .get_raw_image()
            .map_err(|e| failed(format!("image object {}: {:?}", handle.0, e)))
    }

    fn render_raster(&self, index: usize, width_px: u32) -> Result<DynamicImage, PageMdError> {
        let page = self.page(index)?;
        let render_config = PdfRenderConfig::new().set_target_width(width_px as i32);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| PageMdError::RenderFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;
        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmyk_and_device_n_count_four_channels() {
        assert_eq!(color_channels(Some(PdfColorSpace::DeviceCMYK)), 4);
        assert_eq!(color_channels(Some(PdfColorSpace::DeviceN)), 4);
        assert_eq!(color_channels(Some(PdfColorSpace::DeviceGray)), 1);
        assert_eq!(color_channels(Some(PdfColorSpace::CalibratedCIEGray)), 1);
        assert_eq!(color_channels(Some(PdfColorSpace::DeviceRGB)), 3);
        assert_eq!(color_channels(None), 3);
    }

    fn info(object_index: usize, bounds: Result<BBox, PdfiumError>) -> ImageObjectInfo {
        ImageObjectInfo {
            object_index,
            bounds,
            pixel_width: 4,
            pixel_height: 4,
            channels: 3,
        }
    }

    #[test]
    fn boxes_are_flipped_to_top_down() {
        let pts = [
            PdfPoints::new(72.0),
            PdfPoints::new(700.0),
            PdfPoints::new(300.0),
            PdfPoints::new(680.0),
        ];
        assert_eq!(top_down(pts, 792.0), BBox::new(72.0, 92.0, 300.0, 112.0));
    }

    #[test]
    fn image_without_bounds_is_skipped_alone() {
        let ok = || Ok(BBox::new(10.0, 20.0, 110.0, 120.0));
        let objects = vec![
            info(0, ok()),
            info(1, Err(PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::Unknown))),
            info(2, ok()),
        ];

        let placed: Vec<DetectedImage> = objects
            .into_iter()
            .filter_map(|o| place_image(1, o))
            .collect();

        let handles: Vec<usize> = placed.iter().map(|i| i.handle.0).collect();
        assert_eq!(handles, vec![0, 2]);
        assert_eq!(placed[0].bbox, BBox::new(10.0, 20.0, 110.0, 120.0));
    }

    #[test]
    fn password_errors_are_distinguished() {
        let path = Path::new("/tmp/x.pdf");
        let e = map_load_error(path, None, PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::PasswordError,
        ));
        assert!(matches!(e, PageMdError::PasswordRequired { .. }));
        let e = map_load_error(path, Some("nope"), PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::PasswordError,
        ));
        assert!(matches!(e, PageMdError::WrongPassword { .. }));
        let e = map_load_error(path, None, PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::FormatError,
        ));
        assert!(matches!(e, PageMdError::CorruptPdf { .. }));
    }
}
