//! Image extraction: decode each placed image, store it as PNG, and build the
//! Markdown reference that points at it.
//!
//! Images with four or more colour channels (CMYK, DeviceN) are skipped
//! before their pixels are ever decoded. Every other image is handled on its
//! own: a decode or store failure drops that one image with a
//! [`PageWarning::ImageFailed`] and the rest of the page carries on.
//!
//! Storage goes through [`ImageStore`]. [`TempDirImageStore`] writes files
//! named `pdf_p{page}_img{n}_{random}.png` (and whole-page renders as
//! `pdf_page_{page}_{random}.png`) into a directory and is what the
//! `/api/temp-image/<filename>` route serves from;
//! [`MemoryImageStore`] keeps encoded bytes in memory for tests and
//! embedders that serve images themselves.

use crate::engine::PageSource;
use crate::error::{PageMdError, PageWarning};
use crate::model::{DetectedImage, RenderedImage};
use crate::pipeline::encode::{encode_png, write_png};
use image::DynamicImage;
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Where an image ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Bare file name used in the retrieval URL.
    pub filename: String,
    /// Full path (or in-memory key) of the stored bytes.
    pub location: String,
}

/// Persists extracted images.
///
/// `image_number` is 1-based and counts every image placed on the page,
/// including skipped ones.
pub trait ImageStore: Send + Sync {
    fn put(
        &self,
        page: usize,
        image_number: usize,
        image: &DynamicImage,
    ) -> Result<StoredImage, PageMdError>;

    /// Persist a raster of the whole page.
    fn put_page(&self, page: usize, image: &DynamicImage) -> Result<StoredImage, PageMdError>;
}

// ── Temp-directory store ─────────────────────────────────────────────────────

/// Writes PNG files into a directory with unique, unguessable names.
///
/// Files are never cleaned up by this type; their lifetime belongs to
/// whatever serves them.
#[derive(Debug, Clone)]
pub struct TempDirImageStore {
    dir: PathBuf,
}

impl TempDirImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Map a file name from the retrieval route back to a stored file.
    ///
    /// Rejects anything that is not a single plain path component (`..`,
    /// absolute paths, separators) and names that do not exist.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf, PageMdError> {
        let invalid = || PageMdError::InvalidImagePath {
            name: filename.to_string(),
        };
        if filename.is_empty()
            || filename.contains("..")
            || filename.starts_with('/')
            || filename.starts_with('\\')
        {
            return Err(invalid());
        }
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return Err(invalid()),
        }
        if filename.contains('\\') {
            return Err(invalid());
        }

        let path = self.dir.join(filename);
        if !path.is_file() {
            return Err(invalid());
        }
        Ok(path)
    }
}

impl ImageStore for TempDirImageStore {
    fn put(
        &self,
        page: usize,
        image_number: usize,
        image: &DynamicImage,
    ) -> Result<StoredImage, PageMdError> {
        self.write(&format!("pdf_p{page}_img{image_number}_"), image)
    }

    fn put_page(&self, page: usize, image: &DynamicImage) -> Result<StoredImage, PageMdError> {
        self.write(&format!("pdf_page_{page}_"), image)
    }
}

impl TempDirImageStore {
    fn write(&self, prefix: &str, image: &DynamicImage) -> Result<StoredImage, PageMdError> {
        let store_err = |detail: String| PageMdError::ImageStoreFailed {
            name: prefix.to_string(),
            detail,
        };

        let tmp = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".png")
            .rand_bytes(8)
            .tempfile_in(&self.dir)
            .map_err(|e| store_err(e.to_string()))?;

        // Keep the file past this call; remove it by hand if the write fails.
        let (file, path) = tmp.keep().map_err(|e| store_err(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        let written = write_png(image, &mut writer)
            .map_err(|e| store_err(e.to_string()))
            .and_then(|()| writer.flush().map_err(|e| store_err(e.to_string())));
        drop(writer);
        if let Err(e) = written {
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| store_err("stored file has no name".into()))?;
        debug!("Stored image {} ({}x{})", filename, image.width(), image.height());
        Ok(StoredImage {
            filename,
            location: path.display().to_string(),
        })
    }
}

// ── In-memory store ──────────────────────────────────────────────────────────

/// Keeps PNG bytes in memory, keyed by generated file name.
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    images: Mutex<Vec<(String, Vec<u8>)>>,
    counter: AtomicUsize,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// PNG bytes stored under `filename`.
    pub fn get(&self, filename: &str) -> Option<Vec<u8>> {
        self.lock()
            .iter()
            .find(|(name, _)| name == filename)
            .map(|(_, bytes)| bytes.clone())
    }

    /// Stored file names in insertion order.
    pub fn filenames(&self) -> Vec<String> {
        self.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, Vec<u8>)>> {
        self.images.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ImageStore for MemoryImageStore {
    fn put(
        &self,
        page: usize,
        image_number: usize,
        image: &DynamicImage,
    ) -> Result<StoredImage, PageMdError> {
        self.insert(&format!("pdf_p{page}_img{image_number}_"), image)
    }

    fn put_page(&self, page: usize, image: &DynamicImage) -> Result<StoredImage, PageMdError> {
        self.insert(&format!("pdf_page_{page}_"), image)
    }
}

impl MemoryImageStore {
    fn insert(&self, prefix: &str, image: &DynamicImage) -> Result<StoredImage, PageMdError> {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        let filename = format!("{prefix}{seq:08x}.png");
        let bytes = encode_png(image).map_err(|e| PageMdError::ImageStoreFailed {
            name: filename.clone(),
            detail: e.to_string(),
        })?;
        self.lock().push((filename.clone(), bytes));
        Ok(StoredImage {
            location: format!("memory://{filename}"),
            filename,
        })
    }
}

// ── Extraction ───────────────────────────────────────────────────────────────

/// True for images the pipeline never stores (four or more colour channels).
pub fn should_skip(image: &DetectedImage) -> bool {
    image.color_channels() >= 4
}

/// Markdown image reference for a stored file.
pub fn image_markdown(image_number: usize, url_prefix: &str, filename: &str) -> String {
    format!("![image{image_number}]({url_prefix}{filename})")
}

/// Decode, store, and reference every eligible image on a page.
///
/// `index` is the 0-based page index, `page` the 1-based number used in file
/// names and warnings.
pub fn extract_images(
    source: &dyn PageSource,
    index: usize,
    page: usize,
    detected: &[DetectedImage],
    store: &dyn ImageStore,
    url_prefix: &str,
) -> (Vec<RenderedImage>, Vec<PageWarning>) {
    let mut rendered = Vec::new();
    let mut warnings = Vec::new();

    for (i, img) in detected.iter().enumerate() {
        let number = i + 1;
        if should_skip(img) {
            debug!(
                "Page {}: skipping image {} ({} colour channels)",
                page,
                number,
                img.color_channels()
            );
            continue;
        }

        let stored = source
            .load_image(index, img.handle)
            .and_then(|pixels| store.put(page, number, &pixels).map(|s| (s, pixels)));
        match stored {
            Ok((stored, pixels)) => rendered.push(RenderedImage {
                id: format!("image_{number}"),
                bbox: img.bbox,
                markdown: image_markdown(number, url_prefix, &stored.filename),
                storage_path: stored.location,
                width: pixels.width(),
                height: pixels.height(),
            }),
            Err(e) => {
                warn!("Page {}: dropping image {}: {}", page, number, e);
                warnings.push(PageWarning::ImageFailed {
                    page,
                    image: number,
                    detail: e.to_string(),
                });
            }
        }
    }

    (rendered, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, ImageHandle};
    use image::{Rgb, RgbImage};

    fn red(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([200, 10, 10])))
    }

    fn detected(channels: u8, has_alpha: bool) -> DetectedImage {
        DetectedImage {
            bbox: BBox::new(0.0, 0.0, 10.0, 10.0),
            pixel_width: 4,
            pixel_height: 4,
            channels,
            has_alpha,
            handle: ImageHandle(0),
        }
    }

    #[test]
    fn skip_rule_counts_colour_channels_only() {
        assert!(!should_skip(&detected(1, false)));
        assert!(!should_skip(&detected(3, false)));
        assert!(!should_skip(&detected(4, true)));
        assert!(should_skip(&detected(4, false)));
        assert!(should_skip(&detected(5, true)));
    }

    #[test]
    fn markdown_reference_format() {
        assert_eq!(
            image_markdown(2, "/api/temp-image/", "pdf_p3_img2_ab.png"),
            "![image2](/api/temp-image/pdf_p3_img2_ab.png)"
        );
    }

    #[test]
    fn temp_dir_store_writes_png_with_page_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = TempDirImageStore::new(dir.path());
        let stored = store.put(3, 2, &red(5, 4)).unwrap();

        assert!(stored.filename.starts_with("pdf_p3_img2_"));
        assert!(stored.filename.ends_with(".png"));
        let bytes = std::fs::read(&stored.location).unwrap();
        let back = image::load_from_memory(&bytes).unwrap();
        assert_eq!((back.width(), back.height()), (5, 4));
    }

    #[test]
    fn temp_dir_store_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = TempDirImageStore::new(dir.path());
        let a = store.put(1, 1, &red(1, 1)).unwrap();
        let b = store.put(1, 1, &red(1, 1)).unwrap();
        assert_ne!(a.filename, b.filename);
    }

    #[test]
    fn resolve_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = TempDirImageStore::new(dir.path());
        for bad in ["../etc/passwd", "/etc/passwd", "\\windows", "a/../b.png", "sub/x.png", ""] {
            assert!(
                matches!(store.resolve(bad), Err(PageMdError::InvalidImagePath { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn resolve_finds_stored_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TempDirImageStore::new(dir.path());
        let stored = store.put(1, 1, &red(2, 2)).unwrap();
        let path = store.resolve(&stored.filename).unwrap();
        assert_eq!(path, dir.path().join(&stored.filename));
        assert!(store.resolve("pdf_p9_img9_missing.png").is_err());
    }

    #[test]
    fn temp_dir_store_fails_for_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = TempDirImageStore::new(dir.path().join("does-not-exist"));
        assert!(matches!(
            store.put(1, 1, &red(1, 1)),
            Err(PageMdError::ImageStoreFailed { .. })
        ));
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryImageStore::new();
        let stored = store.put(7, 1, &red(3, 3)).unwrap();
        assert!(stored.filename.starts_with("pdf_p7_img1_"));
        assert_eq!(store.len(), 1);
        assert!(store.get(&stored.filename).is_some());
    }

    #[test]
    fn page_renders_use_their_own_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = TempDirImageStore::new(dir.path());
        let a = store.put_page(4, &red(6, 8)).unwrap();
        let b = store.put_page(4, &red(6, 8)).unwrap();

        assert!(a.filename.starts_with("pdf_page_4_"));
        assert!(a.filename.ends_with(".png"));
        assert_ne!(a.filename, b.filename);
        assert_eq!(store.resolve(&a.filename).unwrap(), dir.path().join(&a.filename));
    }
}
