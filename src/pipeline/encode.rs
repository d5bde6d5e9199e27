//! Image encoding: `DynamicImage` → PNG bytes, or a base64 data URI.
//!
//! Extracted images are written as PNG regardless of how the PDF stored them
//! (DCT, Flate, JBIG2…), and the vector render embeds its raster layer as a
//! PNG data URI.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ColorType, DynamicImage, ImageFormat};
use std::borrow::Cow;
use std::io::{Cursor, Seek, Write};
use tracing::debug;

/// Write `img` as PNG into any seekable writer.
///
/// Floating-point buffers have no PNG representation and are converted to
/// 8-bit RGBA first.
pub fn write_png<W: Write + Seek>(img: &DynamicImage, out: &mut W) -> Result<(), image::ImageError> {
    png_compatible(img).write_to(out, ImageFormat::Png)
}

/// Encode `img` as PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    write_png(img, &mut Cursor::new(&mut buf))?;
    debug!("Encoded {}x{} image → {} PNG bytes", img.width(), img.height(), buf.len());
    Ok(buf)
}

/// Encode `img` as a `data:image/png;base64,…` URI.
pub fn png_data_uri(img: &DynamicImage) -> Result<String, image::ImageError> {
    let bytes = encode_png(img)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&bytes)))
}

fn png_compatible(img: &DynamicImage) -> Cow<'_, DynamicImage> {
    match img.color() {
        ColorType::L8
        | ColorType::La8
        | ColorType::Rgb8
        | ColorType::Rgba8
        | ColorType::L16
        | ColorType::La16
        | ColorType::Rgb16
        | ColorType::Rgba16 => Cow::Borrowed(img),
        _ => Cow::Owned(DynamicImage::ImageRgba8(img.to_rgba8())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb32FImage, Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let bytes = encode_png(&img).expect("encode should succeed");
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn float_images_are_converted() {
        let img = DynamicImage::ImageRgb32F(Rgb32FImage::new(4, 4));
        let bytes = encode_png(&img).expect("float image should encode");
        let back = image::load_from_memory(&bytes).expect("valid png");
        assert_eq!(back.width(), 4);
    }

    #[test]
    fn data_uri_is_valid_base64() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(2, 2));
        let uri = png_data_uri(&img).unwrap();
        let b64 = uri.strip_prefix("data:image/png;base64,").expect("prefix");
        let decoded = STANDARD.decode(b64).expect("valid base64");
        assert!(!decoded.is_empty());
    }
}
