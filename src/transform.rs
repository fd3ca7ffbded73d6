//! Image resizing.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

/// Failure to turn source bytes into a thumbnail.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// Source bytes are not a decodable image
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// Resized image could not be encoded
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}

/// Capability to resize encoded image bytes.
pub trait Transformer: Send + Sync + 'static {
    /// Produce a `width`×`height` re-encoded image from `source`.
    fn transform(&self, source: &[u8], width: u32, height: u32) -> Result<Vec<u8>, TransformError>;
}

/// Scales to cover the target box, crops the center, encodes JPEG.
#[derive(Debug, Clone, Copy, Default)]
pub struct FillTransformer;

impl Transformer for FillTransformer {
    fn transform(&self, source: &[u8], width: u32, height: u32) -> Result<Vec<u8>, TransformError> {
        let image = image::load_from_memory(source).map_err(TransformError::Decode)?;
        let filled = image.resize_to_fill(width, height, FilterType::Lanczos3);

        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(filled.to_rgb8());

        let mut out = Cursor::new(Vec::new());
        rgb.write_to(&mut out, ImageFormat::Jpeg)
            .map_err(TransformError::Encode)?;

        Ok(out.into_inner())
    }
}

/// Read the dimensions of an encoded image.
pub fn image_dimensions(source: &[u8]) -> Result<(u32, u32), TransformError> {
    let image = image::load_from_memory(source).map_err(TransformError::Decode)?;
    Ok((image.width(), image.height()))
}

/// Encode a gradient JPEG of the given size.
#[cfg(test)]
pub(crate) fn test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 0])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut out, ImageFormat::Jpeg)
        .unwrap();
    out.into_inner()
}
