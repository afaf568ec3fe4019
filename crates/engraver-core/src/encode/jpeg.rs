//! JPEG encoding for the print artifact.
//!
//! Uses the `image` crate's baseline JPEG encoder. The raster is flattened to
//! 3-channel RGB first; transparent regions take the background tone.

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use image::ImageEncoder;
use std::io::Cursor;
use thiserror::Error;

use super::QualityEncoder;
use crate::classify::Tone;
use crate::raster::RasterBuffer;

/// Errors that can occur during JPEG encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes, got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// JPEG encoding failed
    #[error("JPEG encoding failed: {0}")]
    EncodingFailed(String),
}

/// Map a normalized quality (0.0 to 1.0) to the JPEG scale (1 to 100).
#[inline]
pub fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Encode RGB pixel data to JPEG bytes.
///
/// # Arguments
///
/// * `pixels` - RGB pixel data (3 bytes per pixel, row-major order)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `quality` - JPEG quality (1-100, where 100 is highest quality)
pub fn encode_jpeg(
    pixels: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected_len = (width as usize) * (height as usize) * 3;
    if pixels.len() != expected_len {
        return Err(EncodeError::InvalidPixelData {
            expected: expected_len,
            actual: pixels.len(),
        });
    }

    let quality = quality.clamp(1, 100);
    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);

    encoder
        .write_image(pixels, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;

    Ok(buffer.into_inner())
}

/// The production encode-at-quality primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegQualityEncoder {
    /// Tone that transparent regions are flattened to.
    pub background: Tone,
}

impl Default for JpegQualityEncoder {
    fn default() -> Self {
        Self {
            background: Tone::White,
        }
    }
}

impl QualityEncoder for JpegQualityEncoder {
    fn encode(&self, raster: &RasterBuffer, quality: f32) -> Result<Vec<u8>, EncodeError> {
        if raster.width == 0 || raster.height == 0 {
            return Err(EncodeError::InvalidDimensions {
                width: raster.width,
                height: raster.height,
            });
        }
        let expected = raster.pixel_count() as usize * 4;
        if raster.pixels.len() != expected {
            return Err(EncodeError::InvalidPixelData {
                expected,
                actual: raster.pixels.len(),
            });
        }

        let rgb = raster.flatten(self.background);
        encode_jpeg(&rgb, raster.width, raster.height, jpeg_quality(quality))
    }
}
