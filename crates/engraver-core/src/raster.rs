//! The in-memory raster a single export works on.

use crate::classify::Tone;

/// An RGBA8 pixel grid owned by one export invocation.
///
/// Created by capture, converted to monochrome in place, then read by the
/// encoder. It is never shared between invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA pixel data in row-major order (4 bytes per pixel).
    /// Length should be width * height * 4.
    pub pixels: Vec<u8>,
}

impl RasterBuffer {
    /// Create a new RasterBuffer with the given dimensions and pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            width as usize * height as usize * 4,
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create a fully transparent buffer.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self::new(width, height, vec![0; width as usize * height as usize * 4])
    }

    /// Create a buffer filled with one opaque color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self::new(width, height, pixels)
    }

    /// Create a RasterBuffer from an image::RgbaImage without copying.
    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw(),
        }
    }

    /// Convert into an image::RgbaImage without copying.
    pub fn into_rgba_image(self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.pixels)
    }

    /// Get the total number of pixels.
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Check if this is an empty buffer.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }

    /// Read the pixel at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// True when every non-transparent pixel is pure black or pure white.
    pub fn is_monochrome(&self) -> bool {
        self.pixels.chunks_exact(4).all(|px| {
            px[3] == 0 || (px[0] == px[1] && px[1] == px[2] && (px[0] == 0 || px[0] == 255))
        })
    }

    /// Flatten to 3-channel RGB for encoding.
    ///
    /// Pixels with alpha below 128 become `background`; the rest keep their
    /// color. Partial alpha is never blended, so a monochrome buffer
    /// stays monochrome after flattening.
    pub fn flatten(&self, background: Tone) -> Vec<u8> {
        let bg = background.level();
        let mut rgb = Vec::with_capacity(self.pixel_count() as usize * 3);
        for px in self.pixels.chunks_exact(4) {
            if px[3] < 128 {
                rgb.extend_from_slice(&[bg, bg, bg]);
            } else {
                rgb.extend_from_slice(&px[..3]);
            }
        }
        rgb
    }
}
