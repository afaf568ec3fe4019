//! Monochrome conversion of a captured raster.
//!
//! Applies [`classify_pixel`] to every pixel of a [`RasterBuffer`] in place.
//! No pixel depends on another, so iteration order does not matter, and the
//! pass is idempotent because both terminal tones classify to themselves.

use serde::Serialize;

use crate::classify::{classify_pixel, ClassifierConfig};
use crate::raster::RasterBuffer;

/// Pixel counts after a conversion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonochromeStats {
    pub black: u64,
    pub white: u64,
    pub transparent: u64,
}

impl MonochromeStats {
    /// Fraction of opaque pixels that will be engraved.
    pub fn engraved_ratio(&self) -> f64 {
        let opaque = self.black + self.white;
        if opaque == 0 {
            return 0.0;
        }
        self.black as f64 / opaque as f64
    }
}

/// Convert RGBA pixel data to pure black and white in place.
///
/// # Arguments
/// * `pixels` - RGBA pixel data (4 bytes per pixel, row-major order)
/// * `config` - Classifier thresholds
///
/// Trailing bytes that do not form a whole pixel are left untouched.
pub fn convert_pixels(pixels: &mut [u8], config: &ClassifierConfig) -> MonochromeStats {
    let mut stats = MonochromeStats::default();

    for chunk in pixels.chunks_exact_mut(4) {
        let out = classify_pixel([chunk[0], chunk[1], chunk[2], chunk[3]], config);
        chunk.copy_from_slice(&out);

        if out[3] == 0 {
            stats.transparent += 1;
        } else if out[0] == 0 {
            stats.black += 1;
        } else {
            stats.white += 1;
        }
    }

    stats
}

/// Convert a whole raster to monochrome in place.
pub fn convert_to_monochrome(raster: &mut RasterBuffer, config: &ClassifierConfig) -> MonochromeStats {
    let stats = convert_pixels(&mut raster.pixels, config);
    log::debug!(
        "monochrome pass on {}x{}: {} black, {} white, {} transparent",
        raster.width,
        raster.height,
        stats.black,
        stats.white,
        stats.transparent
    );
    stats
}
