//! Encoding pipeline for the print artifact.
//!
//! This module provides:
//! - An encode-at-quality primitive ([`QualityEncoder`]) with a JPEG implementation
//! - A size-constrained quality search that keeps the file within a megabyte budget
//!
//! # Architecture
//!
//! Every encode attempt is synchronous and CPU-bound. Attempts run strictly in
//! sequence because each quality choice depends on the previous measured size.
//!
//! # Examples
//!
//! ```ignore
//! use engraver_core::encode::{encode_within_budget, JpegQualityEncoder, SizeBudget};
//!
//! let outcome = encode_within_budget(&JpegQualityEncoder::default(), &raster, &SizeBudget::default(), 10)?;
//! println!("{:.1}MB at quality {}", outcome.size_in_megabytes(), outcome.quality);
//! ```

mod budget;
mod jpeg;

pub use budget::{
    bytes_to_megabytes, encode_within_budget, EncodeOutcome, SizeBudget, GROW_FACTOR,
    INITIAL_QUALITY, MAX_QUALITY, MIN_QUALITY, SHRINK_FACTOR,
};
pub use jpeg::{encode_jpeg, jpeg_quality, EncodeError, JpegQualityEncoder};

use crate::raster::RasterBuffer;

/// Encodes a raster at a normalized quality in (0.0, 1.0].
pub trait QualityEncoder {
    fn encode(&self, raster: &RasterBuffer, quality: f32) -> Result<Vec<u8>, EncodeError>;
}

impl<F> QualityEncoder for F
where
    F: Fn(&RasterBuffer, f32) -> Result<Vec<u8>, EncodeError>,
{
    fn encode(&self, raster: &RasterBuffer, quality: f32) -> Result<Vec<u8>, EncodeError> {
        self(raster, quality)
    }
}
