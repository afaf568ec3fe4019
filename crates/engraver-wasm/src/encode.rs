//! Size-bounded encoding WASM bindings.
//!
//! Exposes the quality search on its own, for callers that capture and
//! convert pixels themselves.
//!
//! # Example
//!
//! ```typescript
//! import { encode_within_budget } from '@engraver/wasm';
//!
//! const outcome = encode_within_budget(rgba, width, height, 8, 15, 30, 10);
//! if (!outcome.converged) {
//!   console.warn(`closest file is ${outcome.size_in_megabytes.toFixed(1)}MB`);
//! }
//! ```

use engraver_core::encode::{self, JpegQualityEncoder, SizeBudget};
use engraver_core::RasterBuffer;
use wasm_bindgen::prelude::*;

use crate::types::JsEncodeOutcome;

/// Check that `pixels` holds exactly `width * height` RGBA pixels.
fn raster_from_rgba(pixels: Vec<u8>, width: u32, height: u32) -> Result<RasterBuffer, String> {
    let expected = width as usize * height as usize * 4;
    if pixels.len() != expected {
        return Err(format!(
            "Invalid pixel data: expected {} bytes for {}x{} RGBA, got {}",
            expected,
            width,
            height,
            pixels.len()
        ));
    }
    Ok(RasterBuffer::new(width, height, pixels))
}

/// Encode RGBA pixels as JPEG, searching for a quality whose file size lies
/// within `[min_mb, max_mb]` megabytes.
///
/// Transparent pixels print as white. Failing to reach the budget is not an
/// error: the closest candidate comes back with `converged == false`.
///
/// # Errors
///
/// Returns an error if the pixel data does not match the dimensions, the
/// budget is not ordered, or the JPEG encoder fails.
#[wasm_bindgen]
pub fn encode_within_budget(
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    min_mb: f64,
    target_mb: f64,
    max_mb: f64,
    max_attempts: u32,
) -> Result<JsEncodeOutcome, JsValue> {
    let raster = raster_from_rgba(pixels, width, height).map_err(|e| JsValue::from_str(&e))?;
    let budget = SizeBudget::new(min_mb, target_mb, max_mb);
    if !budget.is_ordered() {
        return Err(JsValue::from_str(&format!(
            "Size budget must satisfy min <= target <= max, got {}/{}/{} MB",
            min_mb, target_mb, max_mb
        )));
    }

    encode::encode_within_budget(&JpegQualityEncoder::default(), &raster, &budget, max_attempts)
        .map(JsEncodeOutcome::from)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_from_rgba_checks_length() {
        assert!(raster_from_rgba(vec![0; 16], 2, 2).is_ok());
        let err = raster_from_rgba(vec![0; 12], 2, 2).unwrap_err();
        assert!(err.contains("expected 16 bytes"));
    }

    #[test]
    fn test_core_search_on_wasm_raster() {
        let raster = raster_from_rgba(vec![255; 8 * 8 * 4], 8, 8).unwrap();
        let outcome = encode::encode_within_budget(
            &JpegQualityEncoder::default(),
            &raster,
            &SizeBudget::new(0.0, 0.5, 1.0),
            10,
        )
        .unwrap();
        assert!(outcome.converged);
        assert_eq!(&outcome.bytes[0..2], &[0xFF, 0xD8]);
    }
}
