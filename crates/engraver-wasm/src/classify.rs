//! Monochrome classification WASM bindings.
//!
//! # Example
//!
//! ```typescript
//! import { classify_pixel, convert_to_monochrome } from '@engraver/wasm';
//!
//! classify_pixel(10, 10, 200, 255);            // [0, 0, 0, 255] (water)
//!
//! const data = ctx.getImageData(0, 0, w, h).data; // RGBA, converted in place
//! const stats = convert_to_monochrome(data, { threshold: 140 });
//! console.log(`${stats.black} pixels will be engraved`);
//! ```

use engraver_core::monochrome::convert_pixels;
use wasm_bindgen::prelude::*;

use crate::types::classifier_from_js;

/// Classify one RGBA pixel as pure black or white.
///
/// `config` is an optional object overriding classifier thresholds. Fully
/// transparent pixels are returned unchanged.
#[wasm_bindgen]
pub fn classify_pixel(r: u8, g: u8, b: u8, a: u8, config: JsValue) -> Result<Vec<u8>, JsValue> {
    let config = classifier_from_js(config)?;
    Ok(engraver_core::classify_pixel([r, g, b, a], &config).to_vec())
}

/// Convert RGBA pixel data to pure black and white in place.
///
/// Returns `{ black, white, transparent }` pixel counts.
///
/// # Errors
///
/// Returns an error if the buffer is not a whole number of RGBA pixels or the
/// config object is malformed.
#[wasm_bindgen]
pub fn convert_to_monochrome(pixels: &mut [u8], config: JsValue) -> Result<JsValue, JsValue> {
    if pixels.len() % 4 != 0 {
        return Err(JsValue::from_str(&format!(
            "RGBA data length {} is not a multiple of 4",
            pixels.len()
        )));
    }
    let config = classifier_from_js(config)?;
    let stats = convert_pixels(pixels, &config);
    serde_wasm_bindgen::to_value(&stats).map_err(|e| JsValue::from_str(&e.to_string()))
}
