//! WASM-compatible wrapper types for export results.
//!
//! This module provides JavaScript-friendly types that wrap the core Engraver
//! types, plus the conversions of plain JS objects into core configuration.

use engraver_core::encode::EncodeOutcome;
use engraver_core::{ClassifierConfig, ExportConfig, ExportResult, ProductSpec};
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

/// A finished export for JavaScript.
///
/// # Memory Management
///
/// The JPEG bytes live in WASM memory. `bytes()` copies them into a
/// `Uint8Array`; call `free()` once the upload is done to release them early.
#[wasm_bindgen]
pub struct JsExportResult {
    inner: ExportResult,
}

#[wasm_bindgen]
impl JsExportResult {
    /// Returns the JPEG file as Uint8Array (a copy).
    pub fn bytes(&self) -> Vec<u8> {
        self.inner.bytes.clone()
    }

    /// `data:image/jpeg;base64,...` for an `<img>` preview
    #[wasm_bindgen(getter)]
    pub fn preview_data_uri(&self) -> String {
        self.inner.preview_data_uri.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn filename(&self) -> String {
        self.inner.filename.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn size_in_megabytes(&self) -> f64 {
        self.inner.size_in_megabytes
    }

    /// Size formatted for display, e.g. `12.3MB`
    #[wasm_bindgen(getter)]
    pub fn size_label(&self) -> String {
        self.inner.size_label()
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    #[wasm_bindgen(getter)]
    pub fn dpi(&self) -> u32 {
        self.inner.dpi
    }

    #[wasm_bindgen(getter)]
    pub fn quality(&self) -> f32 {
        self.inner.quality
    }

    #[wasm_bindgen(getter)]
    pub fn attempts(&self) -> u32 {
        self.inner.attempts
    }

    /// False when the file could not be brought inside the size budget
    #[wasm_bindgen(getter)]
    pub fn within_budget(&self) -> bool {
        self.inner.within_budget
    }

    #[wasm_bindgen(getter)]
    pub fn order_reference(&self) -> String {
        self.inner.order_reference.clone()
    }

    /// Fraction of opaque pixels that will be engraved
    #[wasm_bindgen(getter)]
    pub fn engraved_ratio(&self) -> f64 {
        self.inner.stats.engraved_ratio()
    }

    /// Cart line-item attributes as a plain object.
    pub fn order_attributes(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.order_attributes())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Explicitly free WASM memory.
    ///
    /// This is optional - wasm-bindgen's finalizer will handle cleanup automatically.
    pub fn free(self) {
        // Dropping self releases the memory
    }
}

impl From<ExportResult> for JsExportResult {
    fn from(inner: ExportResult) -> Self {
        Self { inner }
    }
}

/// Outcome of a standalone size-bounded encode.
#[wasm_bindgen]
pub struct JsEncodeOutcome {
    inner: EncodeOutcome,
}

#[wasm_bindgen]
impl JsEncodeOutcome {
    /// Returns the JPEG file as Uint8Array (a copy).
    pub fn bytes(&self) -> Vec<u8> {
        self.inner.bytes.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn quality(&self) -> f32 {
        self.inner.quality
    }

    #[wasm_bindgen(getter)]
    pub fn attempts(&self) -> u32 {
        self.inner.attempts
    }

    #[wasm_bindgen(getter)]
    pub fn converged(&self) -> bool {
        self.inner.converged
    }

    #[wasm_bindgen(getter)]
    pub fn size_in_megabytes(&self) -> f64 {
        self.inner.size_in_megabytes()
    }

    pub fn free(self) {}
}

impl From<EncodeOutcome> for JsEncodeOutcome {
    fn from(inner: EncodeOutcome) -> Self {
        Self { inner }
    }
}

/// Deserialize an optional plain JS object; `undefined` and `null` give `None`.
fn optional_from_js<T: DeserializeOwned>(value: JsValue, what: &str) -> Result<Option<T>, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    serde_wasm_bindgen::from_value(value)
        .map(Some)
        .map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}

/// Export configuration from a (possibly partial) JS object.
pub(crate) fn export_config_from_js(value: JsValue) -> Result<ExportConfig, JsValue> {
    let config: ExportConfig = optional_from_js(value, "export config")?.unwrap_or_default();
    config
        .validate()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(config)
}

/// Classifier thresholds from a (possibly partial) JS object.
pub(crate) fn classifier_from_js(value: JsValue) -> Result<ClassifierConfig, JsValue> {
    let config: ClassifierConfig = optional_from_js(value, "classifier config")?.unwrap_or_default();
    config
        .validate()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(config)
}

pub(crate) fn product_from_js(value: JsValue) -> Result<Option<ProductSpec>, JsValue> {
    optional_from_js(value, "product")
}
