//! Engraver WASM - WebAssembly bindings for Engraver
//!
//! This crate exposes the engraver-core export pipeline to the product
//! customizer running in the browser.
//!
//! # Module Structure
//!
//! - `classify` - Pixel classification and in-place monochrome conversion
//! - `encode` - Size-bounded JPEG encoding
//! - `export` - The full export pipeline (`JsExporter`) and file naming
//! - `surface` - Canvas-stack and snapshot-callback design surfaces
//! - `logger` - Console logging for the core crate
//! - `types` - WASM-compatible wrapper types for results
//!
//! # Usage
//!
//! ```typescript
//! import init, { JsExporter, JsCanvasSurface } from '@engraver/wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//!
//! const exporter = new JsExporter();
//! const result = await exporter.export_canvas_layers(surface, 'Order1001');
//! console.log(`${result.filename}: ${result.size_label}`);
//! ```

use wasm_bindgen::prelude::*;

mod classify;
mod encode;
mod export;
mod logger;
mod surface;
mod types;

// Re-export public types
pub use classify::{classify_pixel, convert_to_monochrome};
pub use encode::encode_within_budget;
pub use export::{export_filename, JsExporter};
pub use logger::init_logging;
pub use surface::{BrowserTimer, JsCanvasSurface, JsSnapshotSurface};
pub use types::{JsEncodeOutcome, JsExportResult};

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    log::debug!("engraver-wasm {} loaded", version());
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
