//! Export pipeline WASM bindings.
//!
//! # Example
//!
//! ```typescript
//! import { JsExporter, JsCanvasSurface, init_logging } from '@engraver/wasm';
//!
//! init_logging('info');
//! const exporter = new JsExporter({ target_dpi: 300 });
//!
//! const surface = new JsCanvasSurface('design', 800, 600);
//! // ... add_layer / set_rendered
//! try {
//!   const result = await exporter.export_canvas_layers(surface, cart.orderId, product);
//!   await upload(result.bytes(), result.filename);
//!   await cart.addAttributes(result.order_attributes());
//! } catch (message) {
//!   showError(message);
//! }
//! ```

use std::rc::Rc;

use chrono::{DateTime, Utc};
use engraver_core::{
    export_filename as core_export_filename, ExportConfig, ExportRequest, Exporter,
    LayerCompositor, SnapshotRasterizer,
};
use js_sys::Promise;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::surface::{BrowserTimer, JsCanvasSurface, JsSnapshotSurface};
use crate::types::{export_config_from_js, product_from_js, JsExportResult};

fn timestamp(millis: f64) -> Result<DateTime<Utc>, JsValue> {
    DateTime::from_timestamp_millis(millis as i64)
        .ok_or_else(|| JsValue::from_str(&format!("Timestamp {} is out of range", millis)))
}

/// Name of the exported file for an order placed at `requested_at_ms`
/// (milliseconds since the epoch, as from `Date.now()`).
#[wasm_bindgen]
pub fn export_filename(order_identifier: Option<String>, requested_at_ms: f64) -> Result<String, JsValue> {
    Ok(core_export_filename(
        order_identifier.as_deref(),
        timestamp(requested_at_ms)?,
    ))
}

/// Runs exports for one customizer page.
///
/// Keep a single instance per page: it rejects a second export of a surface
/// while the first is still waiting for the map to render.
#[wasm_bindgen]
pub struct JsExporter {
    config: ExportConfig,
    layered: Rc<Exporter<LayerCompositor>>,
    snapshot: Rc<Exporter<SnapshotRasterizer>>,
}

#[wasm_bindgen]
impl JsExporter {
    /// Create an exporter from an optional, possibly partial, config object.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<JsExporter, JsValue> {
        let config = export_config_from_js(config)?;
        Ok(JsExporter {
            layered: Rc::new(Exporter::layered(&config)),
            snapshot: Rc::new(Exporter::snapshot(&config)),
            config,
        })
    }

    /// Export a canvas-layer surface. Resolves to a `JsExportResult`; rejects
    /// with an error message.
    ///
    /// The surface is only borrowed: the export works on its layers as they
    /// stand when the call is made, and the same surface can be exported again.
    pub fn export_canvas_layers(
        &self,
        surface: &JsCanvasSurface,
        order_identifier: Option<String>,
        product: JsValue,
    ) -> Result<Promise, JsValue> {
        let request = self.request(order_identifier, product)?;
        let surface = surface.clone();
        let exporter = Rc::clone(&self.layered);
        Ok(future_to_promise(async move {
            exporter
                .export(&surface, &BrowserTimer, &request)
                .await
                .map(|result| JsValue::from(JsExportResult::from(result)))
                .map_err(|e| JsValue::from_str(&e.to_string()))
        }))
    }

    /// Export a surface rasterized by a host snapshot callback. Borrows the
    /// surface like [`export_canvas_layers`](Self::export_canvas_layers).
    pub fn export_snapshot(
        &self,
        surface: &JsSnapshotSurface,
        order_identifier: Option<String>,
        product: JsValue,
    ) -> Result<Promise, JsValue> {
        let request = self.request(order_identifier, product)?;
        let surface = surface.clone();
        let exporter = Rc::clone(&self.snapshot);
        Ok(future_to_promise(async move {
            exporter
                .export(&surface, &BrowserTimer, &request)
                .await
                .map(|result| JsValue::from(JsExportResult::from(result)))
                .map_err(|e| JsValue::from_str(&e.to_string()))
        }))
    }

    /// Whether an export of the surface `surface_id` is still running.
    pub fn is_exporting(&self, surface_id: &str) -> bool {
        self.layered.is_exporting(surface_id) || self.snapshot.is_exporting(surface_id)
    }

    #[wasm_bindgen(getter)]
    pub fn target_dpi(&self) -> u32 {
        self.config.target_dpi
    }
}

impl JsExporter {
    fn request(&self, order_identifier: Option<String>, product: JsValue) -> Result<ExportRequest, JsValue> {
        let mut request = self
            .config
            .request(order_identifier, timestamp(js_sys::Date::now())?);
        request.product = product_from_js(product)?;
        Ok(request)
    }
}
