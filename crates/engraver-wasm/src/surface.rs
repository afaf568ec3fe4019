//! Browser implementations of the design surface and timer.
//!
//! - [`JsCanvasSurface`] - a stack of `<canvas>` layers read with `getImageData`
//! - [`JsSnapshotSurface`] - a JS callback that rasterizes the whole design
//! - [`BrowserTimer`] - `setTimeout` wrapped in a promise
//!
//! Both surfaces optionally hold a render-complete promise from the map
//! renderer; capture does not start until it settles.

use std::future::Future;
use std::time::Duration;

use engraver_core::capture::{
    DesignSurface, LayerInfo, LayerKind, LayerRect, LayeredSurface, ReadbackError,
    SnapshotSurface, SurfaceSize, Timer,
};
use image::RgbaImage;
use js_sys::{Function, Promise};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

/// Name browsers give the exception thrown when reading a tainted canvas.
const SECURITY_ERROR: &str = "SecurityError";

fn readback_error(err: JsValue) -> ReadbackError {
    match err.dyn_ref::<js_sys::Error>() {
        Some(e) if String::from(e.name()) == SECURITY_ERROR => ReadbackError::Tainted,
        Some(e) => ReadbackError::Unavailable(String::from(e.message())),
        None => ReadbackError::Unavailable(format!("{:?}", err)),
    }
}

fn image_from_data(data: &ImageData) -> Result<RgbaImage, ReadbackError> {
    let (width, height) = (data.width(), data.height());
    RgbaImage::from_raw(width, height, data.data().0).ok_or_else(|| {
        ReadbackError::Unavailable(format!("ImageData does not hold {}x{} RGBA pixels", width, height))
    })
}

/// Waits for the render promise, if any. A rejected promise still counts as
/// settled; the capture that follows reports what it finds.
fn settled(id: &str, rendered: Option<&Promise>) -> impl Future<Output = ()> {
    let id = id.to_string();
    let pending = rendered.cloned().map(JsFuture::from);
    async move {
        if let Some(pending) = pending {
            if let Err(err) = pending.await {
                log::warn!("render promise for '{}' rejected: {:?}", id, err);
            }
        }
    }
}

/// `setTimeout`-backed timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserTimer;

impl Timer for BrowserTimer {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        let millis = duration.as_millis().min(i32::MAX as u128) as i32;
        let promise = Promise::new(&mut |resolve, _reject| {
            match web_sys::window() {
                Some(window) => {
                    if let Err(err) =
                        window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
                    {
                        log::error!("setTimeout failed: {:?}", err);
                    }
                }
                None => log::error!("no window; capture timeout is disabled"),
            }
        });
        async move {
            let _ = JsFuture::from(promise).await;
        }
    }
}

/// A design rendered as a stack of canvases.
///
/// # Example
///
/// ```typescript
/// const surface = new JsCanvasSurface('design', 800, 600);
/// surface.add_layer('tiles', 'baseMap', 0, 0, 800, 600, mapCanvas);
/// surface.add_layer('label', 'text', 120, 40, 300, 60, textCanvas);
/// surface.add_layer('handles', 'chrome', 0, 0, 800, 600, overlayCanvas);
/// surface.set_rendered(map.whenIdle());
/// ```
///
/// Cloning copies the layer list; the canvases themselves are shared.
#[wasm_bindgen]
#[derive(Clone)]
pub struct JsCanvasSurface {
    id: String,
    size: SurfaceSize,
    attached: bool,
    rendered: Option<Promise>,
    layers: Vec<(LayerInfo, HtmlCanvasElement)>,
}

#[wasm_bindgen]
impl JsCanvasSurface {
    /// Create a surface of `width` x `height` CSS pixels.
    #[wasm_bindgen(constructor)]
    pub fn new(id: String, width: f64, height: f64) -> JsCanvasSurface {
        JsCanvasSurface {
            id,
            size: SurfaceSize::new(width, height),
            attached: true,
            rendered: None,
            layers: Vec::new(),
        }
    }

    /// Add a layer placed at (`x`, `y`) with on-screen size `width` x `height`.
    ///
    /// `kind` is one of `baseMap`, `underlay`, `text`, `icon`, `compass` or
    /// `chrome`. Chrome layers are never read.
    #[allow(clippy::too_many_arguments)]
    pub fn add_layer(
        &mut self,
        name: String,
        kind: &str,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        canvas: HtmlCanvasElement,
    ) -> Result<(), JsValue> {
        let kind: LayerKind = kind.parse().map_err(|e: engraver_core::CaptureError| {
            JsValue::from_str(&e.to_string())
        })?;
        let info = LayerInfo::new(name, kind, LayerRect::new(x, y, width, height));
        self.layers.push((info, canvas));
        Ok(())
    }

    /// Promise that settles once the map renderer is idle.
    pub fn set_rendered(&mut self, promise: Promise) {
        self.rendered = Some(promise);
    }

    /// Mark the surface as removed from the page.
    pub fn detach(&mut self) {
        self.attached = false;
    }

    #[wasm_bindgen(getter)]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

impl DesignSurface for JsCanvasSurface {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn rendered(&self) -> impl Future<Output = ()> {
        settled(&self.id, self.rendered.as_ref())
    }
}

impl LayeredSurface for JsCanvasSurface {
    fn layers(&self) -> Vec<LayerInfo> {
        self.layers.iter().map(|(info, _)| info.clone()).collect()
    }

    fn read_layer(&self, layer: &LayerInfo) -> Result<RgbaImage, ReadbackError> {
        let canvas = self
            .layers
            .iter()
            .find(|(info, _)| info.name == layer.name)
            .map(|(_, canvas)| canvas)
            .ok_or_else(|| ReadbackError::Unavailable(format!("no layer '{}'", layer.name)))?;

        let (width, height) = (canvas.width(), canvas.height());
        if width == 0 || height == 0 {
            return Ok(RgbaImage::new(0, 0));
        }

        let context = canvas
            .get_context("2d")
            .map_err(readback_error)?
            .ok_or_else(|| ReadbackError::Unavailable("canvas has no 2d context".to_string()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| ReadbackError::Unavailable("context is not 2d".to_string()))?;

        let data = context
            .get_image_data(0.0, 0.0, width as f64, height as f64)
            .map_err(readback_error)?;
        image_from_data(&data)
    }
}

/// A design rasterized by a host callback.
///
/// `snapshot(width, height)` must synchronously return an `ImageData` of the
/// whole design at that size; `setChromeHidden(hidden)` toggles selection
/// handles and controls.
#[wasm_bindgen]
#[derive(Clone)]
pub struct JsSnapshotSurface {
    id: String,
    size: SurfaceSize,
    attached: bool,
    rendered: Option<Promise>,
    snapshot: Function,
    set_chrome_hidden: Function,
}

#[wasm_bindgen]
impl JsSnapshotSurface {
    #[wasm_bindgen(constructor)]
    pub fn new(
        id: String,
        width: f64,
        height: f64,
        snapshot: Function,
        set_chrome_hidden: Function,
    ) -> JsSnapshotSurface {
        JsSnapshotSurface {
            id,
            size: SurfaceSize::new(width, height),
            attached: true,
            rendered: None,
            snapshot,
            set_chrome_hidden,
        }
    }

    pub fn set_rendered(&mut self, promise: Promise) {
        self.rendered = Some(promise);
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }
}

impl DesignSurface for JsSnapshotSurface {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn rendered(&self) -> impl Future<Output = ()> {
        settled(&self.id, self.rendered.as_ref())
    }
}

impl SnapshotSurface for JsSnapshotSurface {
    fn set_chrome_hidden(&self, hidden: bool) {
        if let Err(err) = self
            .set_chrome_hidden
            .call1(&JsValue::NULL, &JsValue::from_bool(hidden))
        {
            log::warn!("setChromeHidden({}) failed on '{}': {:?}", hidden, self.id, err);
        }
    }

    fn snapshot(&self, width: u32, height: u32) -> Result<RgbaImage, ReadbackError> {
        let value = self
            .snapshot
            .call2(&JsValue::NULL, &JsValue::from(width), &JsValue::from(height))
            .map_err(readback_error)?;
        let data = value
            .dyn_into::<ImageData>()
            .map_err(|_| ReadbackError::Unavailable("snapshot did not return ImageData".to_string()))?;
        image_from_data(&data)
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn canvas(width: u32, height: u32, fill: &str) -> HtmlCanvasElement {
        let document = web_sys::window().unwrap().document().unwrap();
        let canvas: HtmlCanvasElement = document.create_element("canvas").unwrap().dyn_into().unwrap();
        canvas.set_width(width);
        canvas.set_height(height);
        let ctx: CanvasRenderingContext2d = canvas.get_context("2d").unwrap().unwrap().dyn_into().unwrap();
        ctx.set_fill_style_str(fill);
        ctx.fill_rect(0.0, 0.0, width as f64, height as f64);
        canvas
    }

    #[wasm_bindgen_test]
    fn test_read_layer_returns_canvas_pixels() {
        let mut surface = JsCanvasSurface::new("design".to_string(), 4.0, 4.0);
        surface
            .add_layer("tiles".to_string(), "baseMap", 0.0, 0.0, 4.0, 4.0, canvas(4, 4, "#ffffff"))
            .unwrap();
        let layer = surface.layers().remove(0);
        let image = surface.read_layer(&layer).unwrap();
        assert_eq!(image.dimensions(), (4, 4));
        assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[wasm_bindgen_test]
    fn test_unknown_layer_kind_rejected() {
        let mut surface = JsCanvasSurface::new("design".to_string(), 4.0, 4.0);
        assert!(surface
            .add_layer("x".to_string(), "sticker", 0.0, 0.0, 1.0, 1.0, canvas(1, 1, "#000"))
            .is_err());
        assert_eq!(surface.layer_count(), 0);
    }

    #[wasm_bindgen_test]
    async fn test_browser_timer_sleeps() {
        BrowserTimer.sleep(Duration::from_millis(5)).await;
    }
}
