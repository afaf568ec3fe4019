//! Direct canvas-read capture.
//!
//! Reads each printable layer bitmap, rescales it to print resolution, and
//! alpha-composites the layers in z-order onto a transparent canvas. Chrome
//! layers are never read.

use image::imageops;
use image::RgbaImage;

use super::surface::LayeredSurface;
use super::types::{CaptureError, LayerInfo, PrintScale, ResampleFilter};
use super::CaptureStrategy;
use crate::raster::RasterBuffer;

/// Composites individually readable layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerCompositor {
    pub filter: ResampleFilter,
}

impl LayerCompositor {
    pub fn new(filter: ResampleFilter) -> Self {
        Self { filter }
    }
}

/// One layer edge in print pixels, snapped outward the same way
/// [`print_pixels`](super::print_pixels) sizes the canvas.
fn print_edge(on_screen: f64, factor: f64, round_up: bool) -> i64 {
    let exact = on_screen * factor;
    let nearest = exact.round();
    let snapped = if (exact - nearest).abs() < 1e-6 {
        nearest
    } else if round_up {
        exact.ceil()
    } else {
        exact.floor()
    };
    snapped as i64
}

/// Destination rectangle of a layer in print pixels: (x, y, width, height).
///
/// Edges are mapped independently, so a layer whose bounds reach the edge of
/// the surface reaches the edge of the canvas.
fn print_rect(layer: &LayerInfo, scale: &PrintScale) -> (i64, i64, u32, u32) {
    let b = &layer.bounds;
    let x0 = print_edge(b.x, scale.factor, false);
    let y0 = print_edge(b.y, scale.factor, false);
    let x1 = print_edge(b.x + b.width, scale.factor, true).max(x0 + 1);
    let y1 = print_edge(b.y + b.height, scale.factor, true).max(y0 + 1);
    (x0, y0, (x1 - x0) as u32, (y1 - y0) as u32)
}

impl<S> CaptureStrategy<S> for LayerCompositor
where
    S: LayeredSurface + ?Sized,
{
    fn rasterize(&self, surface: &S, scale: &PrintScale) -> Result<RasterBuffer, CaptureError> {
        let mut layers: Vec<LayerInfo> = surface
            .layers()
            .into_iter()
            .filter(|layer| layer.kind.is_printable() && !layer.bounds.is_empty())
            .collect();
        // Stable: document order is kept within one kind
        layers.sort_by_key(|layer| layer.kind.z_order());

        let mut canvas = RgbaImage::new(scale.width, scale.height);

        for layer in &layers {
            let bitmap = surface
                .read_layer(layer)
                .map_err(|e| e.into_capture_error(&layer.name))?;
            if bitmap.width() == 0 || bitmap.height() == 0 {
                log::debug!("skipping empty bitmap for layer '{}'", layer.name);
                continue;
            }

            let (x, y, w, h) = print_rect(layer, scale);
            let scaled = if bitmap.dimensions() == (w, h) {
                bitmap
            } else {
                imageops::resize(&bitmap, w, h, self.filter.to_image_filter())
            };
            imageops::overlay(&mut canvas, &scaled, x, y);
        }

        log::debug!(
            "composited {} layers into {}x{} at {} dpi",
            layers.len(),
            scale.width,
            scale.height,
            scale.dpi
        );
        Ok(RasterBuffer::from_rgba_image(canvas))
    }
}
