//! Capture of the live design surface at print resolution.
//!
//! This module provides:
//! - The interfaces a host UI implements ([`DesignSurface`] and its
//!   [`LayeredSurface`] / [`SnapshotSurface`] capabilities)
//! - The render-completion barrier with a bounded timeout
//! - Two interchangeable capture strategies behind [`CaptureStrategy`]:
//!   [`LayerCompositor`] (direct canvas read) and [`SnapshotRasterizer`]
//!   (DOM rasterize)
//!
//! # Capture Order
//!
//! 1. Validate the surface (attached, non-zero area)
//! 2. Await render completion (the pipeline's only suspension point)
//! 3. Rasterize at `dpi / 96` scale with chrome excluded
//!
//! Layers are composited bottom to top: base map, underlays, text, icons,
//! compass.

mod barrier;
mod compositor;
mod snapshot;
mod surface;
mod types;

use std::time::Duration;

pub use barrier::wait_for_render;
pub use compositor::LayerCompositor;
pub use snapshot::SnapshotRasterizer;
pub use surface::{DesignSurface, LayeredSurface, SnapshotSurface, Timer};
pub use types::{
    print_pixels, CaptureError, LayerInfo, LayerKind, LayerRect, PrintScale, ReadbackError,
    ResampleFilter, SurfaceSize, REFERENCE_SCREEN_DPI,
};

use crate::raster::RasterBuffer;

/// A way of turning a rendered surface into a raster at print scale.
pub trait CaptureStrategy<S: ?Sized> {
    /// Produce a raster of exactly `scale.width` x `scale.height` pixels.
    fn rasterize(&self, surface: &S, scale: &PrintScale) -> Result<RasterBuffer, CaptureError>;
}

/// Check that a surface can be captured and return its on-screen size.
pub fn validate_surface<S>(surface: &S) -> Result<SurfaceSize, CaptureError>
where
    S: DesignSurface + ?Sized,
{
    if !surface.is_attached() {
        return Err(CaptureError::InvalidSurface(format!(
            "surface '{}' is not attached",
            surface.id()
        )));
    }
    let size = surface.size();
    if size.is_empty() {
        return Err(CaptureError::InvalidSurface(format!(
            "surface '{}' has zero area ({}x{})",
            surface.id(),
            size.width,
            size.height
        )));
    }
    Ok(size)
}

/// Capture everything visible on `surface` at `target_dpi`.
///
/// # Errors
///
/// - [`CaptureError::InvalidSurface`] if the surface is detached or has no area
/// - [`CaptureError::Timeout`] if rendering does not complete within `timeout`
/// - [`CaptureError::Permission`] if a layer cannot be read back
pub async fn capture<S, C, T>(
    surface: &S,
    strategy: &C,
    timer: &T,
    target_dpi: u32,
    timeout: Duration,
) -> Result<RasterBuffer, CaptureError>
where
    S: DesignSurface + ?Sized,
    C: CaptureStrategy<S> + ?Sized,
    T: Timer + ?Sized,
{
    validate_surface(surface)?;
    wait_for_render(surface, timer, timeout).await?;

    // Layout may settle while tiles load, so measure after the barrier
    let size = validate_surface(surface)?;
    let scale = PrintScale::new(size, target_dpi);
    if scale.width == 0 || scale.height == 0 {
        return Err(CaptureError::InvalidSurface(format!(
            "{} dpi yields an empty {}x{} raster",
            target_dpi, scale.width, scale.height
        )));
    }

    let raster = strategy.rasterize(surface, &scale)?;
    debug_assert_eq!((raster.width, raster.height), (scale.width, scale.height));
    log::debug!(
        "captured '{}' ({}x{} css px) as {}x{} at {} dpi",
        surface.id(),
        size.width,
        size.height,
        raster.width,
        raster.height,
        target_dpi
    );
    Ok(raster)
}
