//! DOM-rasterize capture.
//!
//! Hides interactive chrome, asks the surface for one snapshot of everything
//! visible at print resolution, then restores the chrome. Snapshots that come
//! back at a slightly different size are resampled to the exact print size.

use image::imageops;

use super::surface::SnapshotSurface;
use super::types::{CaptureError, PrintScale, ResampleFilter};
use super::CaptureStrategy;
use crate::raster::RasterBuffer;

/// Rasterizes the whole surface in one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotRasterizer {
    pub filter: ResampleFilter,
}

impl SnapshotRasterizer {
    pub fn new(filter: ResampleFilter) -> Self {
        Self { filter }
    }
}

/// Keeps chrome hidden for its lifetime; restores it on drop, including on
/// early return and panic.
struct ChromeGuard<'a, S: SnapshotSurface + ?Sized> {
    surface: &'a S,
}

impl<'a, S: SnapshotSurface + ?Sized> ChromeGuard<'a, S> {
    fn hide(surface: &'a S) -> Self {
        surface.set_chrome_hidden(true);
        Self { surface }
    }
}

impl<S: SnapshotSurface + ?Sized> Drop for ChromeGuard<'_, S> {
    fn drop(&mut self) {
        self.surface.set_chrome_hidden(false);
    }
}

impl<S> CaptureStrategy<S> for SnapshotRasterizer
where
    S: SnapshotSurface + ?Sized,
{
    fn rasterize(&self, surface: &S, scale: &PrintScale) -> Result<RasterBuffer, CaptureError> {
        let snapshot = {
            let _chrome = ChromeGuard::hide(surface);
            surface
                .snapshot(scale.width, scale.height)
                .map_err(|e| e.into_capture_error(surface.id()))?
        };

        if snapshot.width() == 0 || snapshot.height() == 0 {
            return Err(CaptureError::Layer {
                layer: surface.id().to_string(),
                reason: "snapshot is empty".to_string(),
            });
        }

        let snapshot = if snapshot.dimensions() == (scale.width, scale.height) {
            snapshot
        } else {
            log::debug!(
                "resampling {}x{} snapshot to {}x{}",
                snapshot.width(),
                snapshot.height(),
                scale.width,
                scale.height
            );
            imageops::resize(
                &snapshot,
                scale.width,
                scale.height,
                self.filter.to_image_filter(),
            )
        };

        Ok(RasterBuffer::from_rgba_image(snapshot))
    }
}
