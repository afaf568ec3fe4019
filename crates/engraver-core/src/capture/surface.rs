//! Interfaces the host UI implements so the pipeline can read its design.
//!
//! The pipeline only ever borrows a surface for the duration of one export;
//! ownership stays with the UI layer.

use std::future::Future;
use std::time::Duration;

use super::types::{LayerInfo, ReadbackError, SurfaceSize};

/// The live, interactive rendering of the user's design.
pub trait DesignSurface {
    /// Stable identifier, used to refuse concurrent exports of one surface.
    fn id(&self) -> &str;

    /// Whether the surface is still attached to the page.
    fn is_attached(&self) -> bool {
        true
    }

    /// Current on-screen size in CSS pixels.
    fn size(&self) -> SurfaceSize;

    /// Resolves once tiles, fonts and images have finished loading.
    fn rendered(&self) -> impl Future<Output = ()>;
}

/// A surface made of individually readable bitmap layers (direct canvas read).
pub trait LayeredSurface: DesignSurface {
    /// All visual layers, in document order, including chrome.
    fn layers(&self) -> Vec<LayerInfo>;

    /// Read one layer's pixels at its native resolution.
    fn read_layer(&self, layer: &LayerInfo) -> Result<image::RgbaImage, ReadbackError>;
}

/// A surface that can rasterize its whole visible tree at once (DOM rasterize).
pub trait SnapshotSurface: DesignSurface {
    /// Hide or restore interactive-only elements.
    fn set_chrome_hidden(&self, hidden: bool);

    /// Rasterize everything visible at the given pixel size.
    fn snapshot(&self, width: u32, height: u32) -> Result<image::RgbaImage, ReadbackError>;
}

/// Source of delays for the render timeout, provided by the host's event loop.
pub trait Timer {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}
