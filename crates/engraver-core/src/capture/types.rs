//! Core types for design capture.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Screen resolution that on-screen CSS pixels are defined against.
pub const REFERENCE_SCREEN_DPI: u32 = 96;

/// Error types for capture operations.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The surface never signalled render completion.
    #[error("Design surface did not finish rendering within {waited_ms}ms")]
    Timeout { waited_ms: u64 },

    /// A layer's pixels cannot be read back (cross-origin taint).
    #[error("Layer '{layer}' could not be read back; ensure the map is fully loaded")]
    Permission { layer: String },

    /// No surface attached, or the surface has no area.
    #[error("Invalid surface state: {0}")]
    InvalidSurface(String),

    /// A layer failed to produce pixels for a reason other than taint.
    #[error("Layer '{layer}' could not be rasterized: {reason}")]
    Layer { layer: String, reason: String },
}

/// Why a layer could not be read back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadbackError {
    /// The pixel source is cross-origin and the canvas is tainted.
    #[error("pixel data is cross-origin tainted")]
    Tainted,

    /// The pixel source is not available.
    #[error("{0}")]
    Unavailable(String),
}

impl ReadbackError {
    /// Attach the layer name, turning taint into a permission failure.
    pub fn into_capture_error(self, layer: &str) -> CaptureError {
        match self {
            ReadbackError::Tainted => CaptureError::Permission {
                layer: layer.to_string(),
            },
            ReadbackError::Unavailable(reason) => CaptureError::Layer {
                layer: layer.to_string(),
                reason,
            },
        }
    }
}

/// On-screen size of the design surface, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

impl SurfaceSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when either side is zero, negative, or not a number.
    pub fn is_empty(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0)
    }
}

/// Scale one on-screen length to print pixels, rounding up.
///
/// Results within 1e-6 of a whole number are treated as exact so float noise
/// never adds a pixel.
pub fn print_pixels(on_screen: f64, dpi: u32) -> u32 {
    let exact = on_screen * dpi as f64 / REFERENCE_SCREEN_DPI as f64;
    let nearest = exact.round();
    let scaled = if (exact - nearest).abs() < 1e-6 {
        nearest
    } else {
        exact.ceil()
    };
    scaled.clamp(0.0, u32::MAX as f64) as u32
}

/// The mapping from on-screen pixels to print pixels for one capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintScale {
    /// Target print resolution.
    pub dpi: u32,
    /// `dpi / 96`, applied to both axes.
    pub factor: f64,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
}

impl PrintScale {
    pub fn new(size: SurfaceSize, dpi: u32) -> Self {
        Self {
            dpi,
            factor: dpi as f64 / REFERENCE_SCREEN_DPI as f64,
            width: print_pixels(size.width, dpi),
            height: print_pixels(size.height, dpi),
        }
    }
}

/// What a visual layer of the design surface depicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayerKind {
    /// Map tiles.
    BaseMap,
    /// Decorative frames and textures under the user content.
    Underlay,
    Text,
    Icon,
    Compass,
    /// Selection handles, zoom controls, resize affordances.
    Chrome,
}

impl LayerKind {
    /// Compositing position; lower values are drawn first.
    pub fn z_order(self) -> u8 {
        match self {
            LayerKind::BaseMap => 0,
            LayerKind::Underlay => 1,
            LayerKind::Text => 2,
            LayerKind::Icon => 3,
            LayerKind::Compass => 4,
            LayerKind::Chrome => 5,
        }
    }

    /// Whether this layer may appear in the print artifact.
    pub fn is_printable(self) -> bool {
        !matches!(self, LayerKind::Chrome)
    }
}

impl std::str::FromStr for LayerKind {
    type Err = CaptureError;

    /// Parse the camelCase name used by hosts (`baseMap`, `compass`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baseMap" => Ok(LayerKind::BaseMap),
            "underlay" => Ok(LayerKind::Underlay),
            "text" => Ok(LayerKind::Text),
            "icon" => Ok(LayerKind::Icon),
            "compass" => Ok(LayerKind::Compass),
            "chrome" => Ok(LayerKind::Chrome),
            other => Err(CaptureError::InvalidSurface(format!(
                "unknown layer kind '{other}'"
            ))),
        }
    }
}

/// A rectangle in on-screen CSS pixels, relative to the surface origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LayerRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// A layer as enumerated by the surface, before its pixels are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    /// Human-readable name used in error messages.
    pub name: String,
    pub kind: LayerKind,
    /// Placement on screen.
    pub bounds: LayerRect,
}

impl LayerInfo {
    pub fn new(name: impl Into<String>, kind: LayerKind, bounds: LayerRect) -> Self {
        Self {
            name: name.into(),
            kind,
            bounds,
        }
    }
}

/// Filter used when rescaling layer bitmaps to print resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleFilter {
    /// Nearest neighbor (keeps hard edges, blocky upscales).
    Nearest,
    /// Bilinear interpolation.
    #[default]
    Bilinear,
    /// Lanczos3 interpolation (sharpest, slowest).
    Lanczos3,
}

impl ResampleFilter {
    /// Convert to the image crate's FilterType.
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            ResampleFilter::Nearest => image::imageops::FilterType::Nearest,
            ResampleFilter::Bilinear => image::imageops::FilterType::Triangle,
            ResampleFilter::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}
