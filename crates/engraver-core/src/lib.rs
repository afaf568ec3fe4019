//! Engraver Core - Print-ready export pipeline
//!
//! This crate turns a live, multi-layer map design into a single monochrome
//! JPEG that a laser engraver can consume: captured at an exact DPI, reduced
//! to pure black and white, and encoded within a megabyte budget.
//!
//! The pipeline is host-agnostic. The browser (or a test) supplies the design
//! surface and a timer through the traits in [`capture`].

pub mod capture;
pub mod classify;
pub mod config;
pub mod encode;
pub mod export;
pub mod luminance;
pub mod monochrome;
pub mod raster;

#[cfg(test)]
pub(crate) mod testing;

pub use capture::{
    CaptureError, CaptureStrategy, DesignSurface, LayerCompositor, LayeredSurface,
    SnapshotRasterizer, SnapshotSurface, Timer,
};
pub use classify::{classify_pixel, ClassifierConfig, Tone};
pub use config::{ConfigError, ExportConfig};
pub use encode::{encode_within_budget, EncodeError, EncodeOutcome, SizeBudget};
pub use export::{
    export_filename, ExportError, ExportRequest, ExportResult, Exporter, OrderAttributes,
    PersistRequest, ProductSpec,
};
pub use monochrome::{convert_to_monochrome, MonochromeStats};
pub use raster::RasterBuffer;
