//! The export pipeline: capture, convert, encode, name.
//!
//! [`Exporter`] runs the stages strictly in sequence for one surface and
//! returns either a complete [`ExportResult`] or a single [`ExportError`].
//! Nothing is persisted here; uploading the bytes is the caller's job.
//!
//! ```text
//! surface -> capture (await render) -> monochrome -> size-bounded JPEG -> result
//! ```

mod attributes;
mod filename;

use std::cell::RefCell;
use std::collections::HashSet;
use std::time::Duration;

use base64::Engine;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use attributes::{OrderAttributes, PersistRequest, ProductSpec};
pub use filename::{export_filename, generated_order_id, resolve_order, sanitized_timestamp};

use crate::capture::{
    capture, CaptureError, CaptureStrategy, DesignSurface, LayerCompositor, SnapshotRasterizer,
    Timer,
};
use crate::classify::ClassifierConfig;
use crate::config::{ExportConfig, MAX_DPI, MIN_DPI};
use crate::encode::{
    bytes_to_megabytes, encode_within_budget, EncodeError, JpegQualityEncoder, QualityEncoder,
    SizeBudget,
};
use crate::monochrome::{convert_to_monochrome, MonochromeStats};

/// MIME type of the exported file.
pub const MIME_TYPE: &str = "image/jpeg";

/// Error types for the export pipeline.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("The design did not finish rendering within {waited_ms}ms; please try again")]
    CaptureTimeout { waited_ms: u64 },

    #[error("Layer '{layer}' could not be read back; ensure the map is fully loaded and try again")]
    CapturePermission { layer: String },

    #[error("Invalid surface state: {0}")]
    InvalidSurfaceState(String),

    #[error("Capture failed: {0}")]
    Capture(#[source] CaptureError),

    #[error("An export is already running for surface '{0}'")]
    ExportInProgress(String),

    #[error("Invalid export request: {0}")]
    InvalidRequest(String),

    #[error("Encoding failed: {0}")]
    Encode(#[from] EncodeError),
}

impl ExportError {
    /// Whether trying the same export again later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExportError::CaptureTimeout { .. } | ExportError::ExportInProgress(_)
        )
    }
}

impl From<CaptureError> for ExportError {
    fn from(e: CaptureError) -> Self {
        match e {
            CaptureError::Timeout { waited_ms } => ExportError::CaptureTimeout { waited_ms },
            CaptureError::Permission { layer } => ExportError::CapturePermission { layer },
            CaptureError::InvalidSurface(reason) => ExportError::InvalidSurfaceState(reason),
            other => ExportError::Capture(other),
        }
    }
}

/// Parameters of one export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub target_dpi: u32,
    pub size_budget: SizeBudget,
    /// Order to name the file after; blank means none.
    pub order_identifier: Option<String>,
    /// When the export was requested; names unordered exports.
    pub requested_at: DateTime<Utc>,
    /// Forwarded into the cart metadata.
    pub product: Option<ProductSpec>,
}

impl ExportRequest {
    /// A request with the default resolution and size budget.
    pub fn new(requested_at: DateTime<Utc>) -> Self {
        ExportConfig::default().request(None, requested_at)
    }

    pub fn with_order(mut self, identifier: impl Into<String>) -> Self {
        self.order_identifier = Some(identifier.into());
        self
    }

    pub fn with_product(mut self, product: ProductSpec) -> Self {
        self.product = Some(product);
        self
    }

    fn validate(&self) -> Result<(), ExportError> {
        if !(MIN_DPI..=MAX_DPI).contains(&self.target_dpi) {
            return Err(ExportError::InvalidRequest(format!(
                "target DPI {} is outside {}-{}",
                self.target_dpi, MIN_DPI, MAX_DPI
            )));
        }
        if !self.size_budget.is_ordered() {
            return Err(ExportError::InvalidRequest(format!(
                "size budget {}/{}/{} MB is not ordered",
                self.size_budget.min, self.size_budget.target, self.size_budget.max
            )));
        }
        Ok(())
    }
}

/// A finished export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportResult {
    /// JPEG file content.
    pub bytes: Vec<u8>,
    /// `data:image/jpeg;base64,...` for on-page preview.
    pub preview_data_uri: String,
    pub filename: String,
    /// `bytes.len()` in megabytes (1 MB = 1024 * 1024 bytes).
    pub size_in_megabytes: f64,
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
    /// JPEG quality (0.0-1.0) the bytes were encoded at.
    pub quality: f32,
    pub attempts: u32,
    /// False when the size search ran out and this is the closest candidate.
    pub within_budget: bool,
    pub stats: MonochromeStats,
    /// The caller's order identifier, or the generated one.
    pub order_reference: String,
    pub product: Option<ProductSpec>,
}

impl ExportResult {
    /// Size as shown to shoppers, e.g. `12.3MB`.
    pub fn size_label(&self) -> String {
        format!("{:.1}MB", self.size_in_megabytes)
    }

    pub fn order_attributes(&self) -> OrderAttributes {
        let product = self.product.clone().unwrap_or_default();
        OrderAttributes {
            filename: self.filename.clone(),
            file_size: self.size_label(),
            dimensions: format!("{}x{}", self.width, self.height),
            dpi: self.dpi,
            shape: product.shape,
            material: product.material,
            size: product.size,
        }
    }

    pub fn persist_request(&self) -> PersistRequest {
        PersistRequest {
            bytes: self.bytes.clone(),
            filename: self.filename.clone(),
            order_identifier: self.order_reference.clone(),
        }
    }
}

/// Wrap encoded JPEG bytes in a data URI.
pub fn preview_data_uri(bytes: &[u8]) -> String {
    format!(
        "data:{MIME_TYPE};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Marks a surface as exporting until dropped.
struct InFlight<'a> {
    surfaces: &'a RefCell<HashSet<String>>,
    id: String,
}

impl<'a> InFlight<'a> {
    fn acquire(surfaces: &'a RefCell<HashSet<String>>, id: &str) -> Option<Self> {
        if !surfaces.borrow_mut().insert(id.to_string()) {
            return None;
        }
        Some(Self {
            surfaces,
            id: id.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.surfaces.borrow_mut().remove(&self.id);
    }
}

/// Runs exports with one capture strategy and one encoder.
///
/// An exporter is meant to live as long as the customizer page. It remembers
/// which surfaces have an export in flight and rejects overlapping exports of
/// the same surface.
pub struct Exporter<C, E = JpegQualityEncoder> {
    strategy: C,
    encoder: E,
    classifier: ClassifierConfig,
    capture_timeout: Duration,
    max_attempts: u32,
    in_flight: RefCell<HashSet<String>>,
}

impl Exporter<LayerCompositor> {
    /// Exporter that composites individually readable layers.
    pub fn layered(config: &ExportConfig) -> Self {
        Self::new(LayerCompositor::new(config.resample), config)
    }
}

impl Exporter<SnapshotRasterizer> {
    /// Exporter that rasterizes the whole surface in one snapshot.
    pub fn snapshot(config: &ExportConfig) -> Self {
        Self::new(SnapshotRasterizer::new(config.resample), config)
    }
}

impl<C> Exporter<C> {
    pub fn new(strategy: C, config: &ExportConfig) -> Self {
        let encoder = JpegQualityEncoder {
            background: config.background,
        };
        Exporter::with_encoder(strategy, encoder, config)
    }
}

impl<C, E> Exporter<C, E> {
    pub fn with_encoder(strategy: C, encoder: E, config: &ExportConfig) -> Self {
        Self {
            strategy,
            encoder,
            classifier: config.classifier,
            capture_timeout: config.capture_timeout(),
            max_attempts: config.max_attempts,
            in_flight: RefCell::new(HashSet::new()),
        }
    }

    /// Whether an export of the surface with `surface_id` is in flight.
    pub fn is_exporting(&self, surface_id: &str) -> bool {
        self.in_flight.borrow().contains(surface_id)
    }

    /// Export `surface` as a print-ready monochrome JPEG.
    ///
    /// The only suspension point is the wait for the surface to finish
    /// rendering. Dropping the future cancels the export and releases the
    /// surface.
    ///
    /// # Errors
    ///
    /// - [`ExportError::InvalidRequest`] for a DPI outside 72-1200 or an unordered budget
    /// - [`ExportError::ExportInProgress`] if this surface is already exporting
    /// - Capture failures mapped from [`CaptureError`]
    /// - [`ExportError::Encode`] if the JPEG encoder fails
    pub async fn export<S, T>(
        &self,
        surface: &S,
        timer: &T,
        request: &ExportRequest,
    ) -> Result<ExportResult, ExportError>
    where
        S: DesignSurface + ?Sized,
        C: CaptureStrategy<S>,
        E: QualityEncoder,
        T: Timer + ?Sized,
    {
        request.validate()?;
        let _in_flight = InFlight::acquire(&self.in_flight, surface.id())
            .ok_or_else(|| ExportError::ExportInProgress(surface.id().to_string()))?;

        let mut raster = capture(
            surface,
            &self.strategy,
            timer,
            request.target_dpi,
            self.capture_timeout,
        )
        .await?;

        let stats = convert_to_monochrome(&mut raster, &self.classifier);
        let outcome = encode_within_budget(
            &self.encoder,
            &raster,
            &request.size_budget,
            self.max_attempts,
        )?;
        let (width, height) = (raster.width, raster.height);
        drop(raster);

        let filename = export_filename(request.order_identifier.as_deref(), request.requested_at);
        let order_reference = resolve_order(request.order_identifier.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| generated_order_id(request.requested_at));
        let size_in_megabytes = bytes_to_megabytes(outcome.bytes.len());

        log::info!(
            "exported '{}' as {} ({}x{} at {} dpi, {:.2}MB, quality {:.2}, {} attempts{})",
            surface.id(),
            filename,
            width,
            height,
            request.target_dpi,
            size_in_megabytes,
            outcome.quality,
            outcome.attempts,
            if outcome.converged { "" } else { ", outside budget" }
        );

        Ok(ExportResult {
            preview_data_uri: preview_data_uri(&outcome.bytes),
            bytes: outcome.bytes,
            filename,
            size_in_megabytes,
            width,
            height,
            dpi: request.target_dpi,
            quality: outcome.quality,
            attempts: outcome.attempts,
            within_budget: outcome.converged,
            stats,
            order_reference,
            product: request.product.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{print_pixels, LayerKind, LayerRect};
    use crate::raster::RasterBuffer;
    use crate::testing::{FakeSurface, TokioTimer};

    fn at() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_123).unwrap()
    }

    /// Land on the left half, water on the right.
    fn coastline() -> FakeSurface {
        FakeSurface::new(64.0, 32.0)
            .with_layer(
                "tiles",
                LayerKind::BaseMap,
                LayerRect::new(0.0, 0.0, 64.0, 32.0),
                [235, 230, 220, 255],
            )
            .with_layer(
                "water",
                LayerKind::BaseMap,
                LayerRect::new(32.0, 0.0, 32.0, 32.0),
                [10, 10, 200, 255],
            )
            .with_layer(
                "handles",
                LayerKind::Chrome,
                LayerRect::new(0.0, 0.0, 8.0, 8.0),
                [0, 0, 0, 255],
            )
    }

    fn loose_config() -> ExportConfig {
        let mut config = ExportConfig::default();
        config.size_budget = SizeBudget::new(0.0, 0.5, 1.0);
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_export_end_to_end() {
        let config = loose_config();
        let surface = coastline();
        let request = config.request(Some("Order1001".to_string()), at());
        let result = Exporter::layered(&config)
            .export(&surface, &TokioTimer, &request)
            .await
            .unwrap();

        assert_eq!(result.filename, "Order1001_Map.jpeg");
        assert_eq!(result.order_reference, "Order1001");
        assert_eq!((result.width, result.height), (200, 100));
        assert_eq!(
            (result.width, result.height),
            (print_pixels(64.0, 300), print_pixels(32.0, 300))
        );
        assert_eq!(result.dpi, 300);
        assert!(result.within_budget);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.size_in_megabytes, bytes_to_megabytes(result.bytes.len()));
        assert!(result.preview_data_uri.starts_with("data:image/jpeg;base64,"));
        assert_eq!(result.stats.transparent, 0);
        assert_eq!(result.stats.black, 100 * 100);
        assert_eq!(result.stats.white, 100 * 100);

        let decoded = image::load_from_memory(&result.bytes).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (200, 100));
        // Chrome in the top-left corner must not be engraved
        assert!(decoded.get_pixel(4, 4).0.iter().all(|&c| c > 191));
        assert!(decoded.get_pixel(50, 50).0.iter().all(|&c| c > 191));
        assert!(decoded.get_pixel(150, 50).0.iter().all(|&c| c < 64));
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_export_matches_layered_dimensions() {
        let config = loose_config();
        let surface = coastline();
        let request = config.request(None, at());
        let result = Exporter::snapshot(&config)
            .export(&surface, &TokioTimer, &request)
            .await
            .unwrap();

        assert_eq!((result.width, result.height), (200, 100));
        assert_eq!(result.filename, "ORD-1700000000123_Map_2023-11-14T22-13-20-123Z.jpeg");
        assert_eq!(result.order_reference, "ORD-1700000000123");
        assert!(!surface.chrome_hidden());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmet_budget_returns_best_candidate() {
        let mut config = ExportConfig::default();
        config.size_budget = SizeBudget::new(1.0, 2.0, 3.0);
        let surface = coastline();
        let request = config.request(None, at());
        let result = Exporter::layered(&config)
            .export(&surface, &TokioTimer, &request)
            .await
            .unwrap();

        assert!(!result.within_budget);
        assert!(result.size_in_megabytes < 1.0);
        assert_eq!(result.size_in_megabytes, bytes_to_megabytes(result.bytes.len()));
        assert!(result.attempts <= 10);
        assert_eq!(result.quality, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_maps_to_capture_timeout() {
        let config = loose_config();
        let surface = coastline().never_renders();
        let exporter = Exporter::layered(&config);
        let result = exporter
            .export(&surface, &TokioTimer, &config.request(None, at()))
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, ExportError::CaptureTimeout { waited_ms: 30_000 }));
        assert!(err.is_retryable());
        assert!(!exporter.is_exporting("design"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tainted_layer_maps_to_capture_permission() {
        let config = loose_config();
        let surface = coastline().with_tainted_layer(
            "satellite",
            LayerKind::Underlay,
            LayerRect::new(0.0, 0.0, 64.0, 32.0),
        );
        let result = Exporter::layered(&config)
            .export(&surface, &TokioTimer, &config.request(None, at()))
            .await;

        let err = result.unwrap_err();
        assert!(matches!(&err, ExportError::CapturePermission { layer } if layer == "satellite"));
        assert!(err.to_string().contains("fully loaded"));
        assert!(!err.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_detached_surface_maps_to_invalid_state() {
        let config = loose_config();
        let surface = coastline().detached();
        let result = Exporter::layered(&config)
            .export(&surface, &TokioTimer, &config.request(None, at()))
            .await;
        assert!(matches!(result, Err(ExportError::InvalidSurfaceState(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_request_rejected_before_capture() {
        let config = loose_config();
        let surface = coastline();
        let mut request = config.request(None, at());
        request.target_dpi = 0;
        let result = Exporter::snapshot(&config)
            .export(&surface, &TokioTimer, &request)
            .await;

        assert!(matches!(result, Err(ExportError::InvalidRequest(_))));
        assert!(!surface.was_snapshotted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_encoder_failure_is_typed() {
        let config = loose_config();
        let surface = coastline();
        let failing = |_: &RasterBuffer, _: f32| -> Result<Vec<u8>, EncodeError> {
            Err(EncodeError::EncodingFailed("codec unavailable".to_string()))
        };
        let exporter = Exporter::with_encoder(LayerCompositor::default(), failing, &config);
        let result = exporter
            .export(&surface, &TokioTimer, &config.request(None, at()))
            .await;

        assert!(matches!(result, Err(ExportError::Encode(_))));
        assert!(!exporter.is_exporting("design"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_export_of_same_surface_fails_fast() {
        let config = loose_config();
        let surface = coastline().render_after(Duration::from_secs(1));
        let exporter = Exporter::layered(&config);
        let request = config.request(None, at());

        let first = exporter.export(&surface, &TokioTimer, &request);
        futures::pin_mut!(first);
        assert!(futures::poll!(first.as_mut()).is_pending());
        assert!(exporter.is_exporting("design"));

        let second = exporter.export(&surface, &TokioTimer, &request).await;
        assert!(matches!(second, Err(ExportError::ExportInProgress(id)) if id == "design"));

        assert!(first.await.is_ok());
        assert!(!exporter.is_exporting("design"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_surfaces_export_concurrently() {
        let config = loose_config();
        let slow = coastline().render_after(Duration::from_secs(1));
        let other = coastline().with_id("preview");
        let exporter = Exporter::layered(&config);
        let request = config.request(None, at());

        let first = exporter.export(&slow, &TokioTimer, &request);
        futures::pin_mut!(first);
        assert!(futures::poll!(first.as_mut()).is_pending());

        assert!(exporter.export(&other, &TokioTimer, &request).await.is_ok());
        assert!(first.await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_export_releases_surface() {
        let config = loose_config();
        let surface = coastline().never_renders();
        let exporter = Exporter::layered(&config);
        let request = config.request(None, at());

        {
            let pending = exporter.export(&surface, &TokioTimer, &request);
            futures::pin_mut!(pending);
            assert!(futures::poll!(pending.as_mut()).is_pending());
            assert!(exporter.is_exporting("design"));
        }
        assert!(!exporter.is_exporting("design"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_metadata() {
        let config = loose_config();
        let surface = coastline();
        let request = config
            .request(Some(" Order1001 ".to_string()), at())
            .with_product(ProductSpec {
                shape: Some("rectangle".to_string()),
                material: Some("slate".to_string()),
                size: None,
            });
        let result = Exporter::layered(&config)
            .export(&surface, &TokioTimer, &request)
            .await
            .unwrap();

        let attrs = result.order_attributes();
        assert_eq!(attrs.filename, "Order1001_Map.jpeg");
        assert_eq!(attrs.dimensions, "200x100");
        assert_eq!(attrs.dpi, 300);
        assert_eq!(attrs.file_size, result.size_label());
        assert!(attrs.file_size.ends_with("MB"));
        assert_eq!(attrs.material.as_deref(), Some("slate"));

        let persist = result.persist_request();
        assert_eq!(persist.order_identifier, "Order1001");
        assert_eq!(persist.filename, result.filename);
        assert_eq!(persist.bytes, result.bytes);
    }

    #[test]
    fn test_size_label_rounds_to_one_decimal() {
        let result = ExportResult {
            bytes: Vec::new(),
            preview_data_uri: preview_data_uri(&[]),
            filename: "x_Map.jpeg".to_string(),
            size_in_megabytes: 12.34,
            width: 1,
            height: 1,
            dpi: 300,
            quality: 0.95,
            attempts: 1,
            within_budget: true,
            stats: MonochromeStats::default(),
            order_reference: "x".to_string(),
            product: None,
        };
        assert_eq!(result.size_label(), "12.3MB");
        assert_eq!(result.preview_data_uri, "data:image/jpeg;base64,");
    }

    #[test]
    fn test_default_request() {
        let request = ExportRequest::new(at()).with_order("Order1001");
        assert_eq!(request.target_dpi, 300);
        assert_eq!(request.size_budget, SizeBudget::new(8.0, 15.0, 30.0));
        assert_eq!(request.order_identifier.as_deref(), Some("Order1001"));
    }
}
