//! In-memory design surface for tests.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::time::Duration;

use image::{imageops, Rgba, RgbaImage};

use crate::capture::{
    DesignSurface, LayerInfo, LayerKind, LayerRect, LayeredSurface, ReadbackError,
    SnapshotSurface, SurfaceSize, Timer,
};

#[derive(Debug, Clone, Copy)]
enum Render {
    Ready,
    After(Duration),
    Never,
}

/// Timer backed by tokio's (pausable) clock.
pub(crate) struct TokioTimer;

impl Timer for TokioTimer {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        tokio::time::sleep(duration)
    }
}

/// A surface whose layers are solid-color bitmaps at 1 css px = 1 bitmap px.
pub(crate) struct FakeSurface {
    pub id: String,
    pub size: SurfaceSize,
    attached: bool,
    render: Render,
    /// `None` bitmaps are cross-origin tainted.
    layers: Vec<(LayerInfo, Option<RgbaImage>)>,
    reads: RefCell<Vec<String>>,
    chrome_hidden: Cell<bool>,
    hidden_during_snapshot: Cell<Option<bool>>,
    tainted_snapshot: bool,
    snapshot_slack: u32,
    snapshots: Cell<u32>,
}

impl FakeSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            id: "design".to_string(),
            size: SurfaceSize::new(width, height),
            attached: true,
            render: Render::Ready,
            layers: Vec::new(),
            reads: RefCell::new(Vec::new()),
            chrome_hidden: Cell::new(false),
            hidden_during_snapshot: Cell::new(None),
            tainted_snapshot: false,
            snapshot_slack: 0,
            snapshots: Cell::new(0),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn render_after(mut self, delay: Duration) -> Self {
        self.render = Render::After(delay);
        self
    }

    pub fn never_renders(mut self) -> Self {
        self.render = Render::Never;
        self
    }

    pub fn detached(mut self) -> Self {
        self.attached = false;
        self
    }

    pub fn with_layer(mut self, name: &str, kind: LayerKind, bounds: LayerRect, rgba: [u8; 4]) -> Self {
        let bitmap = RgbaImage::from_pixel(
            bounds.width.ceil() as u32,
            bounds.height.ceil() as u32,
            Rgba(rgba),
        );
        self.layers
            .push((LayerInfo::new(name, kind, bounds), Some(bitmap)));
        self
    }

    pub fn with_tainted_layer(mut self, name: &str, kind: LayerKind, bounds: LayerRect) -> Self {
        self.layers.push((LayerInfo::new(name, kind, bounds), None));
        self
    }

    pub fn with_tainted_snapshot(mut self) -> Self {
        self.tainted_snapshot = true;
        self
    }

    /// Snapshots come back `slack` pixels larger than requested.
    pub fn with_snapshot_slack(mut self, slack: u32) -> Self {
        self.snapshot_slack = slack;
        self
    }

    pub fn was_read(&self, name: &str) -> bool {
        self.reads.borrow().iter().any(|n| n == name)
    }

    pub fn chrome_hidden(&self) -> bool {
        self.chrome_hidden.get()
    }

    pub fn chrome_hidden_during_snapshot(&self) -> Option<bool> {
        self.hidden_during_snapshot.get()
    }

    pub fn was_snapshotted(&self) -> bool {
        self.snapshots.get() > 0
    }
}

impl DesignSurface for FakeSurface {
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
        let render = self.render;
        async move {
            match render {
                Render::Ready => {}
                Render::After(delay) => tokio::time::sleep(delay).await,
                Render::Never => futures::future::pending::<()>().await,
            }
        }
    }
}

impl LayeredSurface for FakeSurface {
    fn layers(&self) -> Vec<LayerInfo> {
        self.layers.iter().map(|(info, _)| info.clone()).collect()
    }

    fn read_layer(&self, layer: &LayerInfo) -> Result<RgbaImage, ReadbackError> {
        self.reads.borrow_mut().push(layer.name.clone());
        match self.layers.iter().find(|(info, _)| info.name == layer.name) {
            Some((_, Some(bitmap))) => Ok(bitmap.clone()),
            Some((_, None)) => Err(ReadbackError::Tainted),
            None => Err(ReadbackError::Unavailable(format!("no layer '{}'", layer.name))),
        }
    }
}

impl SnapshotSurface for FakeSurface {
    fn set_chrome_hidden(&self, hidden: bool) {
        self.chrome_hidden.set(hidden);
    }

    fn snapshot(&self, width: u32, height: u32) -> Result<RgbaImage, ReadbackError> {
        self.snapshots.set(self.snapshots.get() + 1);
        self.hidden_during_snapshot.set(Some(self.chrome_hidden.get()));
        if self.tainted_snapshot {
            return Err(ReadbackError::Tainted);
        }

        let (w, h) = (width + self.snapshot_slack, height + self.snapshot_slack);
        let fx = w as f64 / self.size.width;
        let fy = h as f64 / self.size.height;
        let mut canvas = RgbaImage::new(w, h);

        let mut layers: Vec<_> = self
            .layers
            .iter()
            .filter(|(info, _)| !(info.kind == LayerKind::Chrome && self.chrome_hidden.get()))
            .collect();
        layers.sort_by_key(|(info, _)| info.kind.z_order());

        for (info, bitmap) in layers {
            let bitmap = bitmap.as_ref().ok_or(ReadbackError::Tainted)?;
            let b = info.bounds;
            let lw = (b.width * fx).round().max(1.0) as u32;
            let lh = (b.height * fy).round().max(1.0) as u32;
            let scaled = imageops::resize(bitmap, lw, lh, imageops::FilterType::Nearest);
            imageops::overlay(
                &mut canvas,
                &scaled,
                (b.x * fx).round() as i64,
                (b.y * fy).round() as i64,
            );
        }
        Ok(canvas)
    }
}
