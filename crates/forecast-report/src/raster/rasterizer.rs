//! Chart rasterization with bounded waiting and sentinel fallback.

use super::engine::{EngineFactory, RenderEngine};
use super::spec::ChartSpec;
use super::surface::RasterSurface;
use crate::config::PixelSize;
use crate::error::{ReportError, Result};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// A sampled chart encoded as PNG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Result of one rasterization. Never an error: failures become
/// [`RasterOutcome::Unavailable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterOutcome {
    Image(ChartImage),
    Unavailable { reason: String },
}

impl RasterOutcome {
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image(_))
    }

    pub fn image(&self) -> Option<&ChartImage> {
        match self {
            Self::Image(image) => Some(image),
            Self::Unavailable { .. } => None,
        }
    }
}

/// Renders chart specifications to still images, one engine per chart.
#[derive(Clone)]
pub struct ChartRasterizer {
    factory: Arc<dyn EngineFactory>,
    timeout: Duration,
}

impl std::fmt::Debug for ChartRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartRasterizer")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ChartRasterizer {
    pub fn new(factory: Arc<dyn EngineFactory>, timeout: Duration) -> Self {
        Self { factory, timeout }
    }

    /// Render `spec` at exactly `size` pixels.
    ///
    /// Animation is disabled, the engine's completion signal is awaited for at
    /// most the configured timeout, and the engine is disposed afterwards
    /// whatever the outcome.
    pub async fn rasterize(&self, spec: &ChartSpec, size: PixelSize) -> RasterOutcome {
        let mut engine = self.factory.create();
        let engine_name = engine.name().to_string();

        let result = self.render_with(engine.as_mut(), spec, size).await;
        engine.dispose();

        match result {
            Ok(image) => {
                debug!(
                    "Rasterized '{}' with {} engine ({} bytes)",
                    spec.options.title,
                    engine_name,
                    image.png.len()
                );
                RasterOutcome::Image(image)
            }
            Err(e) => {
                warn!(
                    "Chart '{}' could not be rendered by {} engine: {}",
                    spec.options.title, engine_name, e
                );
                RasterOutcome::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn render_with(
        &self,
        engine: &mut dyn RenderEngine,
        spec: &ChartSpec,
        size: PixelSize,
    ) -> Result<ChartImage> {
        if size.width == 0 || size.height == 0 {
            return Err(ReportError::Render(format!(
                "invalid target size {}x{}",
                size.width, size.height
            )));
        }

        let mut spec = spec.clone();
        spec.options.animate = false;

        let surface = RasterSurface::new(size, spec.options.background);
        let (done, signal) = oneshot::channel();
        if catch_unwind(AssertUnwindSafe(|| engine.start(&spec, surface, done))).is_err() {
            return Err(ReportError::Render("engine panicked while starting".to_string()));
        }

        let surface = match tokio::time::timeout(self.timeout, signal).await {
            Err(_) => {
                return Err(ReportError::Render(format!(
                    "no completion signal within {:?}",
                    self.timeout
                )));
            }
            Ok(Err(_)) => {
                return Err(ReportError::Render(
                    "engine dropped the completion signal".to_string(),
                ));
            }
            Ok(Ok(rendered)) => rendered?,
        };

        if surface.size() != size {
            return Err(ReportError::Render(format!(
                "engine returned a {}x{} surface, expected {}x{}",
                surface.width(),
                surface.height(),
                size.width,
                size.height
            )));
        }
        if surface.is_blank() {
            return Err(ReportError::Render("engine produced a blank image".to_string()));
        }

        encode_png(surface)
    }
}

fn encode_png(surface: RasterSurface) -> Result<ChartImage> {
    let (width, height) = (surface.width(), surface.height());
    let mut buffer = Vec::new();
    DynamicImage::ImageRgba8(surface.into_image())
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;

    Ok(ChartImage {
        png: buffer,
        width,
        height,
    })
}
