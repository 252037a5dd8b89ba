//! Render engine abstraction and the built-in software engine.
//!
//! An engine receives a chart specification and a blank surface, draws
//! asynchronously and resolves a one-shot completion signal with the finished
//! surface. Engines are single-use: the rasterizer creates one per chart
//! through an [`EngineFactory`] and always calls [`RenderEngine::dispose`]
//! after sampling.

use super::spec::{ChartKind, ChartSpec, Rgb};
use super::surface::RasterSurface;
use crate::error::{ReportError, Result};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Completion signal resolved by an engine once drawing has finished.
pub type RenderSignal = oneshot::Sender<Result<RasterSurface>>;

/// A chart rendering engine.
pub trait RenderEngine: Send {
    /// Engine name for diagnostics.
    fn name(&self) -> &str;

    /// Begin drawing `spec` onto `surface`.
    ///
    /// Must return promptly. The finished surface (or the failure) is sent
    /// through `done`; dropping `done` without sending counts as a failure.
    fn start(&mut self, spec: &ChartSpec, surface: RasterSurface, done: RenderSignal);

    /// Release any resources held by the engine.
    fn dispose(&mut self);
}

/// Creates a fresh engine for each chart.
pub trait EngineFactory: Send + Sync {
    fn create(&self) -> Box<dyn RenderEngine>;
}

impl<F> EngineFactory for F
where
    F: Fn() -> Box<dyn RenderEngine> + Send + Sync,
{
    fn create(&self) -> Box<dyn RenderEngine> {
        self()
    }
}

/// Factory producing [`SoftwareChartEngine`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareEngineFactory;

impl EngineFactory for SoftwareEngineFactory {
    fn create(&self) -> Box<dyn RenderEngine> {
        Box::new(SoftwareChartEngine::default())
    }
}

impl SoftwareEngineFactory {
    pub fn shared() -> Arc<dyn EngineFactory> {
        Arc::new(Self)
    }
}

/// CPU renderer drawing grid, axes, band and series into an RGBA surface.
///
/// Drawing runs on the blocking pool when a Tokio runtime is available and
/// inline otherwise.
#[derive(Debug, Default)]
pub struct SoftwareChartEngine {
    task: Option<JoinHandle<()>>,
}

impl RenderEngine for SoftwareChartEngine {
    fn name(&self) -> &str {
        "software"
    }

    fn start(&mut self, spec: &ChartSpec, surface: RasterSurface, done: RenderSignal) {
        let spec = spec.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                self.task = Some(handle.spawn_blocking(move || {
                    let _ = done.send(draw_chart(&spec, surface));
                }));
            }
            Err(_) => {
                let _ = done.send(draw_chart(&spec, surface));
            }
        }
    }

    fn dispose(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// =============================================================================
// Drawing
// =============================================================================

const GRID_COLOR: [u8; 4] = [226, 232, 240, 255];
const AXIS_COLOR: [u8; 4] = [71, 85, 105, 255];
const GRID_LINES: usize = 5;
const BAND_ALPHA: u8 = 70;
const AREA_ALPHA: u8 = 90;

/// Pixel rectangle holding the plotted data.
#[derive(Debug, Clone, Copy)]
struct PlotArea {
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
}

impl PlotArea {
    fn for_surface(width: u32, height: u32) -> Self {
        let (w, h) = (width as i64, height as i64);
        Self {
            left: (w * 6 / 100).max(1),
            top: (h * 6 / 100).max(1),
            right: (w - w * 3 / 100 - 1).max(2),
            bottom: (h - h * 8 / 100 - 1).max(2),
        }
    }

    fn width(&self) -> i64 {
        self.right - self.left
    }

    fn height(&self) -> i64 {
        self.bottom - self.top
    }
}

/// Maps data coordinates onto the plot area.
struct Scale {
    area: PlotArea,
    min: f64,
    max: f64,
    points: usize,
    centered: bool,
}

impl Scale {
    fn y(&self, value: f64) -> i64 {
        let t = (value - self.min) / (self.max - self.min);
        self.area.bottom - (t * self.area.height() as f64).round() as i64
    }

    fn x(&self, index: usize) -> i64 {
        let w = self.area.width() as f64;
        let offset = if self.centered {
            (index as f64 + 0.5) * w / self.points as f64
        } else if self.points <= 1 {
            w / 2.0
        } else {
            index as f64 * w / (self.points - 1) as f64
        };
        self.area.left + offset.round() as i64
    }

    fn slot_width(&self) -> i64 {
        (self.area.width() / self.points.max(1) as i64).max(1)
    }
}

fn opaque(color: Rgb) -> [u8; 4] {
    [color[0], color[1], color[2], 255]
}

fn translucent(color: Rgb, alpha: u8) -> [u8; 4] {
    [color[0], color[1], color[2], alpha]
}

/// Draw `spec` onto `surface`.
pub(crate) fn draw_chart(spec: &ChartSpec, mut surface: RasterSurface) -> Result<RasterSurface> {
    let points = spec.point_count();
    let (mut min, mut max) = spec
        .value_range()
        .ok_or_else(|| ReportError::Render("chart has no finite values to draw".to_string()))?;

    if matches!(spec.kind, ChartKind::Bar | ChartKind::Area) {
        min = min.min(0.0);
        max = max.max(0.0);
    }
    if (max - min).abs() < f64::EPSILON {
        let pad = if max == 0.0 { 1.0 } else { max.abs() * 0.1 };
        min -= pad;
        max += pad;
    }

    let area = PlotArea::for_surface(surface.width(), surface.height());
    let scale = Scale {
        area,
        min,
        max,
        points,
        centered: spec.kind == ChartKind::Bar,
    };

    if spec.options.show_grid {
        for i in 0..=GRID_LINES {
            let y = area.top + area.height() * i as i64 / GRID_LINES as i64;
            surface.draw_line((area.left, y), (area.right, y), 1, GRID_COLOR);
        }
    }

    if let Some(band) = &spec.band {
        let (xs, upper, lower) = band_columns(&scale, &band.lower, &band.upper);
        surface.fill_between(&xs, &upper, &lower, translucent(band.color, BAND_ALPHA));
    }

    match spec.kind {
        ChartKind::Bar => draw_bars(spec, &scale, &mut surface),
        ChartKind::Line => draw_lines(spec, &scale, &mut surface, false),
        ChartKind::Area => draw_lines(spec, &scale, &mut surface, true),
    }

    surface.draw_line((area.left, area.top), (area.left, area.bottom), 2, AXIS_COLOR);
    let baseline = if min < 0.0 && max > 0.0 { scale.y(0.0) } else { area.bottom };
    surface.draw_line((area.left, baseline), (area.right, baseline), 2, AXIS_COLOR);

    Ok(surface)
}

/// Contiguous runs of finite band samples, flattened to pixel columns.
fn band_columns(scale: &Scale, lower: &[f64], upper: &[f64]) -> (Vec<i64>, Vec<i64>, Vec<i64>) {
    let mut xs = Vec::new();
    let mut tops = Vec::new();
    let mut bottoms = Vec::new();
    for (i, (lo, hi)) in lower.iter().zip(upper).enumerate() {
        if lo.is_finite() && hi.is_finite() {
            xs.push(scale.x(i));
            tops.push(scale.y(*hi));
            bottoms.push(scale.y(*lo));
        }
    }
    (xs, tops, bottoms)
}

fn draw_lines(spec: &ChartSpec, scale: &Scale, surface: &mut RasterSurface, filled: bool) {
    let stroke = spec.options.stroke_width.max(1);
    for series in &spec.series {
        let points: Vec<(i64, i64)> = series
            .values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(i, v)| (scale.x(i), scale.y(*v)))
            .collect();

        if filled && !points.is_empty() {
            let baseline = scale.y(0.0_f64.clamp(scale.min, scale.max));
            let xs: Vec<i64> = points.iter().map(|p| p.0).collect();
            let tops: Vec<i64> = points.iter().map(|p| p.1).collect();
            let bottoms = vec![baseline; points.len()];
            surface.fill_between(&xs, &tops, &bottoms, translucent(series.color, AREA_ALPHA));
        }

        let color = opaque(series.color);
        for pair in points.windows(2) {
            surface.draw_line(pair[0], pair[1], stroke, color);
        }
        for &(x, y) in &points {
            let r = stroke as i64 + 1;
            surface.fill_rect(x - r, y - r, x + r, y + r, color);
        }
    }
}

fn draw_bars(spec: &ChartSpec, scale: &Scale, surface: &mut RasterSurface) {
    let groups = spec.series.len().max(1) as i64;
    let slot = scale.slot_width();
    let bar_width = (slot * 6 / 10 / groups).max(1);
    let baseline = scale.y(0.0_f64.clamp(scale.min, scale.max));

    for (g, series) in spec.series.iter().enumerate() {
        let color = opaque(series.color);
        for (i, value) in series.values.iter().enumerate() {
            if !value.is_finite() {
                continue;
            }
            let center = scale.x(i);
            let left = center - bar_width * groups / 2 + bar_width * g as i64;
            surface.fill_rect(left, scale.y(*value), left + bar_width - 1, baseline, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PixelSize;
    use crate::raster::spec::{ChartSeries, PALETTE};

    fn blank(w: u32, h: u32) -> RasterSurface {
        RasterSurface::new(PixelSize::new(w, h), [255, 255, 255, 255])
    }

    fn labels(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("P{}", i)).collect()
    }

    #[test]
    fn test_draw_line_chart_produces_pixels() {
        let spec = ChartSpec::new(ChartKind::Line, labels(4))
            .with_series(ChartSeries::new("predicted", vec![1.0, 3.0, 2.0, 4.0], PALETTE[0]))
            .with_band(vec![0.5, 2.5, 1.5, 3.5], vec![1.5, 3.5, 2.5, 4.5], PALETTE[0]);
        let surface = draw_chart(&spec, blank(200, 100)).unwrap();
        assert!(!surface.is_blank());
        assert_eq!(surface.size(), PixelSize::new(200, 100));
    }

    #[test]
    fn test_draw_bar_chart_with_negative_values() {
        let spec = ChartSpec::new(ChartKind::Bar, labels(3))
            .with_series(ChartSeries::new("delta", vec![-2.0, 5.0, 1.0], PALETTE[1]));
        let surface = draw_chart(&spec, blank(120, 80)).unwrap();
        assert!(!surface.is_blank());
    }

    #[test]
    fn test_draw_single_point_area() {
        let spec = ChartSpec::new(ChartKind::Area, labels(1))
            .with_series(ChartSeries::new("only", vec![7.0], PALETTE[2]));
        assert!(draw_chart(&spec, blank(50, 50)).is_ok());
    }

    #[test]
    fn test_draw_fails_without_finite_values() {
        let spec = ChartSpec::new(ChartKind::Line, labels(2))
            .with_series(ChartSeries::new("empty", vec![f64::NAN, f64::NAN], PALETTE[0]));
        assert!(draw_chart(&spec, blank(50, 50)).is_err());
    }

    #[tokio::test]
    async fn test_software_engine_resolves_signal() {
        let spec = ChartSpec::new(ChartKind::Line, labels(2))
            .with_series(ChartSeries::new("p", vec![1.0, 2.0], PALETTE[0]));
        let mut engine = SoftwareChartEngine::default();
        let (tx, rx) = oneshot::channel();
        engine.start(&spec, blank(64, 32), tx);
        let surface = rx.await.unwrap().unwrap();
        engine.dispose();
        assert!(!surface.is_blank());
    }
}
