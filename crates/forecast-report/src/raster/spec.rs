//! Chart specifications handed to a render engine.

use serde::{Deserialize, Serialize};

/// RGB colour.
pub type Rgb = [u8; 3];

/// Default series palette.
pub const PALETTE: [Rgb; 4] = [
    [37, 99, 235],
    [234, 88, 12],
    [22, 163, 74],
    [147, 51, 234],
];

/// Shape used to draw every series of a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
    Area,
}

/// One named data series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<f64>,
    pub color: Rgb,
}

impl ChartSeries {
    pub fn new(name: impl Into<String>, values: Vec<f64>, color: Rgb) -> Self {
        Self {
            name: name.into(),
            values,
            color,
        }
    }
}

/// Confidence band drawn as a filled region behind the series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub color: Rgb,
}

/// Rendering options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayOptions {
    /// Caption placed on the page above the image.
    pub title: String,
    pub show_grid: bool,
    /// Always forced off by the rasterizer.
    pub animate: bool,
    pub background: [u8; 4],
    /// Stroke width in pixels for line and area outlines.
    pub stroke_width: u32,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            show_grid: true,
            animate: true,
            background: [255, 255, 255, 255],
            stroke_width: 3,
        }
    }
}

/// Everything needed to draw one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub series: Vec<ChartSeries>,
    pub band: Option<ConfidenceBand>,
    pub options: DisplayOptions,
}

impl ChartSpec {
    pub fn new(kind: ChartKind, labels: Vec<String>) -> Self {
        Self {
            kind,
            labels,
            series: Vec::new(),
            band: None,
            options: DisplayOptions::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.options.title = title.into();
        self
    }

    pub fn with_series(mut self, series: ChartSeries) -> Self {
        self.series.push(series);
        self
    }

    pub fn with_band(mut self, lower: Vec<f64>, upper: Vec<f64>, color: Rgb) -> Self {
        self.band = Some(ConfidenceBand { lower, upper, color });
        self
    }

    /// Number of x positions.
    pub fn point_count(&self) -> usize {
        self.series
            .iter()
            .map(|s| s.values.len())
            .chain(std::iter::once(self.labels.len()))
            .max()
            .unwrap_or(0)
    }

    /// Minimum and maximum over every finite value, band included.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let series_values = self.series.iter().flat_map(|s| s.values.iter());
        let band_values = self
            .band
            .iter()
            .flat_map(|b| b.lower.iter().chain(b.upper.iter()));

        series_values
            .chain(band_values)
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |range, v| match range {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}
