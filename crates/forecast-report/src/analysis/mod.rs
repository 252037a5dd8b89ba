//! Statistical analysis of forecast series.
//!
//! [`analyze`] is pure: it classifies the trend, measures volatility, runs a
//! coarse seasonality heuristic and derives insight and recommendation text.
//! It never fails; series with fewer than two usable values degrade to
//! [`TrendDirection::InsufficientData`].
//!
//! # Example
//!
//! ```rust,ignore
//! use forecast_report::analysis::{analyze, TrendDirection};
//! use forecast_report::ForecastSeries;
//!
//! let series = ForecastSeries::from_values(&[100.0, 105.0, 95.0, 120.0, 130.0, 125.0]);
//! let result = analyze(&series);
//! assert_eq!(result.trend, TrendDirection::Upward);
//! ```

mod insights;
mod statistics;

pub use insights::CONTINGENCY_VOLATILITY_PCT;
pub use statistics::TREND_THRESHOLD_PCT;

use crate::types::ForecastSeries;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Direction of the forecast between its first and last usable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Upward,
    Downward,
    Stable,
    InsufficientData,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upward => "upward",
            Self::Downward => "downward",
            Self::Stable => "stable",
            Self::InsufficientData => "insufficient_data",
        }
    }

    /// Human-readable label for report text.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Upward => "Upward",
            Self::Downward => "Downward",
            Self::Stable => "Stable",
            Self::InsufficientData => "Insufficient data",
        }
    }
}

/// Volatility bucket used by the insight rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityLevel {
    /// Below 10%
    Low,
    /// 10% to 20% inclusive
    Moderate,
    /// Above 20%
    High,
}

impl VolatilityLevel {
    pub fn from_pct(pct: f64) -> Self {
        if pct > 20.0 {
            Self::High
        } else if pct >= 10.0 {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
        }
    }

    pub(crate) fn monitoring_cadence(&self) -> &'static str {
        match self {
            Self::Low => "monthly",
            Self::Moderate => "every two weeks",
            Self::High => "weekly",
        }
    }

    pub(crate) fn alert_threshold_pct(&self) -> u32 {
        match self {
            Self::Low => 5,
            Self::Moderate => 10,
            Self::High => 15,
        }
    }
}

/// Tunables for the seasonality heuristic.
///
/// The defaults reproduce the fixed behaviour: 3-point windows, evaluated
/// only from 12 points upward, seasonal when at least 4 windows complete.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub season_window: usize,
    pub min_seasonal_points: usize,
    pub min_windows: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            season_window: 3,
            min_seasonal_points: 12,
            min_windows: 4,
        }
    }
}

/// Derived analysis of one forecast series. Recomputed on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub trend: TrendDirection,
    /// Signed percent change from the first to the last usable value
    pub trend_pct: f64,
    pub peak: f64,
    pub trough: f64,
    /// (peak - trough) / avg(peak, trough) * 100
    pub volatility_pct: f64,
    /// Coarse window heuristic, see [`AnalyzerConfig`]
    pub has_seasonality: bool,
    pub first: f64,
    pub last: f64,
    pub mean: f64,
    /// Number of finite values that took part in the analysis
    pub points: usize,
    /// Averages of the seasonality windows (empty when not evaluated)
    pub window_means: Vec<f64>,
    /// Mean relative width of the confidence band, when bounds are present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_band_width_pct: Option<f64>,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

impl AnalysisResult {
    fn insufficient(points: usize) -> Self {
        Self {
            trend: TrendDirection::InsufficientData,
            trend_pct: 0.0,
            peak: 0.0,
            trough: 0.0,
            volatility_pct: 0.0,
            has_seasonality: false,
            first: 0.0,
            last: 0.0,
            mean: 0.0,
            points,
            window_means: Vec::new(),
            avg_band_width_pct: None,
            insights: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    pub fn is_sufficient(&self) -> bool {
        self.trend != TrendDirection::InsufficientData
    }

    pub fn volatility_level(&self) -> VolatilityLevel {
        VolatilityLevel::from_pct(self.volatility_pct)
    }
}

/// Analyze a series with the default heuristic settings.
pub fn analyze(series: &ForecastSeries) -> AnalysisResult {
    analyze_with(series, &AnalyzerConfig::default())
}

/// Analyze a series with explicit heuristic settings.
pub fn analyze_with(series: &ForecastSeries, config: &AnalyzerConfig) -> AnalysisResult {
    let mut result = statistics::compute_metrics(series, config);

    if !result.is_sufficient() {
        warn!(
            "Forecast has {} usable values; analysis degraded to insufficient data",
            result.points
        );
    }

    result.insights = insights::generate_insights(&result);
    result.recommendations = insights::generate_recommendations(&result);
    result
}
