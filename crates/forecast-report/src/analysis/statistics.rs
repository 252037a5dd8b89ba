//! Numeric characteristics of a forecast series.

use super::{AnalysisResult, AnalyzerConfig, TrendDirection};
use crate::types::ForecastSeries;

/// Percent change threshold separating a trend from a stable outlook.
pub const TREND_THRESHOLD_PCT: f64 = 5.0;

/// Keep only values that can participate in arithmetic.
pub(crate) fn usable_values(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Percent change from `first` to `last`; zero when `first` is zero.
pub(crate) fn trend_pct(first: f64, last: f64) -> f64 {
    if first == 0.0 {
        return 0.0;
    }
    (last - first) * 100.0 / first
}

pub(crate) fn classify_trend(pct: f64) -> TrendDirection {
    if pct > TREND_THRESHOLD_PCT {
        TrendDirection::Upward
    } else if pct < -TREND_THRESHOLD_PCT {
        TrendDirection::Downward
    } else {
        TrendDirection::Stable
    }
}

/// Relative spread between peak and trough, zero when their average is zero.
pub(crate) fn volatility_pct(peak: f64, trough: f64) -> f64 {
    let avg = (peak + trough) / 2.0;
    if avg == 0.0 {
        return 0.0;
    }
    (peak - trough) / avg.abs() * 100.0
}

/// Averages of consecutive non-overlapping windows. Incomplete tails are dropped.
pub(crate) fn window_means(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return Vec::new();
    }
    values
        .chunks_exact(window)
        .map(|chunk| chunk.iter().sum::<f64>() / window as f64)
        .collect()
}

/// Mean width of the confidence band relative to the prediction, in percent.
pub(crate) fn avg_band_width_pct(series: &ForecastSeries) -> Option<f64> {
    let (lower, upper) = (series.lower_bound.as_ref()?, series.upper_bound.as_ref()?);

    let widths: Vec<f64> = series
        .predicted
        .iter()
        .zip(lower.iter().zip(upper))
        .filter(|(p, (lo, hi))| p.is_finite() && **p != 0.0 && lo.is_finite() && hi.is_finite())
        .map(|(p, (lo, hi))| (hi - lo) / p.abs() * 100.0)
        .collect();

    if widths.is_empty() {
        None
    } else {
        Some(widths.iter().sum::<f64>() / widths.len() as f64)
    }
}

/// Compute every numeric field of the result; text is filled in afterwards.
pub(crate) fn compute_metrics(series: &ForecastSeries, config: &AnalyzerConfig) -> AnalysisResult {
    let values = usable_values(&series.predicted);
    if values.len() < 2 {
        return AnalysisResult::insufficient(values.len());
    }

    let first = values[0];
    let last = values[values.len() - 1];
    let peak = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let trough = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mean = values.iter().sum::<f64>() / values.len() as f64;

    let pct = trend_pct(first, last);

    let (window_means, has_seasonality) = if values.len() >= config.min_seasonal_points {
        let means = window_means(&values, config.season_window);
        let seasonal = means.len() >= config.min_windows;
        (means, seasonal)
    } else {
        (Vec::new(), false)
    };

    AnalysisResult {
        trend: classify_trend(pct),
        trend_pct: pct,
        peak,
        trough,
        volatility_pct: volatility_pct(peak, trough),
        has_seasonality,
        first,
        last,
        mean,
        points: values.len(),
        window_means,
        avg_band_width_pct: avg_band_width_pct(series),
        insights: Vec::new(),
        recommendations: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_pct_basic() {
        assert_eq!(trend_pct(100.0, 110.0), 10.0);
        assert_eq!(trend_pct(100.0, 80.0), -20.0);
    }

    #[test]
    fn test_trend_pct_zero_first() {
        assert_eq!(trend_pct(0.0, 50.0), 0.0);
    }

    #[test]
    fn test_classify_trend_boundaries() {
        assert_eq!(classify_trend(5.0), TrendDirection::Stable);
        assert_eq!(classify_trend(5.01), TrendDirection::Upward);
        assert_eq!(classify_trend(-5.0), TrendDirection::Stable);
        assert_eq!(classify_trend(-5.01), TrendDirection::Downward);
    }

    #[test]
    fn test_volatility_pct() {
        // (130 - 95) / 112.5 * 100
        let v = volatility_pct(130.0, 95.0);
        assert!((v - 31.111).abs() < 0.01);
        assert_eq!(volatility_pct(10.0, 10.0), 0.0);
        assert_eq!(volatility_pct(5.0, -5.0), 0.0);
    }

    #[test]
    fn test_window_means_drops_partial_window() {
        let means = window_means(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0], 3);
        assert_eq!(means, vec![2.0, 5.0]);
        assert!(window_means(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn test_usable_values_skips_nan_and_infinite() {
        let values = usable_values(&[1.0, f64::NAN, 2.0, f64::INFINITY]);
        assert_eq!(values, vec![1.0, 2.0]);
    }

    #[test]
    fn test_avg_band_width_pct() {
        let series = ForecastSeries::from_values(&[100.0, 200.0])
            .with_bounds(vec![90.0, 180.0], vec![110.0, 220.0]);
        let width = avg_band_width_pct(&series).unwrap();
        assert!((width - 20.0).abs() < 1e-9);
        assert!(avg_band_width_pct(&ForecastSeries::from_values(&[1.0])).is_none());
    }
}
