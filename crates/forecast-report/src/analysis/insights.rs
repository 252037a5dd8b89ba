//! Deterministic insight and recommendation text.
//!
//! Sentences are selected from a rule table keyed by trend direction,
//! volatility level and the seasonality flag. Identical metrics always yield
//! identical text.

use super::{AnalysisResult, TrendDirection, VolatilityLevel};
use crate::utils::format_fixed2;

/// Volatility above which a contingency recommendation is appended.
pub const CONTINGENCY_VOLATILITY_PCT: f64 = 20.0;

pub(crate) const INSUFFICIENT_DATA_INSIGHT: &str =
    "Insufficient data: at least two forecast values are required for trend analysis.";

/// Ranked insights, between two and six sentences.
pub(crate) fn generate_insights(result: &AnalysisResult) -> Vec<String> {
    if result.trend == TrendDirection::InsufficientData {
        return vec![INSUFFICIENT_DATA_INSIGHT.to_string()];
    }

    let volatility = VolatilityLevel::from_pct(result.volatility_pct);
    let mut insights = Vec::with_capacity(6);

    insights.push(match result.trend {
        TrendDirection::Upward => format!(
            "The forecast shows an upward trend, rising {:.1}% from the first to the last period.",
            result.trend_pct
        ),
        TrendDirection::Downward => format!(
            "The forecast shows a downward trend, falling {:.1}% from the first to the last period.",
            result.trend_pct.abs()
        ),
        _ => format!(
            "The forecast is broadly stable, changing {:.1}% from the first to the last period.",
            result.trend_pct
        ),
    });

    insights.push(format!(
        "Projected values range from a trough of {} to a peak of {}.",
        format_fixed2(result.trough),
        format_fixed2(result.peak)
    ));

    insights.push(match volatility {
        VolatilityLevel::Low => format!(
            "Volatility is low at {:.1}%, indicating a predictable trajectory.",
            result.volatility_pct
        ),
        VolatilityLevel::Moderate => format!(
            "Volatility is moderate at {:.1}%, so period-to-period movement should be expected.",
            result.volatility_pct
        ),
        VolatilityLevel::High => format!(
            "Volatility is high at {:.1}%, signalling substantial uncertainty between periods.",
            result.volatility_pct
        ),
    });

    let interaction = match (result.trend, volatility) {
        (TrendDirection::Upward, VolatilityLevel::High) => {
            Some("Growth is uneven: sharp swings around the upward path may hide short-term setbacks.")
        }
        (TrendDirection::Upward, VolatilityLevel::Low) => {
            Some("The increase is smooth and consistent across periods.")
        }
        (TrendDirection::Downward, VolatilityLevel::High) => {
            Some("The decline comes with large swings, raising the risk of abrupt drops.")
        }
        (TrendDirection::Downward, VolatilityLevel::Low) => {
            Some("The decrease is gradual and consistent across periods.")
        }
        (TrendDirection::Stable, VolatilityLevel::High) => {
            Some("Although the end points are close, values swing widely in between.")
        }
        (TrendDirection::Stable, VolatilityLevel::Low) => {
            Some("The outlook is steady with minimal fluctuation across the horizon.")
        }
        _ => None,
    };
    if let Some(sentence) = interaction {
        insights.push(sentence.to_string());
    }

    if result.has_seasonality {
        insights.push(format!(
            "A recurring pattern was detected across {} consecutive windows; this is an approximate heuristic rather than a spectral test.",
            result.window_means.len()
        ));
    }

    if let Some(width) = result.avg_band_width_pct {
        insights.push(format!(
            "The confidence band averages {:.1}% of the predicted value.",
            width
        ));
    }

    insights
}

/// Ranked recommendations.
///
/// Trend selects growth, contraction or steady-state actions; monitoring
/// cadence and deviation alerts are always appended, and a contingency plan
/// follows when volatility exceeds [`CONTINGENCY_VOLATILITY_PCT`].
pub(crate) fn generate_recommendations(result: &AnalysisResult) -> Vec<String> {
    if result.trend == TrendDirection::InsufficientData {
        return vec![
            "Provide at least two forecast periods so that trend and volatility can be assessed."
                .to_string(),
        ];
    }

    let volatility = VolatilityLevel::from_pct(result.volatility_pct);
    let mut recommendations = Vec::with_capacity(5);

    match result.trend {
        TrendDirection::Upward => {
            recommendations.push(format!(
                "Scale capacity and inventory ahead of the projected {:.1}% increase.",
                result.trend_pct
            ));
            recommendations.push(
                "Prioritise investments that capture demand during the growth window.".to_string(),
            );
        }
        TrendDirection::Downward => {
            recommendations.push(format!(
                "Review the cost base ahead of the projected {:.1}% decline.",
                result.trend_pct.abs()
            ));
            recommendations.push(
                "Identify the drivers behind the contraction and prepare mitigation actions."
                    .to_string(),
            );
        }
        _ => {
            recommendations.push(
                "Maintain current operating plans; no material change is projected.".to_string(),
            );
            recommendations.push(
                "Use the steady period to pursue efficiency improvements.".to_string(),
            );
        }
    }

    recommendations.push(format!(
        "Review the forecast {} as new actuals become available.",
        volatility.monitoring_cadence()
    ));
    recommendations.push(format!(
        "Alert stakeholders when actuals deviate more than {}% from the predicted values.",
        volatility.alert_threshold_pct()
    ));

    if result.volatility_pct > CONTINGENCY_VOLATILITY_PCT {
        recommendations.push(format!(
            "Prepare contingency plans for outcomes near the forecast trough ({}) and peak ({}).",
            format_fixed2(result.trough),
            format_fixed2(result.peak)
        ));
    }

    recommendations
}
