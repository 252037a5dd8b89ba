//! Section builders.
//!
//! Each builder starts its own [`Section`] on the shared [`LayoutEngine`]
//! and places its content in reading order.

use super::branding::BrandingImage;
use crate::analysis::AnalysisResult;
use crate::config::{COVER_LINE_SCALE, PageSettings, ReportConfig, TITLE_FONT_SIZE};
use crate::layout::{
    CHART_PLACEHOLDER, HEADING_LINE_SCALE, LayoutEngine, Section, TableStyle, TextStyle,
};
use crate::raster::{ChartKind, ChartRasterizer, ChartSeries, ChartSpec, PALETTE, RasterOutcome};
use crate::tabular::{FlattenOptions, flatten_entries, format_number};
use crate::types::{ReportRequest, TableRow};
use crate::utils::format_signed_pct;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Number, Value, json};
use tracing::{debug, info};

const TITLE_SIZE: f64 = TITLE_FONT_SIZE;
const H1_SIZE: f64 = 18.0;
const H2_SIZE: f64 = 13.0;
const CAPTION_SIZE: f64 = 11.0;
const RULE_COLOR: [u8; 3] = [203, 213, 225];
const LOGO_MAX_WIDTH: f64 = 160.0;
const LOGO_MAX_HEIGHT: f64 = 80.0;
const SECTION_GAP: f64 = 12.0;

/// Shared inputs of every section builder.
#[derive(Debug, Clone, Copy)]
pub struct SectionContext<'a> {
    pub config: &'a ReportConfig,
    pub request: &'a ReportRequest,
    pub analysis: &'a AnalysisResult,
    pub generated_on: NaiveDate,
}

impl SectionContext<'_> {
    fn body(&self) -> TextStyle {
        TextStyle::body(self.config.body_font_size)
    }

    fn line_height(&self) -> f64 {
        self.config.line_height
    }

    fn table_style(&self) -> TableStyle {
        TableStyle::new(self.config.table_row_height, self.config.body_font_size - 1.0)
    }

    fn heading(&self, layout: &mut LayoutEngine, text: &str, size: f64) -> crate::Result<()> {
        layout.place_heading(text, TextStyle::heading(size), self.line_height() * 2.0)
    }
}

/// Outcome of the chart section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChartSummary {
    pub rendered: usize,
    pub unavailable: usize,
}

// =============================================================================
// Cover
// =============================================================================

pub fn cover(
    layout: &mut LayoutEngine,
    ctx: &SectionContext<'_>,
    branding: Option<&BrandingImage>,
) -> crate::Result<()> {
    layout.begin_section(Section::Cover)?;
    let meta = &ctx.request.metadata;

    if let Some(logo) = branding {
        let scale = (LOGO_MAX_WIDTH / logo.width as f64).min(LOGO_MAX_HEIGHT / logo.height as f64);
        let (w, h) = (logo.width as f64 * scale, logo.height as f64 * scale);
        layout.place_image(logo.png.clone(), w, h)?;
    }

    layout.add_space(layout.settings().content_height() * 0.2)?;
    layout.place_heading(
        ctx.request.kind.title(),
        TextStyle::heading(TITLE_SIZE).centered(),
        0.0,
    )?;
    layout.place_heading(
        &meta.target_variable,
        TextStyle::heading(H2_SIZE + 3.0).centered(),
        0.0,
    )?;
    layout.add_space(SECTION_GAP * 2.0)?;

    let mut lines = Vec::new();
    if !meta.scenario.trim().is_empty() {
        lines.push(format!("Scenario: {}", meta.scenario.trim()));
    }
    if !meta.model_id.trim().is_empty() {
        lines.push(format!("Model: {}", meta.model_id.trim()));
    }
    lines.push(format!(
        "Confidence level: {}%",
        format_number(meta.confidence_level * 100.0)
    ));
    if !meta.prepared_for.trim().is_empty() {
        lines.push(format!("Prepared for: {}", meta.prepared_for.trim()));
    }
    lines.push(format!("Generated: {}", ctx.generated_on.format("%Y-%m-%d")));

    layout.place_text(
        &lines,
        ctx.line_height() * COVER_LINE_SCALE,
        TextStyle::muted(ctx.config.body_font_size + 1.0).centered(),
    )
}

// =============================================================================
// Executive summary
// =============================================================================

/// Metric/value pairs shown in the summary table.
pub fn summary_metrics(ctx: &SectionContext<'_>) -> Vec<(String, String)> {
    let a = ctx.analysis;
    if !a.is_sufficient() {
        return vec![
            ("Trend".to_string(), a.trend.label().to_string()),
            ("Usable values".to_string(), a.points.to_string()),
        ];
    }

    let mut metrics = vec![
        ("Trend".to_string(), a.trend.label().to_string()),
        ("Change (first to last)".to_string(), format_signed_pct(a.trend_pct)),
        ("Peak".to_string(), format_number(a.peak)),
        ("Trough".to_string(), format_number(a.trough)),
        ("Mean".to_string(), format_number(a.mean)),
        (
            "Volatility".to_string(),
            format!("{:.1}% ({})", a.volatility_pct, a.volatility_level().label()),
        ),
        (
            "Seasonality".to_string(),
            if a.has_seasonality {
                "Detected (approximate)".to_string()
            } else {
                "Not detected".to_string()
            },
        ),
    ];
    if let Some(width) = a.avg_band_width_pct {
        metrics.push(("Average band width".to_string(), format!("{:.1}%", width)));
    }
    metrics.push((
        "Confidence level".to_string(),
        format!("{}%", format_number(ctx.request.metadata.confidence_level * 100.0)),
    ));
    metrics
}

pub fn executive_summary(layout: &mut LayoutEngine, ctx: &SectionContext<'_>) -> crate::Result<()> {
    layout.begin_section(Section::ExecutiveSummary)?;
    ctx.heading(layout, "Executive Summary", H1_SIZE)?;
    layout.place_rule(RULE_COLOR)?;
    layout.add_space(SECTION_GAP / 2.0)?;

    let series = &ctx.request.series;
    let overview = match (series.period.first(), series.period.last()) {
        (Some(first), Some(last)) => format!(
            "This report analyses {} forecast periods of {} from {} to {}.",
            series.len(),
            ctx.request.metadata.target_variable,
            first,
            last
        ),
        _ => format!(
            "No forecast periods were supplied for {}.",
            ctx.request.metadata.target_variable
        ),
    };
    layout.place_paragraph(&overview, ctx.line_height(), ctx.body())?;
    layout.add_space(SECTION_GAP)?;

    let width = layout.settings().content_width();
    let header = vec!["Metric".to_string(), "Value".to_string()];
    let rows: Vec<Vec<String>> = summary_metrics(ctx)
        .into_iter()
        .map(|(metric, value)| vec![metric, value])
        .collect();
    layout.place_table(&header, &rows, &[width * 0.5, width * 0.5], ctx.table_style())?;
    layout.add_space(SECTION_GAP)?;

    ctx.heading(layout, "Key Insights", H2_SIZE)?;
    for insight in &ctx.analysis.insights {
        layout.place_paragraph(&format!("- {}", insight), ctx.line_height(), ctx.body())?;
    }
    Ok(())
}

// =============================================================================
// Charts
// =============================================================================

/// Charts requested for a report, in document order.
pub fn chart_specs(request: &ReportRequest) -> Vec<ChartSpec> {
    let series = &request.series;
    let target = &request.metadata.target_variable;

    let mut forecast = ChartSpec::new(ChartKind::Line, series.period.clone())
        .with_title(format!("Forecast for {}", target))
        .with_series(ChartSeries::new("Predicted", series.predicted.clone(), PALETTE[0]));
    if let (Some(lower), Some(upper)) = (&series.lower_bound, &series.upper_bound) {
        forecast = forecast.with_band(lower.clone(), upper.clone(), PALETTE[0]);
    }

    let by_period = ChartSpec::new(ChartKind::Bar, series.period.clone())
        .with_title("Predicted value by period")
        .with_series(ChartSeries::new("Predicted", series.predicted.clone(), PALETTE[1]));

    vec![forecast, by_period]
}

/// Display size of a chart, shrunk so that its caption and image share one
/// page body.
fn chart_box(settings: &PageSettings, config: &ReportConfig, caption_height: f64) -> (f64, f64) {
    let width = config.chart_display_width.min(settings.content_width());
    let height = width * config.chart_size.aspect_ratio();
    let max_height = (settings.content_height() - caption_height).max(0.0);
    if height > max_height {
        (width * max_height / height, max_height)
    } else {
        (width, height)
    }
}

/// Rasterize and place every chart sequentially.
///
/// A chart that cannot be rendered is replaced by a placeholder; later
/// charts are unaffected. `on_chart(index, total, title)` runs before each
/// chart and stops the section when it returns an error.
pub async fn charts<F>(
    layout: &mut LayoutEngine,
    ctx: &SectionContext<'_>,
    rasterizer: &ChartRasterizer,
    mut on_chart: F,
) -> crate::Result<ChartSummary>
where
    F: FnMut(usize, usize, &str) -> crate::Result<()>,
{
    layout.begin_section(Section::Charts)?;
    ctx.heading(layout, "Forecast Charts", H1_SIZE)?;
    layout.place_rule(RULE_COLOR)?;
    layout.add_space(SECTION_GAP / 2.0)?;

    let caption_height = CAPTION_SIZE * HEADING_LINE_SCALE;
    let (width, height) = chart_box(layout.settings(), ctx.config, caption_height);

    let specs = chart_specs(ctx.request);
    let total = specs.len();
    let mut summary = ChartSummary::default();
    for (index, spec) in specs.into_iter().enumerate() {
        on_chart(index, total, &spec.options.title)?;
        if !layout.fits(caption_height + height) && !layout.cursor().at_page_top() {
            layout.page_break()?;
        }
        layout.place_text(
            std::slice::from_ref(&spec.options.title),
            caption_height,
            TextStyle::heading(CAPTION_SIZE),
        )?;

        match rasterizer.rasterize(&spec, ctx.config.chart_size).await {
            RasterOutcome::Image(image) => {
                layout.place_image(image.png, width, height)?;
                summary.rendered += 1;
            }
            RasterOutcome::Unavailable { reason } => {
                debug!("Placing placeholder for '{}': {}", spec.options.title, reason);
                layout.place_placeholder(CHART_PLACEHOLDER, height)?;
                summary.unavailable += 1;
            }
        }
        layout.add_space(SECTION_GAP)?;
    }

    info!(
        "Charts placed: {} rendered, {} unavailable",
        summary.rendered, summary.unavailable
    );
    Ok(summary)
}

// =============================================================================
// Data tables
// =============================================================================

fn number_value(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

/// Display rows of the per-period forecast table.
pub fn forecast_rows(request: &ReportRequest) -> (Vec<String>, Vec<Vec<String>>) {
    let series = &request.series;
    let with_bounds = series.has_bounds();

    let mut header = vec!["Period".to_string(), "Predicted".to_string()];
    if with_bounds {
        header.push("Lower bound".to_string());
        header.push("Upper bound".to_string());
    }

    let options = FlattenOptions::default();
    let rows = series
        .period
        .iter()
        .enumerate()
        .map(|(i, period)| {
            let at = |values: &Option<Vec<f64>>| {
                values
                    .as_ref()
                    .and_then(|v| v.get(i).copied())
                    .map(number_value)
                    .unwrap_or(Value::Null)
            };
            let predicted = series.predicted.get(i).copied().map(number_value).unwrap_or(Value::Null);
            let mut entries = vec![("Predicted", predicted)];
            if with_bounds {
                entries.push(("Lower bound", at(&series.lower_bound)));
                entries.push(("Upper bound", at(&series.upper_bound)));
            }

            let mut cells = vec![period.clone()];
            cells.extend(
                flatten_entries(entries.iter().map(|(k, v)| (*k, v)), &options)
                    .into_iter()
                    .map(|row| row.value),
            );
            cells
        })
        .collect();

    (header, rows)
}

/// Flattened statistics rows: the analysis plus request metadata.
pub fn statistics_rows(request: &ReportRequest, analysis: &AnalysisResult) -> Vec<TableRow> {
    let meta = &request.metadata;
    let optional = |s: &str| {
        if s.trim().is_empty() {
            Value::Null
        } else {
            Value::String(s.trim().to_string())
        }
    };

    let band = match analysis.avg_band_width_pct {
        Some(width) => json!({ "avg_width_pct": number_value(width) }),
        None => Value::Null,
    };

    let entries: Vec<(&str, Value)> = vec![
        ("target", Value::String(meta.target_variable.clone())),
        ("scenario", optional(&meta.scenario)),
        ("model", optional(&meta.model_id)),
        ("confidence_level", number_value(meta.confidence_level)),
        ("periods", json!(request.series.len())),
        (
            "trend",
            json!({
                "direction": analysis.trend.as_str(),
                "change_pct": number_value(analysis.trend_pct),
                "first": number_value(analysis.first),
                "last": number_value(analysis.last),
            }),
        ),
        (
            "range",
            json!({
                "peak": number_value(analysis.peak),
                "trough": number_value(analysis.trough),
                "mean": number_value(analysis.mean),
            }),
        ),
        (
            "volatility",
            json!({
                "pct": number_value(analysis.volatility_pct),
                "level": analysis.volatility_level().as_str(),
            }),
        ),
        (
            "seasonality",
            json!({
                "detected": analysis.has_seasonality,
                "window_means": analysis.window_means.iter().copied().map(number_value).collect::<Vec<_>>(),
            }),
        ),
        ("band", band),
    ];

    flatten_entries(entries.iter().map(|(k, v)| (*k, v)), &FlattenOptions::default())
}

pub fn data_tables(
    layout: &mut LayoutEngine,
    ctx: &SectionContext<'_>,
    statistics: &[TableRow],
) -> crate::Result<()> {
    layout.begin_section(Section::DataTable)?;
    ctx.heading(layout, "Forecast Data", H1_SIZE)?;
    layout.place_rule(RULE_COLOR)?;
    layout.add_space(SECTION_GAP / 2.0)?;

    let width = layout.settings().content_width();
    let (header, rows) = forecast_rows(ctx.request);
    if rows.is_empty() {
        layout.place_paragraph("No forecast periods were supplied.", ctx.line_height(), ctx.body())?;
    } else {
        let value_share = 0.6 / (header.len() - 1) as f64;
        let mut widths = vec![width * 0.4];
        widths.extend(std::iter::repeat_n(width * value_share, header.len() - 1));
        let pages = layout.place_table(&header, &rows, &widths, ctx.table_style())?;
        debug!("Forecast table spans {} page(s)", pages);
    }
    layout.add_space(SECTION_GAP * 1.5)?;

    ctx.heading(layout, "Forecast Statistics", H2_SIZE)?;
    let header = vec!["Group".to_string(), "Field".to_string(), "Value".to_string()];
    let rows: Vec<Vec<String>> = statistics
        .iter()
        .map(|r| vec![r.group.clone(), r.field.clone(), r.value.clone()])
        .collect();
    let pages = layout.place_table(
        &header,
        &rows,
        &[width * 0.25, width * 0.3, width * 0.45],
        ctx.table_style(),
    )?;
    debug!("Statistics table spans {} page(s)", pages);
    Ok(())
}

// =============================================================================
// Recommendations
// =============================================================================

pub fn recommendations(layout: &mut LayoutEngine, ctx: &SectionContext<'_>) -> crate::Result<()> {
    layout.begin_section(Section::Recommendations)?;
    ctx.heading(layout, "Recommendations", H1_SIZE)?;
    layout.place_rule(RULE_COLOR)?;
    layout.add_space(SECTION_GAP / 2.0)?;

    for (i, recommendation) in ctx.analysis.recommendations.iter().enumerate() {
        layout.place_paragraph(
            &format!("{}. {}", i + 1, recommendation),
            ctx.line_height(),
            ctx.body(),
        )?;
        layout.add_space(ctx.line_height() / 3.0)?;
    }

    layout.add_space(SECTION_GAP)?;
    ctx.heading(layout, "Methodology", H2_SIZE)?;
    layout.place_paragraph(
        "Trend compares the first and last usable forecast values; changes within 5% are treated as stable. \
         Volatility is the spread between peak and trough relative to their midpoint. \
         Seasonality is an approximate heuristic over consecutive three-period windows and is only evaluated from twelve periods upward.",
        ctx.line_height(),
        TextStyle::muted(ctx.config.body_font_size - 1.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::types::{ForecastSeries, ReportMetadata};

    fn request(values: &[f64]) -> ReportRequest {
        ReportRequest::new(ForecastSeries::from_values(values), ReportMetadata::default())
    }

    #[test]
    fn test_forecast_rows_without_bounds() {
        let (header, rows) = forecast_rows(&request(&[1200.0, 1250.5]));
        assert_eq!(header, vec!["Period", "Predicted"]);
        assert_eq!(rows[0], vec!["P1", "1,200"]);
        assert_eq!(rows[1], vec!["P2", "1250.50"]);
    }

    #[test]
    fn test_forecast_rows_with_bounds_and_missing_values() {
        let series = ForecastSeries::from_values(&[10.0, f64::NAN])
            .with_bounds(vec![8.0, f64::NAN], vec![12.0, f64::NAN]);
        let req = ReportRequest::new(series, ReportMetadata::default());
        let (header, rows) = forecast_rows(&req);
        assert_eq!(header.len(), 4);
        assert_eq!(rows[0], vec!["P1", "10", "8", "12"]);
        assert_eq!(rows[1], vec!["P2", "N/A", "N/A", "N/A"]);
    }

    #[test]
    fn test_statistics_rows_are_display_safe() {
        let req = request(&[100.0, 105.0, 95.0, 120.0, 130.0, 125.0]);
        let analysis = analyze(&req.series);
        let rows = statistics_rows(&req, &analysis);

        assert!(rows.contains(&TableRow::new("trend", "direction", "upward")));
        assert!(rows.contains(&TableRow::new("range", "peak", "130")));
        assert!(rows.contains(&TableRow::new("scenario", "scenario", "N/A")));
        assert!(rows.contains(&TableRow::new("band", "band", "N/A")));
        assert!(rows.contains(&TableRow::new("seasonality", "window_means", "[]")));
        assert!(rows.iter().all(|r| !r.value.is_empty()));
    }

    #[test]
    fn test_chart_specs_add_band_only_with_bounds() {
        let plain = chart_specs(&request(&[1.0, 2.0]));
        assert_eq!(plain.len(), 2);
        assert!(plain[0].band.is_none());
        assert_eq!(plain[1].kind, ChartKind::Bar);

        let series = ForecastSeries::from_values(&[1.0, 2.0]).with_bounds(vec![0.5, 1.5], vec![1.5, 2.5]);
        let banded = chart_specs(&ReportRequest::new(series, ReportMetadata::default()));
        assert!(banded[0].band.is_some());
    }

    #[test]
    fn test_summary_metrics_for_insufficient_data() {
        let req = request(&[1.0]);
        let analysis = analyze(&req.series);
        let config = ReportConfig::default();
        let ctx = SectionContext {
            config: &config,
            request: &req,
            analysis: &analysis,
            generated_on: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        };
        let metrics = summary_metrics(&ctx);
        assert_eq!(metrics[0].1, "Insufficient data");
    }

    #[test]
    fn test_tall_chart_is_shrunk_to_page_body() {
        let config = ReportConfig::builder().chart_size(480, 960).build().unwrap();
        let settings = config.page;
        let caption = CAPTION_SIZE * HEADING_LINE_SCALE;

        let (width, height) = chart_box(&settings, &config, caption);

        assert!((caption + height - settings.content_height()).abs() < 1e-9);
        assert!((height / width - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_default_chart_keeps_configured_width() {
        let config = ReportConfig::default();
        let (width, height) = chart_box(&config.page, &config, CAPTION_SIZE * HEADING_LINE_SCALE);
        assert_eq!(width, 495.0);
        assert_eq!(height, config.chart_display_height());
    }
}
