//! Configuration types for the report pipeline.
//!
//! Page geometry, text metrics, chart rasterization and artifact output are
//! configured here using the builder pattern.

use crate::analysis::AnalyzerConfig;
use crate::layout::HEADING_LINE_SCALE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Cover detail lines are set at this multiple of [`ReportConfig::line_height`].
pub const COVER_LINE_SCALE: f64 = 1.3;

/// Font size of the report title, the largest heading in a report.
pub const TITLE_FONT_SIZE: f64 = 24.0;

/// Page geometry in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSettings {
    pub width: f64,
    pub height: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
}

impl Default for PageSettings {
    /// A4 portrait.
    fn default() -> Self {
        Self {
            width: 595.0,
            height: 842.0,
            margin_top: 50.0,
            margin_right: 50.0,
            margin_bottom: 60.0,
            margin_left: 50.0,
        }
    }
}

impl PageSettings {
    /// Width available between the left and right margins.
    pub fn content_width(&self) -> f64 {
        self.width - self.margin_left - self.margin_right
    }

    /// Height available between the top and bottom margins.
    pub fn content_height(&self) -> f64 {
        self.height - self.margin_top - self.margin_bottom
    }

    /// Vertical offset past which content must not extend.
    pub fn bottom_limit(&self) -> f64 {
        self.height - self.margin_bottom
    }
}

/// Pixel dimensions of a rasterized chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.width == 0 {
            return 0.0;
        }
        self.height as f64 / self.width as f64
    }
}

impl Default for PixelSize {
    fn default() -> Self {
        Self::new(960, 480)
    }
}

/// Configuration for the report pipeline.
///
/// Use [`ReportConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use forecast_report::config::ReportConfig;
///
/// let config = ReportConfig::builder()
///     .product_name("Acme Forecasts")
///     .output_dir("reports")
///     .export_table(false)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Page geometry.
    /// Default: A4 portrait, margins 50/50/60/50
    pub page: PageSettings,

    /// Body text size in points.
    /// Default: 10.0
    pub body_font_size: f64,

    /// Estimated line height for text blocks.
    /// Default: 14.0
    pub line_height: f64,

    /// Height of every table row, header included.
    /// Default: 18.0
    pub table_row_height: f64,

    /// Rasterization target for charts.
    /// Default: 960x480
    pub chart_size: PixelSize,

    /// Width a chart occupies on the page; height follows the aspect ratio.
    /// Default: 495.0
    pub chart_display_width: f64,

    /// Upper bound on waiting for a chart's render-complete signal.
    /// Default: 5s
    pub render_timeout: Duration,

    /// Upper bound on fetching the cover branding image.
    /// Default: 3s
    pub branding_timeout: Duration,

    /// Branding image location: a file path or an http(s) URL.
    /// Default: None
    pub branding: Option<String>,

    /// Attribution stamped into every footer.
    /// Default: "Forecast Studio"
    pub product_name: String,

    /// Directory for generated artifacts.
    /// Default: "outputs"
    pub output_dir: PathBuf,

    /// Whether to write the flat CSV table export next to the document.
    /// Default: true
    pub export_table: bool,

    /// Whether to write artifacts to disk.
    /// When false, the document is only returned as bytes.
    /// Default: true
    pub save_to_disk: bool,

    /// Seasonality heuristic settings.
    pub analyzer: AnalyzerConfig,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            page: PageSettings::default(),
            body_font_size: 10.0,
            line_height: 14.0,
            table_row_height: 18.0,
            chart_size: PixelSize::default(),
            chart_display_width: 495.0,
            render_timeout: Duration::from_secs(5),
            branding_timeout: Duration::from_secs(3),
            branding: None,
            product_name: "Forecast Studio".to_string(),
            output_dir: PathBuf::from("outputs"),
            export_table: true,
            save_to_disk: true,
            analyzer: AnalyzerConfig::default(),
        }
    }
}

impl ReportConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder::default()
    }

    /// Height a chart occupies on the page.
    pub fn chart_display_height(&self) -> f64 {
        self.chart_display_width * self.chart_size.aspect_ratio()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let page = &self.page;
        if page.width <= 0.0 || page.height <= 0.0 {
            return Err(ConfigValidationError::InvalidPageSize {
                width: page.width,
                height: page.height,
            });
        }

        for (field, value) in [
            ("margin_top", page.margin_top),
            ("margin_right", page.margin_right),
            ("margin_bottom", page.margin_bottom),
            ("margin_left", page.margin_left),
        ] {
            if value < 0.0 {
                return Err(ConfigValidationError::NonPositive {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if page.content_width() <= 0.0 || page.content_height() <= 0.0 {
            return Err(ConfigValidationError::EmptyBody {
                width: page.content_width(),
                height: page.content_height(),
            });
        }

        for (field, value) in [
            ("body_font_size", self.body_font_size),
            ("line_height", self.line_height),
            ("table_row_height", self.table_row_height),
            ("chart_display_width", self.chart_display_width),
        ] {
            if value <= 0.0 || !value.is_finite() {
                return Err(ConfigValidationError::NonPositive {
                    field: field.to_string(),
                    value,
                });
            }
        }

        // Every text line must fit on an empty page body.
        let tallest_line =
            (self.line_height * COVER_LINE_SCALE).max(TITLE_FONT_SIZE * HEADING_LINE_SCALE);
        if tallest_line > page.content_height() {
            return Err(ConfigValidationError::LineTooTall {
                line_height: tallest_line,
                body: page.content_height(),
            });
        }

        if self.table_row_height * 2.0 > page.content_height() {
            return Err(ConfigValidationError::RowTooTall(self.table_row_height));
        }

        if self.chart_size.width == 0 || self.chart_size.height == 0 {
            return Err(ConfigValidationError::InvalidChartSize(self.chart_size));
        }

        if self.render_timeout.is_zero() {
            return Err(ConfigValidationError::ZeroTimeout(
                "render_timeout".to_string(),
            ));
        }

        if self.branding_timeout.is_zero() {
            return Err(ConfigValidationError::ZeroTimeout(
                "branding_timeout".to_string(),
            ));
        }

        if self.analyzer.season_window == 0 {
            return Err(ConfigValidationError::InvalidSeasonWindow);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid page size {width}x{height} (both sides must be positive)")]
    InvalidPageSize { width: f64, height: f64 },

    #[error("Margins leave no body area ({width}x{height})")]
    EmptyBody { width: f64, height: f64 },

    #[error("Invalid value for '{field}': {value} (must be positive)")]
    NonPositive { field: String, value: f64 },

    #[error("Line height {line_height} does not fit the page body ({body})")]
    LineTooTall { line_height: f64, body: f64 },

    #[error("Table row height {0} leaves no room for a header and a body row")]
    RowTooTall(f64),

    #[error("Invalid chart size {}x{} (must be non-zero)", .0.width, .0.height)]
    InvalidChartSize(PixelSize),

    #[error("Timeout '{0}' must be non-zero")]
    ZeroTimeout(String),

    #[error("Season window must be at least 1")]
    InvalidSeasonWindow,
}

/// Builder for [`ReportConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ReportConfigBuilder {
    page: Option<PageSettings>,
    body_font_size: Option<f64>,
    line_height: Option<f64>,
    table_row_height: Option<f64>,
    chart_size: Option<PixelSize>,
    chart_display_width: Option<f64>,
    render_timeout: Option<Duration>,
    branding_timeout: Option<Duration>,
    branding: Option<String>,
    product_name: Option<String>,
    output_dir: Option<PathBuf>,
    export_table: Option<bool>,
    save_to_disk: Option<bool>,
    analyzer: Option<AnalyzerConfig>,
}

impl ReportConfigBuilder {
    /// Set the page geometry.
    pub fn page(mut self, page: PageSettings) -> Self {
        self.page = Some(page);
        self
    }

    pub fn body_font_size(mut self, size: f64) -> Self {
        self.body_font_size = Some(size);
        self
    }

    pub fn line_height(mut self, height: f64) -> Self {
        self.line_height = Some(height);
        self
    }

    pub fn table_row_height(mut self, height: f64) -> Self {
        self.table_row_height = Some(height);
        self
    }

    /// Set the pixel size charts are rasterized at.
    pub fn chart_size(mut self, width: u32, height: u32) -> Self {
        self.chart_size = Some(PixelSize::new(width, height));
        self
    }

    pub fn chart_display_width(mut self, width: f64) -> Self {
        self.chart_display_width = Some(width);
        self
    }

    /// Set the bound on waiting for a chart to finish rendering.
    pub fn render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = Some(timeout);
        self
    }

    /// Set the bound on fetching the branding image.
    pub fn branding_timeout(mut self, timeout: Duration) -> Self {
        self.branding_timeout = Some(timeout);
        self
    }

    /// Set the branding image location (file path or http(s) URL).
    pub fn branding(mut self, location: impl Into<String>) -> Self {
        self.branding = Some(location.into());
        self
    }

    /// Set the attribution stamped into every footer.
    pub fn product_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }

    /// Set the output directory for artifacts.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Enable or disable the CSV table export.
    pub fn export_table(mut self, export: bool) -> Self {
        self.export_table = Some(export);
        self
    }

    /// Enable or disable writing artifacts to disk.
    ///
    /// When false, the pipeline skips all file I/O and only returns the
    /// document bytes.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Set the seasonality heuristic settings.
    pub fn analyzer(mut self, analyzer: AnalyzerConfig) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ReportConfig` or an error if validation fails.
    pub fn build(self) -> Result<ReportConfig, ConfigValidationError> {
        let defaults = ReportConfig::default();
        let config = ReportConfig {
            page: self.page.unwrap_or(defaults.page),
            body_font_size: self.body_font_size.unwrap_or(defaults.body_font_size),
            line_height: self.line_height.unwrap_or(defaults.line_height),
            table_row_height: self.table_row_height.unwrap_or(defaults.table_row_height),
            chart_size: self.chart_size.unwrap_or(defaults.chart_size),
            chart_display_width: self
                .chart_display_width
                .unwrap_or(defaults.chart_display_width),
            render_timeout: self.render_timeout.unwrap_or(defaults.render_timeout),
            branding_timeout: self.branding_timeout.unwrap_or(defaults.branding_timeout),
            branding: self.branding.or(defaults.branding),
            product_name: self.product_name.unwrap_or(defaults.product_name),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            export_table: self.export_table.unwrap_or(defaults.export_table),
            save_to_disk: self.save_to_disk.unwrap_or(defaults.save_to_disk),
            analyzer: self.analyzer.unwrap_or(defaults.analyzer),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReportConfig::default();
        assert_eq!(config.page.width, 595.0);
        assert_eq!(config.page.height, 842.0);
        assert_eq!(config.page.content_height(), 732.0);
        assert_eq!(config.page.content_width(), 495.0);
        assert_eq!(config.chart_size, PixelSize::new(960, 480));
        assert_eq!(config.product_name, "Forecast Studio");
        assert!(config.export_table);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_chart_display_height_keeps_aspect_ratio() {
        let config = ReportConfig::default();
        assert_eq!(config.chart_display_height(), 247.5);
    }

    #[test]
    fn test_builder_custom_values() {
        let config = ReportConfig::builder()
            .product_name("Acme")
            .table_row_height(20.0)
            .chart_size(800, 400)
            .render_timeout(Duration::from_millis(250))
            .save_to_disk(false)
            .build()
            .unwrap();

        assert_eq!(config.product_name, "Acme");
        assert_eq!(config.table_row_height, 20.0);
        assert_eq!(config.chart_size.width, 800);
        assert_eq!(config.render_timeout, Duration::from_millis(250));
        assert!(!config.save_to_disk);
    }

    #[test]
    fn test_validation_rejects_margins_without_body() {
        let page = PageSettings {
            margin_top: 500.0,
            margin_bottom: 400.0,
            ..PageSettings::default()
        };
        let result = ReportConfig::builder().page(page).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyBody { .. }
        ));
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let result = ReportConfig::builder()
            .render_timeout(Duration::ZERO)
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::ZeroTimeout(ref field) if field == "render_timeout"
        ));
    }

    #[test]
    fn test_validation_rejects_zero_chart_size() {
        let result = ReportConfig::builder().chart_size(0, 480).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidChartSize(_)
        ));
    }

    #[test]
    fn test_validation_rejects_non_positive_line_height() {
        let result = ReportConfig::builder().line_height(0.0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::NonPositive { ref field, .. } if field == "line_height"
        ));
    }

    #[test]
    fn test_validation_rejects_line_taller_than_body() {
        let result = ReportConfig::builder().line_height(600.0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::LineTooTall { line_height, body }
                if (line_height - 780.0).abs() < 1e-9 && body == 732.0
        ));
    }

    #[test]
    fn test_validation_rejects_body_shorter_than_title() {
        let page = PageSettings {
            margin_top: 400.0,
            margin_bottom: 420.0,
            ..PageSettings::default()
        };
        let result = ReportConfig::builder()
            .page(page)
            .line_height(5.0)
            .table_row_height(5.0)
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::LineTooTall { .. }
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = ReportConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ReportConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
