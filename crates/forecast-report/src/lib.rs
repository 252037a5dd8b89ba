//! Forecast Report Library
//!
//! Turns a forecast time series into a structured statistical analysis and a
//! paginated PDF report mixing narrative text, data tables and rasterized
//! charts.
//!
//! # Overview
//!
//! - **Statistical Analyzer**: trend, range, volatility and a coarse
//!   seasonality check, plus insight and recommendation text
//! - **Tabular Flattener**: nested records to `group / field / value` rows
//! - **Chart Rasterizer**: chart specs to still PNG images with a bounded
//!   wait and a placeholder fallback
//! - **Document Layout Engine**: cursor-based pagination with table
//!   continuation and stamped footers
//! - **Progress Reporting**: stage updates with cancellation support
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use forecast_report::{ForecastSeries, ReportMetadata, ReportPipeline, ReportRequest};
//!
//! let series = ForecastSeries::from_values(&[100.0, 105.0, 95.0, 120.0, 130.0, 125.0]);
//! let request = ReportRequest::new(series, ReportMetadata::default());
//!
//! let output = ReportPipeline::builder().build()?.generate(request).await?;
//!
//! println!("Trend: {}", output.analysis.trend.label());
//! println!("Pages: {}", output.page_count);
//! for path in &output.written {
//!     println!("Saved {}", path.display());
//! }
//! ```
//!
//! # Analysis only
//!
//! The analyzer is a pure function and can be used without building a
//! document:
//!
//! ```rust,ignore
//! use forecast_report::{ForecastSeries, analyze};
//!
//! let result = analyze(&ForecastSeries::from_values(&[10.0, 12.0, 15.0]));
//! assert_eq!(result.trend.as_str(), "upward");
//! ```
//!
//! # Configuration
//!
//! ```rust,ignore
//! use forecast_report::ReportConfig;
//! use std::time::Duration;
//!
//! let config = ReportConfig::builder()
//!     .render_timeout(Duration::from_secs(2))
//!     .branding("https://example.com/logo.png")
//!     .product_name("Acme Forecasts")
//!     .output_dir("reports")
//!     .build()?;
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod layout;
pub mod pdf;
pub mod pipeline;
pub mod raster;
pub mod reporting;
pub mod tabular;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use analysis::{
    AnalysisResult, AnalyzerConfig, TrendDirection, VolatilityLevel, analyze, analyze_with,
};
pub use config::{ConfigValidationError, PageSettings, PixelSize, ReportConfig, ReportConfigBuilder};
pub use error::{ReportError, Result, ResultExt};
pub use layout::{Document, DocumentCursor, LayoutEngine, Page, Section};
pub use pipeline::{
    CancellationToken, ClosureProgressReporter, ProgressReporter, ProgressUpdate, ReportPipeline,
    ReportPipelineBuilder, ReportStage,
};
pub use raster::{
    ChartKind, ChartRasterizer, ChartSpec, EngineFactory, RasterOutcome, RenderEngine,
    SoftwareChartEngine, SoftwareEngineFactory,
};
pub use reporting::{
    ArtifactWriter, BrandingSource, FileBranding, HttpBranding, ReportOutput, artifact_stem,
};
pub use tabular::{FlattenOptions, flatten, flatten_entries, flatten_with, format_value, rows_to_record};
pub use types::{ForecastSeries, ReportKind, ReportMetadata, ReportRequest, TableRow};
