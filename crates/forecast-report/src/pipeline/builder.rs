//! The report pipeline and its builder.

use crate::analysis::analyze_with;
use crate::config::{ConfigValidationError, ReportConfig};
use crate::error::{ReportError, Result};
use crate::layout::LayoutEngine;
use crate::pdf;
use crate::pipeline::progress::{
    CancellationToken, ClosureProgressReporter, ProgressReporter, ProgressUpdate, ReportStage,
};
use crate::raster::{ChartRasterizer, EngineFactory, SoftwareEngineFactory};
use crate::reporting::{
    ArtifactWriter, BrandingSource, ReportOutput, SectionContext, artifact_stem,
    branding_from_location, load_branding, sections,
};
use crate::types::{ReportRequest, TableRow};
use chrono::{Local, NaiveDate};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Turns a forecast series into an analysis and a paginated PDF report.
///
/// Use [`ReportPipeline::builder()`] to create a pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use forecast_report::{ForecastSeries, ReportConfig, ReportMetadata, ReportPipeline, ReportRequest};
///
/// let series = ForecastSeries::from_values(&[100.0, 105.0, 95.0, 120.0, 130.0, 125.0]);
/// let request = ReportRequest::new(series, ReportMetadata::default());
///
/// let output = ReportPipeline::builder()
///     .config(ReportConfig::builder().output_dir("reports").build()?)
///     .on_progress(|update| println!("[{:.0}%] {}", update.progress * 100.0, update.message))
///     .build()?
///     .generate(request)
///     .await?;
/// ```
pub struct ReportPipeline {
    config: ReportConfig,
    rasterizer: ChartRasterizer,
    branding_source: Option<Arc<dyn BrandingSource>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: CancellationToken,
    writer: ArtifactWriter,
}

static_assertions::assert_impl_all!(ReportPipeline: Send, Sync);

impl ReportPipeline {
    pub fn builder() -> ReportPipelineBuilder {
        ReportPipelineBuilder::default()
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Build the report for `request`.
    ///
    /// # Errors
    ///
    /// Returns `Err(ReportError::Cancelled)` if the cancellation token fired,
    /// and the validation error for malformed series or metadata. No
    /// artifact is written when an error is returned.
    pub async fn generate(&self, request: ReportRequest) -> Result<ReportOutput> {
        self.generate_on(request, Local::now().date_naive()).await
    }

    /// Same as [`generate`](Self::generate) with an explicit report date,
    /// which feeds the artifact name and the cover page.
    pub async fn generate_on(&self, request: ReportRequest, generated_on: NaiveDate) -> Result<ReportOutput> {
        match self.generate_internal(request, generated_on).await {
            Ok(output) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Report ready: {} ({} pages)",
                    output.file_name, output.page_count
                )));
                Ok(output)
            }
            Err(e) => {
                if e.is_cancelled() {
                    info!("Report generation cancelled");
                    self.report_progress(ProgressUpdate::cancelled());
                } else {
                    error!("Report generation failed: {}", e);
                    self.report_progress(ProgressUpdate::failed(e.to_string()));
                }
                Err(e)
            }
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(ReportError::Cancelled);
        }
        Ok(())
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    /// Check for cancellation, then announce the start of `stage`.
    fn enter(&self, stage: ReportStage, message: &str) -> Result<()> {
        self.check_cancelled()?;
        debug!("{}", message);
        self.report_progress(ProgressUpdate::new(stage, 0.0, message));
        Ok(())
    }

    async fn generate_internal(&self, request: ReportRequest, generated_on: NaiveDate) -> Result<ReportOutput> {
        let start_time = Instant::now();

        self.enter(ReportStage::Validating, "Validating forecast request...")?;
        request.validate()?;
        info!(
            "Building {} for '{}' ({} periods)",
            request.kind.slug(),
            request.metadata.target_variable,
            request.series.len()
        );

        self.enter(ReportStage::Analyzing, "Analyzing forecast...")?;
        let analysis = analyze_with(&request.series, &self.config.analyzer);
        info!(
            "Analysis: trend {} ({:.2}%), volatility {:.2}%, seasonality {}",
            analysis.trend.as_str(),
            analysis.trend_pct,
            analysis.volatility_pct,
            analysis.has_seasonality
        );

        let ctx = SectionContext {
            config: &self.config,
            request: &request,
            analysis: &analysis,
            generated_on,
        };
        let title = format!(
            "{}: {}",
            request.kind.title(),
            request.metadata.target_variable
        );
        let mut layout = LayoutEngine::new(self.config.page, title, self.config.product_name.clone());

        self.enter(ReportStage::Cover, "Building cover page...")?;
        let branding = match &self.branding_source {
            Some(source) => load_branding(source.as_ref(), self.config.branding_timeout).await,
            None => None,
        };
        sections::cover(&mut layout, &ctx, branding.as_ref())?;

        self.enter(ReportStage::ExecutiveSummary, "Writing executive summary...")?;
        sections::executive_summary(&mut layout, &ctx)?;

        self.enter(ReportStage::Charts, "Rendering charts...")?;
        let charts = sections::charts(&mut layout, &ctx, &self.rasterizer, |index, total, title| {
            self.check_cancelled()?;
            self.report_progress(ProgressUpdate::with_items(
                ReportStage::Charts,
                format!("Chart {}/{}", index + 1, total),
                index,
                total,
                format!("Rendering '{}'", title),
            ));
            Ok(())
        })
        .await?;
        if charts.unavailable > 0 {
            warn!(
                "{} of {} charts replaced by placeholders",
                charts.unavailable,
                charts.rendered + charts.unavailable
            );
        }

        self.enter(ReportStage::DataTables, "Laying out data tables...")?;
        let table_rows = sections::statistics_rows(&request, &analysis);
        sections::data_tables(&mut layout, &ctx, &table_rows)?;

        self.enter(ReportStage::Recommendations, "Writing recommendations...")?;
        sections::recommendations(&mut layout, &ctx)?;

        self.enter(ReportStage::Finalizing, "Finalizing document...")?;
        let document = layout.finalize()?;
        let document_bytes = pdf::render(&document)?;
        let page_count = document.page_count();

        let stem = artifact_stem(request.kind, &request.metadata.target_variable, generated_on);
        let file_name = format!("{}.pdf", stem);

        let written = if self.config.save_to_disk {
            self.enter(ReportStage::Writing, "Saving artifacts...")?;
            self.write_artifacts(&stem, &document_bytes, &table_rows)?
        } else {
            self.check_cancelled()?;
            Vec::new()
        };

        info!(
            "Report '{}' complete: {} pages, {} bytes in {:.2?}",
            file_name,
            page_count,
            document_bytes.len(),
            start_time.elapsed()
        );

        Ok(ReportOutput {
            file_name,
            document_bytes,
            page_count,
            document,
            analysis,
            table_rows,
            charts,
            written,
        })
    }

    /// Write the PDF and, when enabled, the table export. A failed export
    /// removes the PDF again so a failed run leaves nothing behind.
    fn write_artifacts(
        &self,
        stem: &str,
        document_bytes: &[u8],
        table_rows: &[TableRow],
    ) -> Result<Vec<PathBuf>> {
        let pdf_path = self.writer.write_document(stem, document_bytes)?;
        let mut written = vec![pdf_path];

        if self.config.export_table {
            match self.writer.write_table_export(stem, table_rows) {
                Ok(path) => written.push(path),
                Err(e) => {
                    for path in &written {
                        if let Err(remove_err) = std::fs::remove_file(path) {
                            warn!("Could not remove {}: {}", path.display(), remove_err);
                        }
                    }
                    return Err(e);
                }
            }
        }

        Ok(written)
    }
}

/// Builder for [`ReportPipeline`].
#[derive(Default)]
pub struct ReportPipelineBuilder {
    config: Option<ReportConfig>,
    engine_factory: Option<Arc<dyn EngineFactory>>,
    branding_source: Option<Arc<dyn BrandingSource>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: Option<CancellationToken>,
}

static_assertions::assert_impl_all!(ReportPipelineBuilder: Send);

impl ReportPipelineBuilder {
    /// Set the report configuration.
    pub fn config(mut self, config: ReportConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the factory producing one chart render engine per chart.
    ///
    /// Defaults to [`SoftwareEngineFactory`].
    pub fn render_engine_factory(mut self, factory: Arc<dyn EngineFactory>) -> Self {
        self.engine_factory = Some(factory);
        self
    }

    /// Set the cover branding source.
    ///
    /// Takes precedence over the `branding` location in the config.
    pub fn branding_source(mut self, source: Arc<dyn BrandingSource>) -> Self {
        self.branding_source = Some(source);
        self
    }

    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// ```rust,ignore
    /// let pipeline = ReportPipeline::builder()
    ///     .on_progress(|update| {
    ///         println!("[{:.0}%] {:?}: {}", update.progress * 100.0, update.stage, update.message);
    ///     })
    ///     .build()?;
    /// ```
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Set a cancellation token. The pipeline checks it between stages.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<ReportPipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let factory = self.engine_factory.unwrap_or_else(SoftwareEngineFactory::shared);
        let rasterizer = ChartRasterizer::new(factory, config.render_timeout);

        let branding_source = self
            .branding_source
            .or_else(|| config.branding.as_deref().map(branding_from_location));

        let writer = ArtifactWriter::new(config.output_dir.clone());

        Ok(ReportPipeline {
            rasterizer,
            branding_source,
            progress_reporter: self.progress_reporter,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
            writer,
            config,
        })
    }
}
