//! CLI entry point for forecast report generation.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use forecast_report::{
    ForecastSeries, ReportConfig, ReportKind, ReportMetadata, ReportOutput, ReportPipeline,
    ReportRequest,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Environment variable supplying a default branding location.
const BRANDING_ENV: &str = "FORECAST_REPORT_BRANDING";

/// CLI-compatible report kind enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliReportKind {
    /// Forecast report (`forecast-report-...` artifacts)
    Forecast,
    /// Analysis report (`analysis-report-...` artifacts)
    Analysis,
}

impl From<CliReportKind> for ReportKind {
    fn from(cli: CliReportKind) -> Self {
        match cli {
            CliReportKind::Forecast => ReportKind::Forecast,
            CliReportKind::Analysis => ReportKind::Analysis,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Forecast analysis and paginated PDF report generation",
    long_about = "Analyzes a forecast series and renders a paginated PDF report.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  FORECAST_REPORT_BRANDING    Default cover logo (file path or http(s) URL)\n\n\
                  EXAMPLES:\n  \
                  # Report from a JSON request or bare series\n  \
                  forecast-report -i forecast.json\n\n  \
                  # CSV input with metadata on the command line\n  \
                  forecast-report -i forecast.csv --target Revenue --confidence 0.9\n\n  \
                  # Machine-readable output\n  \
                  forecast-report -i forecast.json --json | jq .analysis.trend"
)]
struct Args {
    /// Forecast input: a JSON request/series or a CSV with
    /// `period,predicted[,lower_bound,upper_bound]` columns
    #[arg(short, long)]
    input: String,

    /// Output directory for the PDF and table export
    #[arg(short, long, default_value = "./outputs")]
    output: String,

    /// Kind of report, used in the artifact name and title
    #[arg(long, value_enum)]
    kind: Option<CliReportKind>,

    /// Name of the forecast target variable
    #[arg(short, long)]
    target: Option<String>,

    /// Scenario description shown on the cover
    #[arg(long)]
    scenario: Option<String>,

    /// Identifier of the model that produced the forecast
    #[arg(long)]
    model: Option<String>,

    /// Confidence level of the bounds, strictly between 0 and 1
    #[arg(long)]
    confidence: Option<f64>,

    /// Audience named on the cover
    #[arg(long)]
    prepared_for: Option<String>,

    /// Cover logo: file path or http(s) URL
    ///
    /// Falls back to FORECAST_REPORT_BRANDING when not given
    #[arg(long)]
    branding: Option<String>,

    /// Skip writing the CSV table export
    #[arg(long)]
    no_table_export: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and the final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logging; only the analysis and artifact paths are printed.
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled so that
/// stdout only carries the JSON result.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    info!("Loading forecast from: {}", args.input);
    let request = apply_overrides(load_request(&args.input)?, &args);
    info!(
        "Forecast loaded: {} periods for '{}'",
        request.series.len(),
        request.metadata.target_variable
    );

    let mut config_builder = ReportConfig::builder()
        .output_dir(&args.output)
        .export_table(!args.no_table_export);

    let branding = args
        .branding
        .clone()
        .or_else(|| std::env::var(BRANDING_ENV).ok().filter(|v| !v.trim().is_empty()));
    if let Some(location) = branding {
        debug!("Using branding from {}", location);
        config_builder = config_builder.branding(location);
    }

    let config = config_builder.build()?;
    let pipeline = build_pipeline(&args, config)?;

    match pipeline.generate(request).await {
        Ok(output) => {
            if args.json {
                print_json(&output)?;
            } else {
                print_human_readable_summary(&output);
            }
            Ok(())
        }
        Err(e) => {
            error!("Report generation failed: {}", e);
            Err(anyhow!("Report generation failed: {}", e))
        }
    }
}

fn build_pipeline(args: &Args, config: ReportConfig) -> Result<ReportPipeline> {
    let mut builder = ReportPipeline::builder().config(config);

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Load a request from JSON (full request or bare series) or CSV.
fn load_request(path: &str) -> Result<ReportRequest> {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("csv") => {
            let df = load_csv(path)?;
            debug!("CSV shape: {:?}", df.shape());
            let series = ForecastSeries::from_frame(&df)?;
            Ok(ReportRequest::new(series, ReportMetadata::default()))
        }
        _ => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Could not read {}", path))?;
            parse_json_request(&content)
        }
    }
}

fn parse_json_request(content: &str) -> Result<ReportRequest> {
    match serde_json::from_str::<ReportRequest>(content) {
        Ok(request) => Ok(request),
        Err(request_err) => {
            debug!("Not a full request ({}), trying a bare series", request_err);
            let series: ForecastSeries = serde_json::from_str(content)
                .context("Input is neither a report request nor a forecast series")?;
            Ok(ReportRequest::new(series, ReportMetadata::default()))
        }
    }
}

fn load_csv(path: &str) -> Result<DataFrame> {
    Ok(CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()?)
}

/// Command-line metadata takes precedence over the input file.
fn apply_overrides(mut request: ReportRequest, args: &Args) -> ReportRequest {
    let meta = &mut request.metadata;
    if let Some(target) = &args.target {
        meta.target_variable = target.clone();
    }
    if let Some(scenario) = &args.scenario {
        meta.scenario = scenario.clone();
    }
    if let Some(model) = &args.model {
        meta.model_id = model.clone();
    }
    if let Some(confidence) = args.confidence {
        meta.confidence_level = confidence;
    }
    if let Some(prepared_for) = &args.prepared_for {
        meta.prepared_for = prepared_for.clone();
    }
    if let Some(kind) = args.kind {
        request.kind = kind.into();
    }
    request
}

fn print_json(output: &ReportOutput) -> Result<()> {
    let payload = json!({
        "file_name": output.file_name,
        "page_count": output.page_count,
        "charts": output.charts,
        "analysis": output.analysis,
        "written": output.written,
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn print_human_readable_summary(output: &ReportOutput) {
    let analysis = &output.analysis;

    println!();
    println!("{}", "=".repeat(80));
    println!("REPORT COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Document: {} ({} pages)", output.file_name, output.page_count);
    println!(
        "Charts:   {} rendered, {} unavailable",
        output.charts.rendered, output.charts.unavailable
    );
    println!();

    println!("Analysis:");
    if analysis.is_sufficient() {
        println!(
            "  Trend:      {} ({:+.2}%)",
            analysis.trend.label(),
            analysis.trend_pct
        );
        println!("  Peak:       {:.2}", analysis.peak);
        println!("  Trough:     {:.2}", analysis.trough);
        println!(
            "  Volatility: {:.2}% ({})",
            analysis.volatility_pct,
            analysis.volatility_level().label()
        );
        println!(
            "  Seasonality: {}",
            if analysis.has_seasonality { "detected" } else { "not detected" }
        );
    } else {
        println!("  Insufficient data for trend analysis");
    }
    println!();

    if !analysis.insights.is_empty() {
        println!("Key Insights:");
        for insight in &analysis.insights {
            println!("  - {}", insight);
        }
        println!();
    }

    if output.written.is_empty() {
        println!("No files written.");
    } else {
        println!("Files:");
        for path in &output.written {
            println!("  {}", path.display());
        }
    }
    println!();
}
