//! End-to-end tests for report generation.

use chrono::NaiveDate;
use forecast_report::layout::{Element, Section, TableStyle};
use forecast_report::raster::{ChartSpec, RasterSurface, RenderEngine, RenderSignal};
use forecast_report::{
    CancellationToken, FileBranding, ForecastSeries, LayoutEngine, PageSettings, ReportConfig,
    ReportError, ReportKind, ReportMetadata, ReportPipeline, ReportRequest, ReportStage,
    TrendDirection, analyze, flatten, rows_to_record,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture(name)).expect("fixture should exist")
}

fn report_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()
}

fn in_memory_config() -> ReportConfig {
    ReportConfig::builder().save_to_disk(false).build().unwrap()
}

fn assert_footers(document: &forecast_report::Document) {
    let total = document.page_count();
    for (i, page) in document.pages.iter().enumerate() {
        assert_eq!(
            page.footer.as_deref(),
            Some(format!("Forecast Studio \u{00B7} Page {} of {}", i + 1, total).as_str())
        );
    }
}

/// Engine whose rendering always fails.
struct FailingEngine {
    disposed: Arc<AtomicUsize>,
}

impl RenderEngine for FailingEngine {
    fn name(&self) -> &str {
        "failing"
    }

    fn start(&mut self, _spec: &ChartSpec, _surface: RasterSurface, done: RenderSignal) {
        let _ = done.send(Err(ReportError::Render("engine crashed".to_string())));
    }

    fn dispose(&mut self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// End-to-end
// =============================================================================

#[tokio::test]
async fn test_quarterly_request_end_to_end() {
    let request: ReportRequest = serde_json::from_str(&read_fixture("quarterly_request.json")).unwrap();
    let pipeline = ReportPipeline::builder().config(in_memory_config()).build().unwrap();

    let output = pipeline.generate_on(request, report_date()).await.unwrap();

    let analysis = &output.analysis;
    assert_eq!(analysis.trend, TrendDirection::Upward);
    assert!((analysis.trend_pct - 25.0).abs() < 1e-9);
    assert_eq!(analysis.peak, 130.0);
    assert_eq!(analysis.trough, 95.0);
    assert!(!analysis.has_seasonality);

    let document = &output.document;
    assert!(document.section_page_count(Section::Cover) >= 1);
    assert_eq!(document.section_page_count(Section::ExecutiveSummary), 1);
    assert!(document.section_page_count(Section::Charts) >= 1);
    assert_eq!(document.section_page_count(Section::DataTable), 1);
    assert_eq!(document.section_page_count(Section::Recommendations), 1);
    assert_eq!(output.page_count, document.page_count());

    let order: Vec<Section> = document.pages.iter().map(|p| p.section).collect();
    let mut sorted = order.clone();
    sorted.sort_by_key(|s| *s as u8);
    assert_eq!(order, sorted, "sections appear in reading order");

    assert_footers(document);
    assert_eq!(output.file_name, "forecast-report-net-revenue-2026-05-01.pdf");
    assert_eq!(output.charts.rendered, 2);
    assert!(output.written.is_empty());

    let bytes = &output.document_bytes;
    assert!(bytes.starts_with(b"%PDF-1.4"));
    assert!(bytes.ends_with(b"%%EOF\n"));
}

#[tokio::test]
async fn test_failing_engine_falls_back_to_placeholders() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let counter = disposed.clone();
    let factory = move || -> Box<dyn RenderEngine> {
        Box::new(FailingEngine {
            disposed: counter.clone(),
        })
    };

    let pipeline = ReportPipeline::builder()
        .config(in_memory_config())
        .render_engine_factory(Arc::new(factory))
        .build()
        .unwrap();

    let series = ForecastSeries::from_values(&[100.0, 105.0, 95.0, 120.0, 130.0, 125.0]);
    let output = pipeline
        .generate(ReportRequest::new(series, ReportMetadata::default()))
        .await
        .unwrap();

    assert_eq!(output.charts.rendered, 0);
    assert_eq!(output.charts.unavailable, 2);
    assert_eq!(disposed.load(Ordering::SeqCst), 2);

    let chart_pages: Vec<_> = output.document.pages_in(Section::Charts).collect();
    assert!(!chart_pages.is_empty());
    let placeholders = chart_pages
        .iter()
        .flat_map(|p| p.text_content())
        .filter(|line| line == "Chart could not be rendered")
        .count();
    assert_eq!(placeholders, 2);
    assert!(chart_pages.iter().all(|p| p.image_count() == 0));

    assert_footers(&output.document);
    let needle = b"(Chart could not be rendered)";
    assert!(
        output
            .document_bytes
            .windows(needle.len())
            .any(|w| w == needle)
    );
}

#[tokio::test]
async fn test_bare_series_with_nulls() {
    let series: ForecastSeries = serde_json::from_str(&read_fixture("bare_series.json")).unwrap();
    assert!(series.has_bounds());
    assert!(series.predicted[1].is_nan());

    let result = analyze(&series);
    assert_eq!(result.points, 3);
    assert_eq!(result.trend, TrendDirection::Upward);

    let pipeline = ReportPipeline::builder().config(in_memory_config()).build().unwrap();
    let output = pipeline
        .generate(ReportRequest::new(series, ReportMetadata::default()))
        .await
        .unwrap();

    let table_text: Vec<String> = output
        .document
        .pages_in(Section::DataTable)
        .flat_map(|p| p.text_content())
        .collect();
    assert!(table_text.iter().any(|l| l == "Period | Predicted | Lower bound | Upper bound"));
    assert!(table_text.iter().any(|l| l == "Feb | N/A | N/A | N/A"));
    assert!(table_text.iter().all(|l| !l.contains("NaN")));
}

// =============================================================================
// Artifacts
// =============================================================================

#[tokio::test]
async fn test_csv_input_writes_pdf_and_table_export() {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(fixture("monthly_series.csv")))
        .unwrap()
        .finish()
        .unwrap();
    let series = ForecastSeries::from_frame(&df).unwrap();
    assert_eq!(series.len(), 12);

    let metadata = ReportMetadata {
        target_variable: "Monthly Bookings".to_string(),
        confidence_level: 0.9,
        ..ReportMetadata::default()
    };
    let request = ReportRequest::new(series, metadata).with_kind(ReportKind::Analysis);

    let dir = tempfile::tempdir().unwrap();
    let config = ReportConfig::builder().output_dir(dir.path()).build().unwrap();
    let pipeline = ReportPipeline::builder().config(config).build().unwrap();

    let output = pipeline.generate_on(request, report_date()).await.unwrap();

    assert!(output.analysis.has_seasonality);
    assert_eq!(output.analysis.window_means.len(), 4);
    assert!(output.analysis.avg_band_width_pct.is_some());

    let stem = "analysis-report-monthly-bookings-2026-05-01";
    assert_eq!(
        output.written,
        vec![
            dir.path().join(format!("{}.pdf", stem)),
            dir.path().join(format!("{}.csv", stem)),
        ]
    );

    let pdf = std::fs::read(&output.written[0]).unwrap();
    assert_eq!(pdf, output.document_bytes);

    let csv = std::fs::read_to_string(&output.written[1]).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("group,field,value"));
    assert_eq!(lines.count(), output.table_rows.len());
    assert!(csv.contains("seasonality,detected,true"));
}

#[tokio::test]
async fn test_table_export_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let config = ReportConfig::builder()
        .output_dir(dir.path())
        .export_table(false)
        .build()
        .unwrap();
    let pipeline = ReportPipeline::builder().config(config).build().unwrap();

    let series = ForecastSeries::from_values(&[5.0, 6.0, 7.0]);
    let output = pipeline
        .generate(ReportRequest::new(series, ReportMetadata::default()))
        .await
        .unwrap();

    assert_eq!(output.written.len(), 1);
    assert_eq!(output.document_path(), output.written.first());
}

#[tokio::test]
async fn test_mismatched_series_leaves_no_artifact() {
    let request: ReportRequest = serde_json::from_str(&read_fixture("mismatched_request.json")).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("reports");
    let config = ReportConfig::builder().output_dir(&out_dir).build().unwrap();
    let pipeline = ReportPipeline::builder().config(config).build().unwrap();

    let err = pipeline.generate(request).await.unwrap_err();

    match err {
        ReportError::MismatchedSeries {
            field,
            expected,
            actual,
        } => {
            assert_eq!(field, "period");
            assert_eq!((expected, actual), (6, 5));
        }
        other => panic!("expected mismatched series, got {:?}", other),
    }
    assert!(!out_dir.exists());
}

#[tokio::test]
async fn test_cancellation_mid_build_writes_nothing() {
    let token = CancellationToken::new();
    let trigger = token.clone();
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("reports");

    let pipeline = ReportPipeline::builder()
        .config(ReportConfig::builder().output_dir(&out_dir).build().unwrap())
        .cancellation_token(token)
        .on_progress(move |update| {
            if update.stage == ReportStage::Charts {
                trigger.cancel();
            }
        })
        .build()
        .unwrap();

    let series = ForecastSeries::from_values(&[1.0, 2.0, 3.0, 4.0]);
    let err = pipeline
        .generate(ReportRequest::new(series, ReportMetadata::default()))
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(err.error_code(), "CANCELLED");
    assert!(!out_dir.exists());
}

// =============================================================================
// Branding
// =============================================================================

#[tokio::test]
async fn test_cover_branding_is_optional() {
    let dir = tempfile::tempdir().unwrap();
    let logo = dir.path().join("logo.png");
    image::RgbaImage::from_pixel(40, 20, image::Rgba([30, 64, 175, 255]))
        .save(&logo)
        .unwrap();

    let series = ForecastSeries::from_values(&[10.0, 11.0, 12.0]);
    let request = ReportRequest::new(series, ReportMetadata::default());

    let branded = ReportPipeline::builder()
        .config(in_memory_config())
        .branding_source(Arc::new(FileBranding::new(&logo)))
        .build()
        .unwrap()
        .generate(request.clone())
        .await
        .unwrap();
    let cover = branded.document.pages_in(Section::Cover).next().unwrap();
    assert_eq!(cover.image_count(), 1);

    let missing = ReportPipeline::builder()
        .config(in_memory_config())
        .branding_source(Arc::new(FileBranding::new(dir.path().join("missing.png"))))
        .build()
        .unwrap()
        .generate(request)
        .await
        .unwrap();
    let cover = missing.document.pages_in(Section::Cover).next().unwrap();
    assert_eq!(cover.image_count(), 0);
}

// =============================================================================
// Layout pagination
// =============================================================================

fn pagination_settings() -> PageSettings {
    // 400pt body height
    PageSettings {
        width: 400.0,
        height: 500.0,
        margin_top: 50.0,
        margin_right: 25.0,
        margin_bottom: 50.0,
        margin_left: 25.0,
    }
}

#[test]
fn test_table_pagination_matches_row_budget() {
    const ROW_HEIGHT: f64 = 20.0;
    let settings = pagination_settings();
    // The repeated header takes one row of every page.
    let body = settings.content_height() - ROW_HEIGHT;

    for n in [1usize, 18, 19, 20, 38, 39, 57, 100] {
        let mut layout = LayoutEngine::new(settings, "Pagination", "Forecast Studio");
        layout.begin_section(Section::DataTable).unwrap();

        let header = vec!["Period".to_string(), "Predicted".to_string()];
        let rows: Vec<Vec<String>> = (0..n)
            .map(|i| vec![format!("P{}", i + 1), i.to_string()])
            .collect();
        let fragments = layout
            .place_table(&header, &rows, &[175.0, 175.0], TableStyle::new(ROW_HEIGHT, 9.0))
            .unwrap();
        let document = layout.finalize().unwrap();

        let expected = ((n as f64 * ROW_HEIGHT) / body).ceil() as usize;
        assert_eq!(document.page_count(), expected, "{} rows", n);
        assert_eq!(fragments, expected, "{} rows", n);

        let mut placed = 0;
        for (i, page) in document.pages.iter().enumerate() {
            let tables: Vec<_> = page.tables().collect();
            assert_eq!(tables.len(), 1);
            match &tables[0].content {
                Element::Table {
                    header: page_header,
                    rows: page_rows,
                    continued,
                    ..
                } => {
                    assert_eq!(page_header, &header);
                    assert_eq!(*continued, i > 0);
                    assert!(tables[0].bottom() <= settings.bottom_limit() + 1e-9);
                    placed += page_rows.len();
                }
                _ => unreachable!(),
            }
        }
        assert_eq!(placed, n);
        assert_footers(&document);
    }
}

// =============================================================================
// Flattener
// =============================================================================

#[test]
fn test_flatten_nested_record_fixture() {
    let record: serde_json::Value = serde_json::from_str(&read_fixture("nested_record.json")).unwrap();
    let rows = flatten(record.as_object().unwrap());

    // 4 scalar/sequence top-level fields plus 3 nested fields under "accuracy"
    assert_eq!(rows.len(), 7);

    let value_of = |group: &str, field: &str| {
        rows.iter()
            .find(|r| r.group == group && r.field == field)
            .map(|r| r.value.clone())
            .unwrap()
    };
    assert_eq!(value_of("model", "model"), "N/A");
    assert_eq!(value_of("observations", "observations"), "1,234,567");
    assert_eq!(value_of("region", "region"), "EMEA");
    assert_eq!(value_of("horizons", "horizons"), "[3,6,12]");
    assert_eq!(value_of("accuracy", "mape"), "4.27");
    assert_eq!(value_of("accuracy", "rmse"), "1,250");
    assert_eq!(value_of("accuracy", "residuals"), r#"{"max":12.5,"mean":0.01}"#);
}

#[test]
fn test_flatten_is_idempotent_on_fixture() {
    let record: serde_json::Value = serde_json::from_str(&read_fixture("nested_record.json")).unwrap();
    let mut first = flatten(record.as_object().unwrap());
    let mut second = flatten(&rows_to_record(&first));

    let key = |r: &forecast_report::TableRow| (r.group.clone(), r.field.clone());
    first.sort_by_key(key);
    second.sort_by_key(key);
    assert_eq!(first, second);
}
