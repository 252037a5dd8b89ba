//! Artifact naming and writing.

use crate::error::{ReportError, Result, ResultExt};
use crate::types::{ReportKind, TableRow};
use crate::utils::slugify;
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Deterministic artifact stem: `<kind>-<slug(target)>-<YYYY-MM-DD>`.
pub fn artifact_stem(kind: ReportKind, target: &str, date: NaiveDate) -> String {
    format!("{}-{}-{}", kind.slug(), slugify(target), date.format("%Y-%m-%d"))
}

/// Build the `group,field,value` frame used for the table export.
pub fn table_export_frame(rows: &[TableRow]) -> Result<DataFrame> {
    let groups: Vec<&str> = rows.iter().map(|r| r.group.as_str()).collect();
    let fields: Vec<&str> = rows.iter().map(|r| r.field.as_str()).collect();
    let values: Vec<&str> = rows.iter().map(|r| r.value.as_str()).collect();

    Ok(df!(
        "group" => groups,
        "field" => fields,
        "value" => values
    )?)
}

/// Writes finished artifacts into an output directory.
///
/// Files are written to a temporary sibling first and renamed into place, so
/// an interrupted write never leaves a truncated artifact under the final
/// name.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn staging_path(final_path: &Path) -> PathBuf {
        let mut name = final_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".part");
        final_path.with_file_name(name)
    }

    fn commit(staging: &Path, final_path: &Path) -> Result<()> {
        fs::rename(staging, final_path)
            .context(format!("Failed to move artifact into {}", final_path.display()))
    }

    /// Run `write` against a staging file, then move it to `final_path`.
    ///
    /// The staging file is removed again when any step fails.
    fn write_staged<F>(final_path: &Path, write: F) -> Result<()>
    where
        F: FnOnce(&mut File) -> Result<()>,
    {
        let staging = Self::staging_path(final_path);
        let result = File::create(&staging)
            .map_err(ReportError::from)
            .and_then(|mut file| write(&mut file))
            .and_then(|()| Self::commit(&staging, final_path));

        if result.is_err() && staging.exists() {
            if let Err(e) = fs::remove_file(&staging) {
                warn!("Could not remove {}: {}", staging.display(), e);
            }
        }
        result
    }

    /// Write the PDF document.
    pub fn write_document(&self, stem: &str, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .context(format!("Failed to create {}", self.output_dir.display()))?;

        let path = self.output_dir.join(format!("{}.pdf", stem));
        Self::write_staged(&path, |file| {
            file.write_all(bytes)?;
            file.sync_all()?;
            Ok(())
        })?;

        info!("Report saved: {}", path.display());
        Ok(path)
    }

    /// Write the flat table export as CSV.
    pub fn write_table_export(&self, stem: &str, rows: &[TableRow]) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .context(format!("Failed to create {}", self.output_dir.display()))?;

        let path = self.output_dir.join(format!("{}.csv", stem));
        let mut df = table_export_frame(rows)?;
        Self::write_staged(&path, |file| {
            CsvWriter::new(file)
                .include_header(true)
                .with_separator(b',')
                .with_quote_char(b'"')
                .finish(&mut df)?;
            Ok(())
        })?;

        debug!("Table export saved: {} ({} rows)", path.display(), rows.len());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_stem() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(
            artifact_stem(ReportKind::Forecast, "Monthly Revenue (EUR)", date),
            "forecast-report-monthly-revenue-eur-2026-03-09"
        );
        assert_eq!(
            artifact_stem(ReportKind::Analysis, "   ", date),
            "analysis-report-untitled-2026-03-09"
        );
    }

    #[test]
    fn test_table_export_frame_shape() {
        let rows = vec![
            TableRow::new("trend", "direction", "upward"),
            TableRow::new("range", "peak", "1,300"),
        ];
        let df = table_export_frame(&rows).unwrap();
        assert_eq!(df.shape(), (2, 3));
        assert_eq!(
            df.get_column_names()
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>(),
            vec!["group", "field", "value"]
        );
    }

    #[test]
    fn test_write_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path().join("nested"));

        let pdf = writer.write_document("report", b"%PDF-1.4 test").unwrap();
        assert_eq!(fs::read(&pdf).unwrap(), b"%PDF-1.4 test");
        assert!(!dir.path().join("nested/report.pdf.part").exists());

        let rows = vec![TableRow::new("range", "peak", "1,300")];
        let csv = writer.write_table_export("report", &rows).unwrap();
        let text = fs::read_to_string(csv).unwrap();
        assert!(text.starts_with("group,field,value"));
        assert!(text.contains("range,peak,\"1,300\""));
    }

    #[test]
    fn test_failed_commit_removes_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        // a directory under the final name makes the rename fail
        fs::create_dir(dir.path().join("report.pdf")).unwrap();
        fs::create_dir(dir.path().join("report.csv")).unwrap();

        assert!(writer.write_document("report", b"%PDF-1.4 test").is_err());
        assert!(!dir.path().join("report.pdf.part").exists());

        let rows = vec![TableRow::new("range", "peak", "1,300")];
        assert!(writer.write_table_export("report", &rows).is_err());
        assert!(!dir.path().join("report.csv.part").exists());
    }
}
