//! Report assembly.
//!
//! Section builders that drive the layout engine, the optional cover
//! branding fetch, and artifact naming and writing.

mod branding;
mod generator;
pub mod sections;

pub use branding::{
    BrandingImage, BrandingSource, FileBranding, HttpBranding, branding_from_location,
    load_branding,
};
pub use generator::{ArtifactWriter, artifact_stem, table_export_frame};
pub use sections::{ChartSummary, SectionContext};

use crate::analysis::AnalysisResult;
use crate::layout::Document;
use crate::types::TableRow;
use serde::Serialize;
use std::path::PathBuf;

/// Everything a finished report run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutput {
    /// Final PDF file name (`<stem>.pdf`), whether or not it was written.
    pub file_name: String,

    /// The encoded PDF document.
    #[serde(skip_serializing)]
    pub document_bytes: Vec<u8>,

    pub page_count: usize,

    /// The laid-out document the PDF was encoded from.
    #[serde(skip_serializing)]
    pub document: Document,

    pub analysis: AnalysisResult,

    /// Flattened statistics rows, as shown in the data table section.
    pub table_rows: Vec<TableRow>,

    /// Charts placed as images and charts replaced by placeholders.
    pub charts: ChartSummary,

    /// Paths written to disk (empty when `save_to_disk` is off).
    pub written: Vec<PathBuf>,
}

impl ReportOutput {
    /// Path of the written PDF, if the document was saved.
    pub fn document_path(&self) -> Option<&PathBuf> {
        self.written.iter().find(|p| p.extension().is_some_and(|e| e == "pdf"))
    }
}
