//! Custom error types for the report pipeline.
//!
//! Only failures that leave no safe way to produce a truthful document are
//! surfaced through [`ReportError`]. Insufficient data, chart render failures
//! and value serialization problems are recovered inside their components and
//! never reach the caller.
//!
//! Errors are serializable so they can be shipped to a front end for display.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for report generation.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Report build was cancelled by the caller.
    #[error("Report build cancelled")]
    Cancelled,

    /// Input metadata is unusable (e.g. confidence level outside (0, 1)).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The forecasting collaborator returned arrays of different lengths.
    #[error("Malformed forecast series: '{field}' has {actual} values, expected {expected}")]
    MismatchedSeries {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Layout rejected an operation (e.g. writing after finalization).
    #[error("Layout error: {0}")]
    Layout(String),

    /// Encoding the finished document failed.
    #[error("Failed to render document: {0}")]
    Render(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper (CSV input and table export).
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Image encoding/decoding error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// HTTP request error (branding fetch).
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ReportError>,
    },
}

impl ReportError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ReportError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::MismatchedSeries { .. } => "MISMATCHED_SERIES",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Layout(_) => "LAYOUT_ERROR",
            Self::Render(_) => "RENDER_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Image(_) => "IMAGE_ERROR",
            Self::Http(_) => "HTTP_REQUEST_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Check if the caller can retry after fixing input or configuration.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::InvalidInput(_) | Self::InvalidConfig(_)
        )
    }
}

impl From<crate::config::ConfigValidationError> for ReportError {
    fn from(err: crate::config::ConfigValidationError) -> Self {
        ReportError::InvalidConfig(err.to_string())
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ReportError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ReportError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ReportError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ReportError::Io(e).with_context(context))
    }
}
