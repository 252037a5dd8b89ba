//! Progress reporting and cancellation support for report generation.
//!
//! Cancellation is coarse-grained: the pipeline checks the token between
//! stages, never inside a stage.
//!
//! # Example
//!
//! ```rust,ignore
//! use forecast_report::{CancellationToken, ReportPipeline};
//!
//! let token = CancellationToken::new();
//! let token_clone = token.clone();
//!
//! tokio::spawn(async move {
//!     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!     token_clone.cancel();
//! });
//!
//! let output = ReportPipeline::builder()
//!     .cancellation_token(token)
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.stage, update.message);
//!     })
//!     .build()?
//!     .generate(request)
//!     .await;
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stages of a report run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStage {
    /// Checking the request for catastrophic input errors
    Validating,
    /// Computing statistics and narrative text
    Analyzing,
    /// Cover page, including the branding fetch
    Cover,
    /// Key metrics table and insights
    ExecutiveSummary,
    /// Chart rasterization and placement
    Charts,
    /// Forecast and statistics tables
    DataTables,
    /// Numbered recommendations and methodology
    Recommendations,
    /// Dropping empty pages, stamping footers, PDF encoding
    Finalizing,
    /// Writing artifacts to the output directory
    Writing,
    /// Report completed successfully
    Complete,
    /// Report was cancelled by the caller
    Cancelled,
    /// Report failed with an error
    Failed,
}

impl ReportStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Validating => "Validating Input",
            Self::Analyzing => "Analyzing Forecast",
            Self::Cover => "Building Cover",
            Self::ExecutiveSummary => "Writing Executive Summary",
            Self::Charts => "Rendering Charts",
            Self::DataTables => "Laying Out Tables",
            Self::Recommendations => "Writing Recommendations",
            Self::Finalizing => "Finalizing Document",
            Self::Writing => "Saving Artifacts",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }

    /// Typical share of the whole run spent in this stage (0.0 - 1.0).
    ///
    /// Weights of the working stages sum to 1.0; terminal states weigh 0.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Validating => 0.02,
            Self::Analyzing => 0.08,
            Self::Cover => 0.08,
            Self::ExecutiveSummary => 0.07,
            Self::Charts => 0.40,
            Self::DataTables => 0.15,
            Self::Recommendations => 0.05,
            Self::Finalizing => 0.10,
            Self::Writing => 0.05,
            Self::Complete => 0.0,
            Self::Cancelled => 0.0,
            Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Validating => 0.0,
            Self::Analyzing => 0.02,
            Self::Cover => 0.10,
            Self::ExecutiveSummary => 0.18,
            Self::Charts => 0.25,
            Self::DataTables => 0.65,
            Self::Recommendations => 0.80,
            Self::Finalizing => 0.85,
            Self::Writing => 0.95,
            Self::Complete => 1.0,
            Self::Cancelled => 0.0,
            Self::Failed => 0.0,
        }
    }
}

/// A single progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: ReportStage,

    /// Optional detail such as "Chart 2/2"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within the current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    pub fn new(stage: ReportStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            sub_stage: None,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Progress through a stage that iterates over `total` items.
    pub fn with_items(
        stage: ReportStage,
        sub_stage: impl Into<String>,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        let mut update = Self::new(stage, stage_progress, message);
        update.sub_stage = Some(sub_stage.into());
        update.items_processed = Some(current);
        update.items_total = Some(total);
        update
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: ReportStage::Complete,
            sub_stage: None,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            stage: ReportStage::Cancelled,
            sub_stage: None,
            progress: 0.0,
            stage_progress: 0.0,
            message: "Report generation cancelled".to_string(),
            items_processed: None,
            items_total: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: ReportStage::Failed,
            sub_stage: None,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }
}

/// Receives progress updates during report generation.
///
/// Called from the task driving the pipeline; implementations should not
/// block.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

/// Token for cancelling a running report.
///
/// Clones share one flag. When cancellation is requested the pipeline
/// returns [`ReportError::Cancelled`](crate::error::ReportError::Cancelled)
/// at the next stage boundary and writes nothing.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Safe to call from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can be reused for another run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}
