//! Pipeline module.
//!
//! This module provides the report pipeline, its builder, and progress and
//! cancellation support.

mod builder;
pub mod progress;

pub use builder::{ReportPipeline, ReportPipelineBuilder};
pub use progress::{
    CancellationToken, ClosureProgressReporter, ProgressReporter, ProgressUpdate, ReportStage,
};
