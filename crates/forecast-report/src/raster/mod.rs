//! Chart rasterization.
//!
//! A [`ChartSpec`] is drawn by a [`RenderEngine`] onto an off-screen
//! [`RasterSurface`] of exactly the requested size, then sampled and encoded
//! as PNG by the [`ChartRasterizer`]. Engines signal completion through a
//! one-shot channel; the rasterizer waits for that signal under a timeout
//! and turns every failure into [`RasterOutcome::Unavailable`].

mod engine;
mod rasterizer;
mod spec;
mod surface;

pub use engine::{
    EngineFactory, RenderEngine, RenderSignal, SoftwareChartEngine, SoftwareEngineFactory,
};
pub use rasterizer::{ChartImage, ChartRasterizer, RasterOutcome};
pub use spec::{ChartKind, ChartSeries, ChartSpec, ConfidenceBand, DisplayOptions, PALETTE, Rgb};
pub use surface::RasterSurface;
