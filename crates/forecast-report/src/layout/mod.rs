//! Multi-page document layout.
//!
//! A [`LayoutEngine`] owns a [`DocumentCursor`] for the duration of one
//! build and places text, tables, images and placeholders onto [`Page`]s,
//! breaking pages whenever content would cross the bottom margin.
//! [`LayoutEngine::finalize`] stamps "Page i of N" footers in a second pass
//! and hands back the finished [`Document`].

mod cursor;
mod engine;
mod page;

pub use cursor::DocumentCursor;
pub use engine::{CHART_PLACEHOLDER, HEADING_LINE_SCALE, LayoutEngine, LayoutState};
pub use page::{
    Align, Document, Element, Page, PlacedElement, Section, TableStyle, TextStyle,
};
