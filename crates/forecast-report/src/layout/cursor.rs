//! Mutable placement state for a single document build.

use crate::config::PageSettings;

/// Tolerance for floating-point comparisons against the bottom margin.
const EPSILON: f64 = 1e-6;

/// Current page and vertical offset. Owned by one [`super::LayoutEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentCursor {
    page_index: usize,
    y: f64,
    settings: PageSettings,
}

impl DocumentCursor {
    /// Start at the top margin of page 0.
    pub fn new(settings: PageSettings) -> Self {
        Self {
            page_index: 0,
            y: settings.margin_top,
            settings,
        }
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn settings(&self) -> &PageSettings {
        &self.settings
    }

    /// Move to the top margin of the next page.
    pub fn next_page(&mut self) {
        self.page_index += 1;
        self.y = self.settings.margin_top;
    }

    /// True when nothing has been placed on the current page yet.
    pub fn at_page_top(&self) -> bool {
        (self.y - self.settings.margin_top).abs() < EPSILON
    }

    pub fn remaining(&self) -> f64 {
        (self.settings.bottom_limit() - self.y).max(0.0)
    }

    pub fn fits(&self, height: f64) -> bool {
        self.y + height <= self.settings.bottom_limit() + EPSILON
    }

    /// Whole units of `unit` that still fit on the page.
    pub fn capacity(&self, unit: f64) -> usize {
        if unit <= 0.0 {
            return 0;
        }
        ((self.remaining() + EPSILON) / unit).floor() as usize
    }

    pub fn advance(&mut self, height: f64) {
        self.y += height;
    }

    /// Advance without passing the bottom margin.
    pub fn advance_clamped(&mut self, height: f64) {
        self.y = (self.y + height).min(self.settings.bottom_limit());
    }
}
