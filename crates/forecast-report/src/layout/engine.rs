//! Cursor-driven placement with automatic page breaking.

use super::cursor::DocumentCursor;
use super::page::{Document, Element, Page, PlacedElement, Section, TableStyle, TextStyle};
use crate::config::PageSettings;
use crate::error::{ReportError, Result};
use crate::utils::{chars_per_line, wrap_text};
use tracing::debug;

/// Placeholder text for charts that could not be rendered.
pub const CHART_PLACEHOLDER: &str = "Chart could not be rendered";

/// Line height of a heading relative to its font size.
pub const HEADING_LINE_SCALE: f64 = 1.4;

/// Lifecycle of a layout build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutState {
    /// Accepting content.
    OnPage,
    /// Footers stamped; further writes are rejected.
    Finalized,
}

/// Assembles pages from text, tables and images.
///
/// Content overflow never fails: text and tables break onto new pages as
/// needed. Images are placed as given; callers check [`fits`](Self::fits)
/// and call [`page_break`](Self::page_break) themselves beforehand.
#[derive(Debug)]
pub struct LayoutEngine {
    cursor: DocumentCursor,
    pages: Vec<Page>,
    section: Section,
    state: LayoutState,
    title: String,
    product_name: String,
}

impl LayoutEngine {
    pub fn new(settings: PageSettings, title: impl Into<String>, product_name: impl Into<String>) -> Self {
        Self {
            cursor: DocumentCursor::new(settings),
            pages: vec![Page::new(0, Section::Cover)],
            section: Section::Cover,
            state: LayoutState::OnPage,
            title: title.into(),
            product_name: product_name.into(),
        }
    }

    pub fn state(&self) -> LayoutState {
        self.state
    }

    pub fn cursor(&self) -> &DocumentCursor {
        &self.cursor
    }

    pub fn settings(&self) -> &PageSettings {
        self.cursor.settings()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn current_section(&self) -> Section {
        self.section
    }

    /// Vertical space left on the current page.
    pub fn remaining_height(&self) -> f64 {
        self.cursor.remaining()
    }

    pub fn fits(&self, height: f64) -> bool {
        self.cursor.fits(height)
    }

    fn ensure_open(&self, operation: &str) -> Result<()> {
        match self.state {
            LayoutState::OnPage => Ok(()),
            LayoutState::Finalized => Err(ReportError::Layout(format!(
                "cannot {} after the document was finalized",
                operation
            ))),
        }
    }

    fn current_page(&mut self) -> &mut Page {
        let index = self.cursor.page_index();
        &mut self.pages[index]
    }

    fn page_is_fresh(&self) -> bool {
        self.cursor.at_page_top()
    }

    fn push(&mut self, x: f64, height: f64, width: f64, content: Element) {
        let top = self.cursor.y();
        self.current_page().elements.push(PlacedElement {
            x,
            top,
            width,
            height,
            content,
        });
        self.cursor.advance(height);
    }

    // =========================================================================
    // Page control
    // =========================================================================

    /// Start a new page in the current section.
    pub fn page_break(&mut self) -> Result<()> {
        self.ensure_open("break page")?;
        self.cursor.next_page();
        self.pages.push(Page::new(self.cursor.page_index(), self.section));
        debug!(
            "Page break -> page {} ({})",
            self.cursor.page_index() + 1,
            self.section.display_name()
        );
        Ok(())
    }

    /// Switch to `section`, starting a new page unless the current one is
    /// still empty.
    pub fn begin_section(&mut self, section: Section) -> Result<()> {
        self.ensure_open("begin section")?;
        self.section = section;
        if self.pages[self.cursor.page_index()].is_empty() {
            self.current_page().section = section;
            Ok(())
        } else {
            self.page_break()
        }
    }

    /// Add vertical space, never moving past the bottom margin.
    pub fn add_space(&mut self, height: f64) -> Result<()> {
        self.ensure_open("add space")?;
        self.cursor.advance_clamped(height);
        Ok(())
    }

    // =========================================================================
    // Text
    // =========================================================================

    /// Place pre-wrapped lines.
    ///
    /// If the block would cross the bottom margin it moves to a new page
    /// first. A block taller than a whole page is split across pages.
    pub fn place_text(&mut self, lines: &[String], line_height: f64, style: TextStyle) -> Result<()> {
        self.ensure_open("place text")?;
        if lines.is_empty() {
            return Ok(());
        }

        let total = lines.len() as f64 * line_height;
        if !self.fits(total) && !self.page_is_fresh() {
            self.page_break()?;
        }

        let settings = *self.settings();
        let mut rest = lines;
        while !rest.is_empty() {
            let capacity = self.cursor.capacity(line_height);
            if capacity == 0 {
                if self.page_is_fresh() {
                    return Err(ReportError::Layout(format!(
                        "line height {} exceeds the page body",
                        line_height
                    )));
                }
                self.page_break()?;
                continue;
            }

            let take = capacity.min(rest.len());
            let (chunk, tail) = rest.split_at(take);
            self.push(
                settings.margin_left,
                take as f64 * line_height,
                settings.content_width(),
                Element::Text {
                    lines: chunk.to_vec(),
                    line_height,
                    style,
                },
            );
            rest = tail;
            if !rest.is_empty() {
                debug!("Text block continues on next page ({} lines left)", rest.len());
                self.page_break()?;
            }
        }
        Ok(())
    }

    /// Wrap free text to the content width and place it.
    pub fn place_paragraph(&mut self, text: &str, line_height: f64, style: TextStyle) -> Result<()> {
        let width = chars_per_line(self.settings().content_width(), style.font_size);
        let lines = wrap_text(text, width);
        self.place_text(&lines, line_height, style)
    }

    /// Place a heading, moving to a new page unless `follow_height` of the
    /// content that follows still fits beneath it.
    pub fn place_heading(&mut self, text: &str, style: TextStyle, follow_height: f64) -> Result<()> {
        self.ensure_open("place heading")?;
        let line_height = style.font_size * HEADING_LINE_SCALE;
        if !self.fits(line_height + follow_height) && !self.page_is_fresh() {
            self.page_break()?;
        }
        let width = chars_per_line(self.settings().content_width(), style.font_size);
        self.place_text(&wrap_text(text, width), line_height, style)
    }

    /// Place a horizontal rule across the content width.
    pub fn place_rule(&mut self, color: crate::raster::Rgb) -> Result<()> {
        self.ensure_open("place rule")?;
        if !self.fits(1.0) {
            self.page_break()?;
        }
        let settings = *self.settings();
        self.push(
            settings.margin_left,
            1.0,
            settings.content_width(),
            Element::Rule { color },
        );
        Ok(())
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Place a table, continuing on new pages as needed.
    ///
    /// Every fragment starts with the header row and carries the same style.
    /// Returns the number of fragments (pages) the table occupies.
    pub fn place_table(
        &mut self,
        header: &[String],
        rows: &[Vec<String>],
        column_widths: &[f64],
        style: TableStyle,
    ) -> Result<usize> {
        self.ensure_open("place table")?;
        if column_widths.len() != header.len() {
            return Err(ReportError::Layout(format!(
                "table has {} header cells but {} column widths",
                header.len(),
                column_widths.len()
            )));
        }

        let row_height = style.row_height;
        let needed = if rows.is_empty() { row_height } else { row_height * 2.0 };
        if !self.fits(needed) && !self.page_is_fresh() {
            self.page_break()?;
        }

        let settings = *self.settings();
        let width: f64 = column_widths.iter().sum();
        let mut rest = rows;
        let mut fragments = 0;

        loop {
            let capacity = self.cursor.capacity(row_height).saturating_sub(1);
            if capacity == 0 && !rest.is_empty() {
                if self.page_is_fresh() {
                    return Err(ReportError::Layout(format!(
                        "row height {} leaves no room for table rows",
                        row_height
                    )));
                }
                self.page_break()?;
                continue;
            }

            let take = capacity.min(rest.len());
            let (chunk, tail) = rest.split_at(take);
            self.push(
                settings.margin_left,
                (take + 1) as f64 * row_height,
                width,
                Element::Table {
                    header: header.to_vec(),
                    rows: chunk.to_vec(),
                    column_widths: column_widths.to_vec(),
                    style,
                    continued: fragments > 0,
                },
            );
            fragments += 1;
            rest = tail;

            if rest.is_empty() {
                break;
            }
            debug!(
                "Table continues on page {} ({} rows left, header repeated)",
                self.cursor.page_index() + 2,
                rest.len()
            );
            self.page_break()?;
        }

        Ok(fragments)
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// Place an image centred horizontally at the cursor.
    ///
    /// Moves to a new page when the image does not fit below the cursor. An
    /// image taller than the page body is scaled down, keeping its aspect
    /// ratio.
    pub fn place_image(&mut self, png: Vec<u8>, width: f64, height: f64) -> Result<()> {
        self.ensure_open("place image")?;
        let settings = *self.settings();
        let body = settings.content_height();
        let (width, height) = if height > body {
            debug!("Scaling image of height {:.1} down to the page body ({:.1})", height, body);
            (width * body / height, body)
        } else {
            (width, height)
        };

        if !self.fits(height) && !self.page_is_fresh() {
            self.page_break()?;
        }
        let x = settings.margin_left + ((settings.content_width() - width) / 2.0).max(0.0);
        self.push(x, height, width, Element::Image { png });
        Ok(())
    }

    /// Place a boxed text placeholder where content could not be produced.
    pub fn place_placeholder(&mut self, text: &str, height: f64) -> Result<()> {
        self.ensure_open("place placeholder")?;
        let settings = *self.settings();
        let height = height.min(settings.content_height());
        if !self.fits(height) && !self.page_is_fresh() {
            self.page_break()?;
        }
        self.push(
            settings.margin_left,
            height,
            settings.content_width(),
            Element::Placeholder {
                text: text.to_string(),
            },
        );
        Ok(())
    }

    // =========================================================================
    // Finalization
    // =========================================================================

    /// Stamp "`product` · Page i of N" on every page and return the document.
    ///
    /// Trailing empty pages are dropped before N is computed.
    pub fn finalize(&mut self) -> Result<Document> {
        self.ensure_open("finalize")?;

        while self.pages.len() > 1 && self.pages.last().is_some_and(Page::is_empty) {
            self.pages.pop();
        }

        let total = self.pages.len();
        for (i, page) in self.pages.iter_mut().enumerate() {
            page.index = i;
            page.footer = Some(format!(
                "{} \u{00B7} Page {} of {}",
                self.product_name,
                i + 1,
                total
            ));
        }

        self.state = LayoutState::Finalized;
        debug!("Finalized document with {} pages", total);

        Ok(Document {
            title: self.title.clone(),
            settings: *self.settings(),
            pages: std::mem::take(&mut self.pages),
        })
    }
}
