//! Pages, placed elements and the finished document.

use crate::config::PageSettings;
use crate::raster::Rgb;
use serde::Serialize;

/// Report section a page belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Cover,
    ExecutiveSummary,
    Charts,
    DataTable,
    Recommendations,
}

impl Section {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Cover => "Cover",
            Self::ExecutiveSummary => "Executive Summary",
            Self::Charts => "Charts",
            Self::DataTable => "Data Tables",
            Self::Recommendations => "Recommendations",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
}

/// Font and colour of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextStyle {
    pub font_size: f64,
    pub bold: bool,
    pub color: Rgb,
    pub align: Align,
}

impl TextStyle {
    pub fn body(font_size: f64) -> Self {
        Self {
            font_size,
            bold: false,
            color: [30, 41, 59],
            align: Align::Left,
        }
    }

    pub fn heading(font_size: f64) -> Self {
        Self {
            font_size,
            bold: true,
            color: [15, 23, 42],
            align: Align::Left,
        }
    }

    pub fn muted(font_size: f64) -> Self {
        Self {
            color: [100, 116, 139],
            ..Self::body(font_size)
        }
    }

    pub fn centered(mut self) -> Self {
        self.align = Align::Center;
        self
    }
}

/// Table theme. Re-applied to every continuation fragment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TableStyle {
    pub row_height: f64,
    pub font_size: f64,
    pub header_fill: Rgb,
    pub header_text: Rgb,
    /// Fill for every other body row.
    pub zebra_fill: Option<Rgb>,
    pub rule_color: Rgb,
}

impl TableStyle {
    pub fn new(row_height: f64, font_size: f64) -> Self {
        Self {
            row_height,
            font_size,
            header_fill: [30, 64, 175],
            header_text: [255, 255, 255],
            zebra_fill: Some([241, 245, 249]),
            rule_color: [203, 213, 225],
        }
    }
}

/// Content of a placed element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Text {
        lines: Vec<String>,
        line_height: f64,
        style: TextStyle,
    },
    /// One page's worth of a table; the header is always included.
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
        column_widths: Vec<f64>,
        style: TableStyle,
        continued: bool,
    },
    Image {
        #[serde(skip)]
        png: Vec<u8>,
    },
    Placeholder {
        text: String,
    },
    Rule {
        color: Rgb,
    },
}

/// An element with its position on the page, in points from the top-left.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedElement {
    pub x: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub content: Element,
}

impl PlacedElement {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub index: usize,
    pub section: Section,
    pub elements: Vec<PlacedElement>,
    /// Stamped during finalization.
    pub footer: Option<String>,
}

impl Page {
    pub fn new(index: usize, section: Section) -> Self {
        Self {
            index,
            section,
            elements: Vec::new(),
            footer: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All text on the page, in placement order, including table cells and
    /// placeholders.
    pub fn text_content(&self) -> Vec<String> {
        let mut out = Vec::new();
        for element in &self.elements {
            match &element.content {
                Element::Text { lines, .. } => out.extend(lines.iter().cloned()),
                Element::Table { header, rows, .. } => {
                    out.push(header.join(" | "));
                    out.extend(rows.iter().map(|r| r.join(" | ")));
                }
                Element::Placeholder { text } => out.push(text.clone()),
                Element::Image { .. } | Element::Rule { .. } => {}
            }
        }
        out
    }

    pub fn tables(&self) -> impl Iterator<Item = &PlacedElement> {
        self.elements
            .iter()
            .filter(|e| matches!(e.content, Element::Table { .. }))
    }

    pub fn image_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| matches!(e.content, Element::Image { .. }))
            .count()
    }
}

/// A finalized, paginated document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub title: String,
    pub settings: PageSettings,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages_in(&self, section: Section) -> impl Iterator<Item = &Page> {
        self.pages.iter().filter(move |p| p.section == section)
    }

    pub fn section_page_count(&self, section: Section) -> usize {
        self.pages_in(section).count()
    }
}
