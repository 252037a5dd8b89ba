//! PDF serialization of finalized documents.
//!
//! Produces a self-contained PDF 1.4 file: the standard Helvetica fonts,
//! one uncompressed content stream per page and every chart embedded as an
//! RGB image XObject compressed with `FlateDecode`.

mod content;
mod writer;

pub use content::encode_text;

use crate::error::Result;
use crate::layout::{Align, Document, Element, Page, PlacedElement, TableStyle, TextStyle};
use crate::utils::{AVG_GLYPH_WIDTH, chars_per_line, truncate_str};
use content::{ContentStream, FONT_BOLD, FONT_REGULAR};
use tracing::{debug, warn};
use writer::{PdfWriter, deflate};

const FOOTER_FONT_SIZE: f64 = 8.0;
const FOOTER_COLOR: [u8; 3] = [100, 116, 139];
const PLACEHOLDER_FILL: [u8; 3] = [248, 250, 252];
const PLACEHOLDER_BORDER: [u8; 3] = [148, 163, 184];
const CELL_PADDING: f64 = 4.0;

/// Serialize `document` to PDF bytes.
pub fn render(document: &Document) -> Result<Vec<u8>> {
    let mut pdf = PdfWriter::new();

    let catalog = pdf.reserve();
    let pages_root = pdf.reserve();
    let font_regular = pdf.add(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_vec(),
    );
    let font_bold = pdf.add(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
            .to_vec(),
    );

    let mut info = b"<< /Title ".to_vec();
    info.extend_from_slice(&encode_text(&document.title));
    info.extend_from_slice(b" /Producer ");
    info.extend_from_slice(&encode_text(concat!("forecast-report ", env!("CARGO_PKG_VERSION"))));
    info.extend_from_slice(b" >>");
    let info_id = pdf.add(info);

    let mut kids = Vec::with_capacity(document.pages.len());
    for page in &document.pages {
        let page_id = render_page(&mut pdf, document, page, pages_root, font_regular, font_bold)?;
        kids.push(page_id);
    }

    let kids_list = kids
        .iter()
        .map(|id| format!("{} 0 R", id))
        .collect::<Vec<_>>()
        .join(" ");
    pdf.set(
        pages_root,
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids_list,
            kids.len()
        )
        .into_bytes(),
    );
    pdf.set(
        catalog,
        format!("<< /Type /Catalog /Pages {} 0 R >>", pages_root).into_bytes(),
    );

    let bytes = pdf.finish(catalog, Some(info_id));
    debug!(
        "Encoded PDF: {} pages, {} bytes",
        document.pages.len(),
        bytes.len()
    );
    Ok(bytes)
}

fn render_page(
    pdf: &mut PdfWriter,
    document: &Document,
    page: &Page,
    parent: usize,
    font_regular: usize,
    font_bold: usize,
) -> Result<usize> {
    let settings = &document.settings;
    let height = settings.height;
    let mut content = ContentStream::new();
    let mut images: Vec<(String, usize)> = Vec::new();

    for element in &page.elements {
        match &element.content {
            Element::Text {
                lines,
                line_height,
                style,
            } => draw_text(&mut content, height, element, lines, *line_height, style),
            Element::Table {
                header,
                rows,
                column_widths,
                style,
                ..
            } => draw_table(&mut content, height, element, header, rows, column_widths, style),
            Element::Image { png } => match embed_image(pdf, png) {
                Ok(id) => {
                    let name = format!("Im{}", images.len() + 1);
                    content.image(
                        &name,
                        element.x,
                        height - element.bottom(),
                        element.width,
                        element.height,
                    );
                    images.push((name, id));
                }
                Err(e) => {
                    warn!("Embedded chart image could not be decoded: {}", e);
                    draw_placeholder(&mut content, height, element, crate::layout::CHART_PLACEHOLDER);
                }
            },
            Element::Placeholder { text } => draw_placeholder(&mut content, height, element, text),
            Element::Rule { color } => {
                let y = height - element.top;
                content.line(
                    (element.x, y),
                    (element.x + element.width, y),
                    *color,
                    0.75,
                );
            }
        }
    }

    if let Some(footer) = &page.footer {
        let y = settings.margin_bottom / 2.0;
        let x = centered_x(settings.margin_left, settings.content_width(), footer, FOOTER_FONT_SIZE);
        content.text(x, y, FOOTER_FONT_SIZE, false, FOOTER_COLOR, footer);
    }

    let content_id = pdf.add_stream("", &content.into_bytes());

    let xobjects = if images.is_empty() {
        String::new()
    } else {
        let entries = images
            .iter()
            .map(|(name, id)| format!("/{} {} 0 R", name, id))
            .collect::<Vec<_>>()
            .join(" ");
        format!(" /XObject << {} >>", entries)
    };

    let page_dict = format!(
        "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /{} {} 0 R /{} {} 0 R >>{} >> /Contents {} 0 R >>",
        parent,
        settings.width,
        settings.height,
        FONT_REGULAR,
        font_regular,
        FONT_BOLD,
        font_bold,
        xobjects,
        content_id
    );
    Ok(pdf.add(page_dict.into_bytes()))
}

fn text_width(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * font_size * AVG_GLYPH_WIDTH
}

fn centered_x(left: f64, width: f64, text: &str, font_size: f64) -> f64 {
    left + ((width - text_width(text, font_size)) / 2.0).max(0.0)
}

/// Baseline offset of a line inside a box of `line_height`.
fn baseline(line_height: f64, font_size: f64) -> f64 {
    (line_height + font_size * 0.7) / 2.0
}

fn draw_text(
    content: &mut ContentStream,
    page_height: f64,
    element: &PlacedElement,
    lines: &[String],
    line_height: f64,
    style: &TextStyle,
) {
    for (i, line) in lines.iter().enumerate() {
        let top = element.top + i as f64 * line_height;
        let y = page_height - (top + baseline(line_height, style.font_size));
        let x = match style.align {
            Align::Left => element.x,
            Align::Center => centered_x(element.x, element.width, line, style.font_size),
        };
        content.text(x, y, style.font_size, style.bold, style.color, line);
    }
}

fn draw_table(
    content: &mut ContentStream,
    page_height: f64,
    element: &PlacedElement,
    header: &[String],
    rows: &[Vec<String>],
    column_widths: &[f64],
    style: &TableStyle,
) {
    let rh = style.row_height;
    let width: f64 = column_widths.iter().sum();
    let text_color = [30, 41, 59];

    let all_rows = std::iter::once((header, true)).chain(rows.iter().map(|r| (r.as_slice(), false)));
    for (r, (cells, is_header)) in all_rows.enumerate() {
        let top = element.top + r as f64 * rh;
        let bottom_y = page_height - (top + rh);

        if is_header {
            content.fill_rect(element.x, bottom_y, width, rh, style.header_fill);
        } else if let Some(zebra) = style.zebra_fill
            && r % 2 == 0
        {
            content.fill_rect(element.x, bottom_y, width, rh, zebra);
        }

        let mut x = element.x;
        for (cell, col_width) in cells.iter().zip(column_widths) {
            let max_chars = chars_per_line(col_width - 2.0 * CELL_PADDING, style.font_size);
            let text = truncate_str(cell, max_chars);
            let y = page_height - (top + baseline(rh, style.font_size));
            let color = if is_header { style.header_text } else { text_color };
            content.text(x + CELL_PADDING, y, style.font_size, is_header, color, &text);
            x += col_width;
        }

        content.line(
            (element.x, bottom_y),
            (element.x + width, bottom_y),
            style.rule_color,
            0.5,
        );
    }

    content.stroke_rect(
        element.x,
        page_height - element.bottom(),
        width,
        element.height,
        style.rule_color,
        0.5,
    );
}

fn draw_placeholder(content: &mut ContentStream, page_height: f64, element: &PlacedElement, text: &str) {
    let y = page_height - element.bottom();
    content.fill_rect(element.x, y, element.width, element.height, PLACEHOLDER_FILL);
    content.stroke_rect(element.x, y, element.width, element.height, PLACEHOLDER_BORDER, 0.75);

    let size = 11.0;
    let x = centered_x(element.x, element.width, text, size);
    let text_y = y + element.height / 2.0 - size * 0.35;
    content.text(x, text_y, size, false, FOOTER_COLOR, text);
}

/// Decode PNG bytes and embed them as an RGB image XObject.
fn embed_image(pdf: &mut PdfWriter, png: &[u8]) -> Result<usize> {
    let rgb = image::load_from_memory(png)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    let compressed = deflate(rgb.as_raw())?;
    let dict = format!(
        "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode",
        width, height
    );
    Ok(pdf.add_stream(&dict, &compressed))
}
