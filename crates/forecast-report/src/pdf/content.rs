//! PDF page content stream builder.

use crate::raster::Rgb;
use std::fmt::Write as _;

/// Resource name of the regular font.
pub const FONT_REGULAR: &str = "F1";
/// Resource name of the bold font.
pub const FONT_BOLD: &str = "F2";

/// Format a coordinate without trailing noise.
fn num(value: f64) -> String {
    let text = format!("{:.2}", value);
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn color(c: Rgb) -> String {
    format!(
        "{} {} {}",
        num(c[0] as f64 / 255.0),
        num(c[1] as f64 / 255.0),
        num(c[2] as f64 / 255.0)
    )
}

/// Encode text as a PDF literal string in WinAnsi/Latin-1.
///
/// Characters outside Latin-1 are replaced by `?`, control characters by a
/// space.
pub fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 2);
    out.push(b'(');
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(ch as u8);
            }
            c if (c as u32) < 0x20 => out.push(b' '),
            c if (c as u32) < 0x100 => out.push(c as u32 as u8),
            _ => out.push(b'?'),
        }
    }
    out.push(b')');
    out
}

/// Accumulates drawing operators for one page, in PDF's bottom-up space.
#[derive(Debug, Default)]
pub struct ContentStream {
    ops: Vec<u8>,
}

impl ContentStream {
    pub fn new() -> Self {
        Self::default()
    }

    fn op(&mut self, line: &str) {
        self.ops.extend_from_slice(line.as_bytes());
        self.ops.push(b'\n');
    }

    pub fn text(&mut self, x: f64, y: f64, size: f64, bold: bool, fill: Rgb, text: &str) {
        let font = if bold { FONT_BOLD } else { FONT_REGULAR };
        let mut line = String::new();
        let _ = write!(
            line,
            "BT /{} {} Tf {} rg {} {} Td ",
            font,
            num(size),
            color(fill),
            num(x),
            num(y)
        );
        self.ops.extend_from_slice(line.as_bytes());
        self.ops.extend_from_slice(&encode_text(text));
        self.op(" Tj ET");
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: Rgb) {
        self.op(&format!(
            "{} rg {} {} {} {} re f",
            color(fill),
            num(x),
            num(y),
            num(w),
            num(h)
        ));
    }

    pub fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64, stroke: Rgb, width: f64) {
        self.op(&format!(
            "{} RG {} w {} {} {} {} re S",
            color(stroke),
            num(width),
            num(x),
            num(y),
            num(w),
            num(h)
        ));
    }

    pub fn line(&mut self, from: (f64, f64), to: (f64, f64), stroke: Rgb, width: f64) {
        self.op(&format!(
            "{} RG {} w {} {} m {} {} l S",
            color(stroke),
            num(width),
            num(from.0),
            num(from.1),
            num(to.0),
            num(to.1)
        ));
    }

    /// Paint an image XObject scaled into the given box.
    pub fn image(&mut self, name: &str, x: f64, y: f64, w: f64, h: f64) {
        self.op(&format!(
            "q {} 0 0 {} {} {} cm /{} Do Q",
            num(w),
            num(h),
            num(x),
            num(y),
            name
        ));
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_trims_zeros() {
        assert_eq!(num(12.0), "12");
        assert_eq!(num(12.5), "12.5");
        assert_eq!(num(0.004), "0");
        assert_eq!(num(-3.25), "-3.25");
    }

    #[test]
    fn test_encode_text_escapes_and_maps_latin1() {
        assert_eq!(encode_text("a(b)\\"), b"(a\\(b\\)\\\\)".to_vec());
        assert_eq!(encode_text("x\u{00B7}y"), vec![b'(', b'x', 0xB7, b'y', b')']);
        assert_eq!(encode_text("\u{2014}\t"), b"(? )".to_vec());
    }

    #[test]
    fn test_text_operator() {
        let mut content = ContentStream::new();
        content.text(10.0, 20.0, 9.0, true, [0, 0, 0], "Hi");
        let bytes = content.into_bytes();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "BT /F2 9 Tf 0 0 0 rg 10 20 Td (Hi) Tj ET\n"
        );
    }
}
