//! Shared utilities for the report pipeline.
//!
//! Number formatting, slugification and text wrapping used by the flattener,
//! the section builders and the layout engine.

use once_cell::sync::Lazy;
use regex::Regex;

// =============================================================================
// Number Formatting
// =============================================================================

/// Format an integral value with `,` thousands separators and no decimals.
///
/// # Example
///
/// ```rust,ignore
/// assert_eq!(format_thousands(1234567.0), "1,234,567");
/// assert_eq!(format_thousands(-4200.0), "-4,200");
/// ```
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Format a value with exactly two decimal digits.
#[inline]
pub fn format_fixed2(value: f64) -> String {
    format!("{:.2}", value)
}

/// Check whether a float carries no fractional part.
#[inline]
pub fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0
}

/// Format a signed percentage with one decimal and an explicit sign.
pub fn format_signed_pct(value: f64) -> String {
    if value > 0.0 {
        format!("+{:.1}%", value)
    } else {
        format!("{:.1}%", value)
    }
}

// =============================================================================
// Naming
// =============================================================================

static NON_SLUG_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("Invalid regex: slug separator"));

/// Lowercase a label and collapse everything that is not `[a-z0-9]` into `-`.
///
/// Returns `"untitled"` when nothing usable remains.
pub fn slugify(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    let slug = NON_SLUG_CHARS.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.to_string()
    }
}

// =============================================================================
// Text Metrics
// =============================================================================

/// Average Helvetica glyph width as a fraction of the font size.
pub const AVG_GLYPH_WIDTH: f64 = 0.5;

/// Estimate how many characters fit on a line of `width` points.
pub fn chars_per_line(width: f64, font_size: f64) -> usize {
    if width <= 0.0 || font_size <= 0.0 {
        return 1;
    }
    ((width / (font_size * AVG_GLYPH_WIDTH)).floor() as usize).max(1)
}

/// Greedy word wrap by character count.
///
/// Words longer than `max_chars` are hard-split. Blank input yields no lines.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word = word.to_string();
            while word.chars().count() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let head: String = word.chars().take(max_chars).collect();
                word = word.chars().skip(max_chars).collect();
                lines.push(head);
            }
            if word.is_empty() {
                continue;
            }
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > max_chars && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}

/// Truncate a string to `max_chars`, appending "..." when shortened.
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else if max_chars <= 3 {
        s.chars().take(max_chars).collect()
    } else {
        let head: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(1000.0), "1,000");
        assert_eq!(format_thousands(1234567.0), "1,234,567");
        assert_eq!(format_thousands(-4200.0), "-4,200");
    }

    #[test]
    fn test_format_fixed2() {
        assert_eq!(format_fixed2(3.14159), "3.14");
        assert_eq!(format_fixed2(2.5), "2.50");
    }

    #[test]
    fn test_is_integral() {
        assert!(is_integral(5.0));
        assert!(!is_integral(5.5));
        assert!(!is_integral(f64::NAN));
        assert!(!is_integral(f64::INFINITY));
    }

    #[test]
    fn test_format_signed_pct() {
        assert_eq!(format_signed_pct(25.0), "+25.0%");
        assert_eq!(format_signed_pct(-20.0), "-20.0%");
        assert_eq!(format_signed_pct(0.0), "0.0%");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Monthly Revenue (USD)"), "monthly-revenue-usd");
        assert_eq!(slugify("  --Sales__EU--  "), "sales-eu");
        assert_eq!(slugify("!!!"), "untitled");
    }

    #[test]
    fn test_wrap_text_respects_width() {
        let lines = wrap_text("the quick brown fox jumps over the lazy dog", 10);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
        assert_eq!(lines.join(" "), "the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn test_wrap_text_hard_splits_long_words() {
        let lines = wrap_text("abcdefghijkl", 5);
        assert_eq!(lines, vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn test_wrap_text_keeps_paragraphs() {
        let lines = wrap_text("one\ntwo", 80);
        assert_eq!(lines, vec!["one", "two"]);
        assert!(wrap_text("   ", 10).is_empty());
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("a very long label", 8), "a ver...");
    }
}
