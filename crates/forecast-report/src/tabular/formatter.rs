//! Display-safe formatting of individual JSON values.

use crate::utils::{format_fixed2, format_thousands, is_integral};
use serde_json::{Map, Number, Value};
use tracing::warn;

/// Literal used wherever a value is missing.
pub const NOT_AVAILABLE: &str = "N/A";

/// Format a scalar or nested value for display.
///
/// Nulls become [`NOT_AVAILABLE`], integral numbers get thousands separators,
/// other numbers exactly two decimals, strings pass through untouched and
/// containers are serialized compactly with sorted keys.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => NOT_AVAILABLE.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_json_number(n),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => compact_text(value),
    }
}

/// Format a plain float the same way a JSON number would be formatted.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        NOT_AVAILABLE.to_string()
    } else if is_integral(value) {
        format_thousands(value)
    } else {
        format_fixed2(value)
    }
}

fn format_json_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return group_digits(&i.to_string());
    }
    if let Some(u) = n.as_u64() {
        return group_digits(&u.to_string());
    }
    match n.as_f64() {
        Some(f) => format_number(f),
        None => n.to_string(),
    }
}

/// Insert `,` separators into a plain (optionally negative) integer literal.
fn group_digits(literal: &str) -> String {
    let (sign, digits) = match literal.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", literal),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}", sign, grouped)
}

/// Serialize a value compactly with object keys in sorted order.
///
/// Falls back to the value's `Display` output if serialization fails.
pub fn compact_text(value: &Value) -> String {
    let canonical = canonicalize(value);
    match serde_json::to_string(&canonical) {
        Ok(text) => text,
        Err(e) => {
            warn!("Falling back to display conversion for nested value: {}", e);
            value.to_string()
        }
    }
}

/// Rebuild a value so every object's keys are inserted in sorted order.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::with_capacity(map.len());
            for (key, inner) in entries {
                sorted.insert(key.clone(), canonicalize(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_is_not_available() {
        assert_eq!(format_value(&Value::Null), "N/A");
    }

    #[test]
    fn test_integers_get_separators() {
        assert_eq!(format_value(&json!(1234567)), "1,234,567");
        assert_eq!(format_value(&json!(-9876)), "-9,876");
        assert_eq!(format_value(&json!(12)), "12");
        assert_eq!(format_value(&json!(18446744073709551615u64)), "18,446,744,073,709,551,615");
    }

    #[test]
    fn test_integral_floats_get_separators() {
        assert_eq!(format_value(&json!(2500.0)), "2,500");
    }

    #[test]
    fn test_fractions_get_two_decimals() {
        assert_eq!(format_value(&json!(3.14159)), "3.14");
        assert_eq!(format_value(&json!(0.5)), "0.50");
    }

    #[test]
    fn test_strings_and_bools() {
        assert_eq!(format_value(&json!("ARIMA")), "ARIMA");
        assert_eq!(format_value(&json!(true)), "true");
    }

    #[test]
    fn test_containers_are_compact_and_sorted() {
        assert_eq!(format_value(&json!({"b": 1, "a": [1, 2]})), r#"{"a":[1,2],"b":1}"#);
        assert_eq!(format_value(&json!([])), "[]");
    }

    #[test]
    fn test_format_number_non_finite() {
        assert_eq!(format_number(f64::NAN), "N/A");
        assert_eq!(format_number(f64::INFINITY), "N/A");
        assert_eq!(format_number(125.0), "125");
        assert_eq!(format_number(24.999), "25.00");
    }
}
