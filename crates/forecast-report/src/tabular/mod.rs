//! Tabular flattening of nested records.
//!
//! Converts heterogeneous key/value records into [`TableRow`]s whose values
//! are always display-safe strings. Nesting is followed down to
//! [`FlattenOptions::max_depth`]; anything deeper is serialized compactly.
//!
//! Input is an owned [`serde_json::Value`] tree, which cannot contain
//! reference cycles, so recursion always terminates.

mod formatter;

pub use formatter::{NOT_AVAILABLE, compact_text, format_number, format_value};

use crate::types::TableRow;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Options controlling how deep records are flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenOptions {
    /// Number of mapping levels turned into rows. 2 = top level plus one
    /// nested level.
    pub max_depth: usize,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self { max_depth: 2 }
    }
}

/// Flatten a record with default options.
///
/// # Example
///
/// ```rust,ignore
/// use serde_json::json;
///
/// let record = json!({"model": "ARIMA", "metrics": {"mae": 12.5}});
/// let rows = flatten(record.as_object().unwrap());
/// assert_eq!(rows[0].value, "12.50");
/// ```
pub fn flatten(record: &Map<String, Value>) -> Vec<TableRow> {
    flatten_with(record, &FlattenOptions::default())
}

/// Flatten a record with explicit options.
pub fn flatten_with(record: &Map<String, Value>, options: &FlattenOptions) -> Vec<TableRow> {
    flatten_entries(record.iter().map(|(k, v)| (k.as_str(), v)), options)
}

/// Flatten ordered `(key, value)` pairs, preserving their order.
pub fn flatten_entries<'a, I>(entries: I, options: &FlattenOptions) -> Vec<TableRow>
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let mut rows = Vec::new();
    for (key, value) in entries {
        match value {
            Value::Object(nested) if options.max_depth > 1 && !nested.is_empty() => {
                collect_nested(key, "", nested, 2, options.max_depth, &mut rows);
            }
            _ => rows.push(TableRow::new(key, key, format_value(value))),
        }
    }
    rows
}

fn collect_nested(
    group: &str,
    prefix: &str,
    map: &Map<String, Value>,
    depth: usize,
    max_depth: usize,
    rows: &mut Vec<TableRow>,
) {
    for (key, value) in map {
        let field = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Object(inner) if depth < max_depth && !inner.is_empty() => {
                collect_nested(group, &field, inner, depth + 1, max_depth, rows);
            }
            _ => rows.push(TableRow::new(group, field, format_value(value))),
        }
    }
}

/// Reassemble rows into a record of strings.
///
/// A group made of a single row whose field equals the group becomes a
/// top-level entry. Every other group becomes a nested mapping, including
/// its `group == field` rows.
pub fn rows_to_record(rows: &[TableRow]) -> Map<String, Value> {
    let mut groups: Vec<(&str, Vec<&TableRow>)> = Vec::new();
    for row in rows {
        match groups.iter_mut().find(|(group, _)| *group == row.group) {
            Some((_, members)) => members.push(row),
            None => groups.push((row.group.as_str(), vec![row])),
        }
    }

    let mut record = Map::new();
    for (group, members) in groups {
        let value = match members.as_slice() {
            [only] if only.field == group => Value::String(only.value.clone()),
            _ => Value::Object(
                members
                    .iter()
                    .map(|row| (row.field.clone(), Value::String(row.value.clone())))
                    .collect(),
            ),
        };
        record.insert(group.to_string(), value);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_flatten_mixed_record_is_total() {
        let record = object(json!({
            "missing": null,
            "metrics": {"mae": 12.346, "rmse": 20},
            "points": 1200,
            "model": "prophet"
        }));

        let rows = flatten(&record);

        // one row per scalar top-level field plus one per nested field
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| !r.value.is_empty()));
        assert!(rows.contains(&TableRow::new("missing", "missing", "N/A")));
        assert!(rows.contains(&TableRow::new("metrics", "mae", "12.35")));
        assert!(rows.contains(&TableRow::new("metrics", "rmse", "20")));
        assert!(rows.contains(&TableRow::new("points", "points", "1,200")));
        assert!(rows.contains(&TableRow::new("model", "model", "prophet")));
    }

    #[test]
    fn test_second_level_nesting_is_serialized() {
        let record = object(json!({
            "outer": {"inner": {"z": 1, "a": null}}
        }));
        let rows = flatten(&record);
        assert_eq!(rows, vec![TableRow::new("outer", "inner", r#"{"a":null,"z":1}"#)]);
    }

    #[test]
    fn test_arrays_are_serialized_not_recursed() {
        let record = object(json!({"history": [1, 2.5, null]}));
        let rows = flatten(&record);
        assert_eq!(rows[0].value, "[1,2.5,null]");
    }

    #[test]
    fn test_configurable_depth() {
        let record = object(json!({"a": {"b": {"c": 3}}}));

        let deep = flatten_with(&record, &FlattenOptions { max_depth: 3 });
        assert_eq!(deep, vec![TableRow::new("a", "b.c", "3")]);

        let shallow = flatten_with(&record, &FlattenOptions { max_depth: 1 });
        assert_eq!(shallow, vec![TableRow::new("a", "a", r#"{"b":{"c":3}}"#)]);
    }

    #[test]
    fn test_empty_nested_object_still_yields_row() {
        let rows = flatten(&object(json!({"meta": {}})));
        assert_eq!(rows, vec![TableRow::new("meta", "meta", "{}")]);
    }

    #[test]
    fn test_flatten_entries_keeps_order() {
        let a = json!(1);
        let b = json!(2);
        let rows = flatten_entries([("zeta", &a), ("alpha", &b)], &FlattenOptions::default());
        assert_eq!(rows[0].group, "zeta");
        assert_eq!(rows[1].group, "alpha");
    }

    #[test]
    fn test_flatten_is_idempotent() {
        let record = object(json!({
            "missing": null,
            "metrics": {"mae": 1234.5678, "count": 98765},
            "ratio": 0.125,
            "label": "Q1",
            "tags": ["a", "b"]
        }));

        let first = flatten(&record);
        let second = flatten(&rows_to_record(&first));
        assert_eq!(first, second);
    }

    #[test]
    fn test_reassembly_keeps_field_named_like_its_group() {
        let record = object(json!({"a": {"a": 1, "b": 2}}));

        let first = flatten(&record);
        assert_eq!(
            first,
            vec![TableRow::new("a", "a", "1"), TableRow::new("a", "b", "2")]
        );

        let rebuilt = rows_to_record(&first);
        assert_eq!(Value::Object(rebuilt.clone()), json!({"a": {"a": "1", "b": "2"}}));
        assert_eq!(flatten(&rebuilt), first);
    }

    #[test]
    fn test_single_self_named_row_is_top_level() {
        let rows = vec![TableRow::new("model", "model", "prophet")];
        assert_eq!(Value::Object(rows_to_record(&rows)), json!({"model": "prophet"}));
    }
}
