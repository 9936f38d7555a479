//! Terminal display utilities for documents.
//!
//! Documents are schemaless, so tables are built from the union of their
//! top-level keys. Nested values are abbreviated to keep rows on one line.

use comfy_table::{presets, Attribute, Cell, ContentArrangement, Table};
use serde_json::{Map, Value};
use std::io::{self, IsTerminal};

use crate::models::Document;

/// Default cell width before truncation
pub const DEFAULT_CELL_WIDTH: usize = 40;

/// Check if stdout is a terminal.
#[inline]
pub fn is_terminal() -> bool {
    io::stdout().is_terminal()
}

/// Truncate text to at most `max_width` characters, appending an ellipsis if
/// truncation occurred.
///
/// # Examples
///
/// ```
/// use mp_rester::utils::truncate_with_ellipsis;
///
/// assert_eq!(truncate_with_ellipsis("Hello World", 8), "Hello...");
/// assert_eq!(truncate_with_ellipsis("Hi", 8), "Hi");
/// ```
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if text.chars().count() <= max_width {
        return text.to_string();
    }
    if max_width <= 3 {
        return "...".to_string();
    }

    let truncated: String = text.chars().take(max_width - 3).collect();
    format!("{}...", truncated.trim_end())
}

/// One-line rendering of a JSON value
pub fn format_value(value: &Value, max_width: usize) -> String {
    let text = match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n),
        Value::Array(items) if items.iter().all(is_scalar) => items
            .iter()
            .map(|item| format_value(item, usize::MAX))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Array(items) => format!("[{} items]", items.len()),
        Value::Object(map) => format!("{{{} fields}}", map.len()),
    };
    truncate_with_ellipsis(&text, max_width)
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn format_number(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() != 0.0 => format!("{:.4}", f)
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string(),
        _ => n.to_string(),
    }
}

/// Column names: `columns` when given, otherwise every top-level key in order
/// of first appearance
pub fn table_columns(documents: &[Document], columns: Option<&[String]>) -> Vec<String> {
    if let Some(columns) = columns.filter(|c| !c.is_empty()) {
        return columns.to_vec();
    }

    let mut names: Vec<String> = Vec::new();
    for key in documents.iter().flat_map(Document::keys) {
        if !names.iter().any(|n| n == key) {
            names.push(key.to_string());
        }
    }
    names
}

/// A table with one row per document
pub fn document_table(documents: &[Document], columns: Option<&[String]>) -> Table {
    let columns = table_columns(documents, columns);

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            columns
                .iter()
                .map(|c| Cell::new(c).add_attribute(Attribute::Bold)),
        );

    for doc in documents {
        table.add_row(columns.iter().map(|column| {
            Cell::new(
                doc.get(column)
                    .map(|v| format_value(v, DEFAULT_CELL_WIDTH))
                    .unwrap_or_default(),
            )
        }));
    }
    table
}

/// A two-column field/value table
pub fn key_value_table(map: &Map<String, Value>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Field").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

    for (key, value) in map {
        table.add_row(vec![
            Cell::new(key),
            Cell::new(format_value(value, DEFAULT_CELL_WIDTH * 2)),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("Hello", 10), "Hello");
        assert_eq!(truncate_with_ellipsis("Hello World", 8), "Hello...");
        assert_eq!(truncate_with_ellipsis("", 10), "");
        assert_eq!(truncate_with_ellipsis("Hello", 0), "");
        assert_eq!(truncate_with_ellipsis("Hello", 2), "...");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!(["Fe", "O"]), 40), "Fe, O");
        assert_eq!(format_value(&json!({"a": 1, "b": 2}), 40), "{2 fields}");
        assert_eq!(format_value(&json!([{"a": 1}]), 40), "[1 items]");
        assert_eq!(format_value(&json!(0.125), 40), "0.125");
        assert_eq!(format_value(&json!(12), 40), "12");
        assert_eq!(format_value(&Value::Null, 40), "");
    }

    #[test]
    fn test_table_columns_union() {
        let docs = vec![
            Document::from_value("materials", json!({"material_id": "mp-1", "nsites": 2})),
            Document::from_value("materials", json!({"material_id": "mp-2", "volume": 10.5})),
        ];

        let columns = table_columns(&docs, None);
        assert_eq!(columns.len(), 3);
        assert!(columns.contains(&"volume".to_string()));

        let chosen = vec!["nsites".to_string()];
        assert_eq!(table_columns(&docs, Some(chosen.as_slice())), chosen);

        let rendered = document_table(&docs, None).to_string();
        assert!(rendered.contains("mp-2"));
        assert!(rendered.contains("10.5"));
    }
}
