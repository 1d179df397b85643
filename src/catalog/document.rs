//! Canonical document text for catalog entries.
//!
//! Tools and tables are flattened into short plain-text documents before
//! embedding. The exact layout matters: it is the only signal the encoder
//! sees, so names, descriptions, parameter keys, and relational structure
//! all land on their own lines or segments.

use crate::catalog::types::{TableRecord, ToolRecord};
use serde_json::Value;

/// Build the embedding document for a tool entry.
///
/// One line each for name and description (omitted when absent or empty),
/// then `"<key>: <description-or-type>"` per property in schema insertion
/// order (non-object property specs are skipped), then a trailing
/// `"required=a, b"` line when the schema lists required parameters.
pub fn tool_document(tool: &Value) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(name) = non_empty_str(tool.get("name")) {
        parts.push(name.to_string());
    }
    if let Some(description) = non_empty_str(tool.get("description")) {
        parts.push(description.to_string());
    }

    let schema = tool.get("inputSchema");

    if let Some(properties) = schema
        .and_then(|s| s.get("properties"))
        .and_then(Value::as_object)
    {
        for (key, spec) in properties {
            if !spec.is_object() {
                continue;
            }
            let detail = non_empty_str(spec.get("description"))
                .or_else(|| non_empty_str(spec.get("type")))
                .unwrap_or("");
            parts.push(format!("{}: {}", key, detail));
        }
    }

    if let Some(required) = schema.and_then(|s| s.get("required")).and_then(Value::as_array) {
        let names: Vec<&str> = required.iter().filter_map(Value::as_str).collect();
        if !names.is_empty() {
            parts.push(format!("required={}", names.join(", ")));
        }
    }

    parts.join("\n")
}

/// Normalize one toolset payload entry into a [`ToolRecord`].
///
/// Never fails: missing or mistyped fields normalize to `None`, and the
/// record stays positionally aligned with the payload.
pub fn normalize_tool(value: &Value) -> ToolRecord {
    ToolRecord {
        name: value
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_owned),
        description: value
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_owned),
        input_schema: value
            .get("inputSchema")
            .filter(|v| !v.is_null())
            .cloned(),
        document: tool_document(value),
    }
}

/// Normalize one schema payload entry into a [`TableRecord`].
///
/// Returns `None` when the entry has no usable name (missing, not a string,
/// or empty); such entries are dropped from ingestion. Column and foreign
/// key fields that are missing render as empty strings, not omitted, so the
/// document shape stays uniform across tables.
pub fn normalize_table(value: &Value) -> Option<TableRecord> {
    let name = non_empty_str(value.get("name"))?;

    let columns = value
        .get("columns")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let col_desc = columns
        .iter()
        .map(|col| {
            format!(
                "{} {}",
                col.get("name").and_then(Value::as_str).unwrap_or(""),
                col.get("type").and_then(Value::as_str).unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join(" ");

    let fks = value
        .get("fks")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let fk_desc = fks
        .iter()
        .map(|fk| {
            format!(
                "{}->{}",
                fk.get("column").and_then(Value::as_str).unwrap_or(""),
                fk.get("refTable").and_then(Value::as_str).unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join(" ");

    Some(TableRecord {
        name: name.to_owned(),
        document: format!("Table {}\nColumns: {}\nFK: {}", name, col_desc, fk_desc),
    })
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}
