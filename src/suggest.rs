//! Argument default suggestions for ranked tools.
//!
//! Once a tool has been ranked for a prompt, its input schema is inspected
//! for well-known parameter names and pre-filled: the top-ranked table goes
//! into the first table-shaped parameter, and pagination parameters get
//! conservative defaults.

use serde_json::{Map, Value};

/// Property names that receive the primary table hint, checked in this
/// fixed order; only the first present one is ever filled.
const TABLE_PARAMETER_KEYS: [&str; 3] = ["tableName", "table", "table_name"];

/// Default row cap suggested for `limit` parameters.
const DEFAULT_LIMIT: i64 = 50;

/// Default starting offset suggested for `offset` parameters.
const DEFAULT_OFFSET: i64 = 0;

/// Derive argument defaults for a tool from its input schema and the
/// primary table hint.
///
/// Returns `None` when the schema has no well-formed `properties` object or
/// when no suggestion applies, never an empty map.
pub fn suggest_arguments(
    input_schema: Option<&Value>,
    primary_table: Option<&str>,
) -> Option<Map<String, Value>> {
    let properties = input_schema?.get("properties")?.as_object()?;

    let mut suggestions = Map::new();

    if let Some(table) = primary_table {
        for key in TABLE_PARAMETER_KEYS {
            if properties.contains_key(key) && !suggestions.contains_key(key) {
                suggestions.insert(key.to_string(), Value::String(table.to_string()));
                break;
            }
        }
    }

    if properties.contains_key("limit") && !suggestions.contains_key("limit") {
        suggestions.insert("limit".to_string(), Value::from(DEFAULT_LIMIT));
    }
    if properties.contains_key("offset") && !suggestions.contains_key("offset") {
        suggestions.insert("offset".to_string(), Value::from(DEFAULT_OFFSET));
    }

    if suggestions.is_empty() {
        None
    } else {
        Some(suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_and_limit_defaults() {
        let schema = json!({ "properties": { "tableName": {}, "limit": {} } });
        let suggestions = suggest_arguments(Some(&schema), Some("users")).unwrap();

        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions["tableName"], json!("users"));
        assert_eq!(suggestions["limit"], json!(50));
    }

    #[test]
    fn test_only_first_table_key_is_filled() {
        let schema = json!({ "properties": { "table": {}, "table_name": {} } });
        let suggestions = suggest_arguments(Some(&schema), Some("orders")).unwrap();

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions["table"], json!("orders"));
        assert!(!suggestions.contains_key("table_name"));
    }

    #[test]
    fn test_table_key_order_is_fixed() {
        let schema = json!({ "properties": { "table_name": {}, "tableName": {} } });
        let suggestions = suggest_arguments(Some(&schema), Some("orders")).unwrap();

        // "tableName" wins regardless of schema declaration order.
        assert_eq!(suggestions["tableName"], json!("orders"));
        assert!(!suggestions.contains_key("table_name"));
    }

    #[test]
    fn test_offset_default() {
        let schema = json!({ "properties": { "offset": {} } });
        let suggestions = suggest_arguments(Some(&schema), None).unwrap();

        assert_eq!(suggestions["offset"], json!(0));
    }

    #[test]
    fn test_no_primary_table_still_fills_pagination() {
        let schema = json!({ "properties": { "tableName": {}, "limit": {} } });
        let suggestions = suggest_arguments(Some(&schema), None).unwrap();

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions["limit"], json!(50));
    }

    #[test]
    fn test_nothing_to_suggest_is_none() {
        let schema = json!({ "properties": { "query": {} } });
        assert!(suggest_arguments(Some(&schema), None).is_none());
    }

    #[test]
    fn test_malformed_properties_is_none() {
        assert!(suggest_arguments(None, Some("users")).is_none());
        assert!(suggest_arguments(Some(&json!({})), Some("users")).is_none());
        assert!(suggest_arguments(Some(&json!({ "properties": [] })), Some("users")).is_none());
        assert!(suggest_arguments(Some(&json!({ "properties": "x" })), Some("users")).is_none());
    }
}
