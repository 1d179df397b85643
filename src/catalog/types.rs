//! Type definitions for catalog entries.

use serde::Serialize;
use serde_json::Value;

/// A normalized tool record ready for embedding and ranking.
///
/// Built from one entry of a toolset payload. The `document` field is the
/// pre-computed canonical text handed to the embedding model, while
/// `input_schema` preserves the raw schema for echoing back to callers and
/// for deriving argument suggestions.
#[derive(Debug, Clone, Serialize)]
pub struct ToolRecord {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Raw `inputSchema` value from the payload, if any.
    pub input_schema: Option<Value>,
    /// Canonical embedding text for this tool.
    pub document: String,
}

/// A normalized table record ready for embedding and ranking.
///
/// Only tables with a non-empty string name survive ingestion; anything else
/// is dropped before a record is built.
#[derive(Debug, Clone, Serialize)]
pub struct TableRecord {
    pub name: String,
    /// Canonical embedding text for this table.
    pub document: String,
}
