//! Process-wide holder of the tool and table vector indexes.
//!
//! Reconfiguration is rare and administrative, so writers are fully
//! serialized: one mutex guards "build the new index, then swap". Readers
//! take an `Arc` snapshot of the whole catalog through a pointer swap and
//! never wait on an in-flight rebuild.

use crate::catalog::document;
use crate::catalog::index::VectorIndex;
use crate::catalog::types::{TableRecord, ToolRecord};
use crate::embedding::Embedder;
use crate::error::{AppError, Result};
use serde_json::Value;
use std::sync::{Arc, Mutex, RwLock};

/// One immutable version of the catalog. Replaced wholesale on every
/// reconfiguration; a snapshot is internally consistent by construction.
#[derive(Debug, Default)]
pub struct CatalogState {
    pub tool_index: Option<Arc<VectorIndex<ToolRecord>>>,
    pub table_index: Option<Arc<VectorIndex<TableRecord>>>,
    pub generated_at: Option<String>,
}

impl CatalogState {
    pub fn tool_count(&self) -> usize {
        self.tool_index.as_ref().map_or(0, |index| index.len())
    }

    pub fn table_count(&self) -> usize {
        self.table_index.as_ref().map_or(0, |index| index.len())
    }
}

pub struct CatalogStore {
    current: RwLock<Arc<CatalogState>>,
    /// Serializes reconfigurations with each other. Index construction runs
    /// inside this critical section; readers only touch `current`.
    reload: Mutex<()>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(CatalogState::default())),
            reload: Mutex::new(()),
        }
    }

    /// Atomically-read snapshot of the current catalog. Cheap (`Arc` clone);
    /// concurrent reconfigurations are observed entirely-before or
    /// entirely-after, never partially.
    pub fn snapshot(&self) -> Arc<CatalogState> {
        let guard = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Replace the tool index (and `generatedAt`) from a toolset payload.
    ///
    /// `tools` must be an array when present; absent or null means an empty
    /// toolset, not an error. All-or-nothing: on any failure the previous
    /// catalog version stays current. Returns the retained tool count.
    pub fn set_toolset(&self, embedder: &dyn Embedder, payload: &Value) -> Result<usize> {
        let tools: Vec<ToolRecord> = match payload.get("tools") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(entries)) => entries.iter().map(document::normalize_tool).collect(),
            Some(other) => {
                return Err(AppError::InvalidCatalog(format!(
                    "toolset must be an array under key 'tools', got {}",
                    json_type_name(other)
                )))
            }
        };
        let generated_at = payload
            .get("generatedAt")
            .and_then(Value::as_str)
            .map(str::to_owned);

        let _reload = self
            .reload
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let count = tools.len();
        let tool_index = VectorIndex::build(tools, |tool| tool.document.clone(), embedder)?;

        self.swap(|previous| CatalogState {
            tool_index: tool_index.map(Arc::new),
            table_index: previous.table_index.clone(),
            generated_at,
        });

        tracing::info!(tool_count = count, "Toolset index replaced");
        Ok(count)
    }

    /// Replace the table index from a schema payload.
    ///
    /// Entries without a usable name are dropped silently; an empty result
    /// yields an absent index (table ranking returns empty, not an error).
    /// Returns the retained table count.
    pub fn set_schema(&self, embedder: &dyn Embedder, payload: &Value) -> Result<usize> {
        let tables: Vec<TableRecord> = match payload.get("tables") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(entries)) => {
                entries.iter().filter_map(document::normalize_table).collect()
            }
            Some(other) => {
                return Err(AppError::InvalidCatalog(format!(
                    "schema must be an array under key 'tables', got {}",
                    json_type_name(other)
                )))
            }
        };

        let _reload = self
            .reload
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let count = tables.len();
        let table_index = VectorIndex::build(tables, |table| table.document.clone(), embedder)?;

        self.swap(|previous| CatalogState {
            tool_index: previous.tool_index.clone(),
            table_index: table_index.map(Arc::new),
            generated_at: previous.generated_at.clone(),
        });

        tracing::info!(table_count = count, "Schema index replaced");
        Ok(count)
    }

    /// Publish a new catalog version derived from the current one.
    fn swap<F>(&self, next: F)
    where
        F: FnOnce(&CatalogState) -> CatalogState,
    {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let next_state = next(&guard);
        *guard = Arc::new(next_state);
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
