//! Catalog administration handlers: replace the toolset or schema wholesale
//! and inspect the current configuration.

use crate::error::{AppError, Result};
use crate::handlers::acquire_permit;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct SetToolsetResponse {
    pub status: &'static str,
    #[serde(rename = "toolCount")]
    pub tool_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SetSchemaResponse {
    pub status: &'static str,
    #[serde(rename = "tableCount")]
    pub table_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ToolsetInfoResponse {
    #[serde(rename = "generatedAt")]
    pub generated_at: Option<String>,
    pub count: usize,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub model: String,
    #[serde(rename = "toolCount")]
    pub tool_count: usize,
    #[serde(rename = "tableCount")]
    pub table_count: usize,
    #[serde(rename = "generatedAt")]
    pub generated_at: Option<String>,
}

/// PUT /config/toolset - Replace the tool catalog and rebuild its index.
///
/// The payload arrives as raw JSON so the store can distinguish an absent
/// `tools` key (empty toolset) from a mistyped one (client error).
pub async fn set_toolset_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<Json<SetToolsetResponse>> {
    let embedder = state.embedder().await?;
    let _permit = acquire_permit(&state).await?;

    let catalog = Arc::clone(&state.catalog);
    let tool_count =
        tokio::task::spawn_blocking(move || catalog.set_toolset(embedder.as_ref(), &payload))
            .await
            .map_err(|e| AppError::ResourceError(format!("Reindex task failed: {}", e)))??;

    metrics::counter!("catalog_reloads_total", "kind" => "toolset").increment(1);

    Ok(Json(SetToolsetResponse {
        status: "ok",
        tool_count,
    }))
}

/// PUT /config/schema - Replace the table catalog and rebuild its index.
pub async fn set_schema_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<Json<SetSchemaResponse>> {
    let embedder = state.embedder().await?;
    let _permit = acquire_permit(&state).await?;

    let catalog = Arc::clone(&state.catalog);
    let table_count =
        tokio::task::spawn_blocking(move || catalog.set_schema(embedder.as_ref(), &payload))
            .await
            .map_err(|e| AppError::ResourceError(format!("Reindex task failed: {}", e)))??;

    metrics::counter!("catalog_reloads_total", "kind" => "schema").increment(1);

    Ok(Json(SetSchemaResponse {
        status: "ok",
        table_count,
    }))
}

/// GET /toolset/info - Toolset metadata from one consistent snapshot.
pub async fn toolset_info_handler(
    State(state): State<Arc<AppState>>,
) -> Json<ToolsetInfoResponse> {
    let snapshot = state.catalog.snapshot();
    Json(ToolsetInfoResponse {
        generated_at: snapshot.generated_at.clone(),
        count: snapshot.tool_count(),
        model: state.config.model_id.clone(),
    })
}

/// GET /config - Current catalog configuration.
pub async fn config_handler(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    let snapshot = state.catalog.snapshot();
    Json(ConfigResponse {
        model: state.config.model_id.clone(),
        tool_count: snapshot.tool_count(),
        table_count: snapshot.table_count(),
        generated_at: snapshot.generated_at.clone(),
    })
}
