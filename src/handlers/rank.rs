//! Ranking handlers: match a free-text prompt against the tool and table
//! catalogs.
//!
//! Both handlers embed the prompt once (a one-element provider batch) and
//! score it against the pre-computed catalog index from a single snapshot,
//! so a concurrent reconfiguration is either fully visible or not at all.

use crate::error::{AppError, Result};
use crate::handlers::acquire_permit;
use crate::ranking;
use crate::state::AppState;
use crate::suggest;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Number of table hints computed alongside every tool ranking.
///
/// Fixed policy, independent of the caller's tool limit: argument
/// suggestions only ever consume the single best table, and a small stable
/// hint set keeps the response compact.
pub const TABLE_HINT_LIMIT: usize = 3;

fn default_limit() -> usize {
    6
}

#[derive(Debug, Deserialize)]
pub struct RankRequest {
    /// The natural-language prompt to match against the catalog.
    pub prompt: String,
    /// Number of top results to return (default: 6).
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct RankedTool {
    pub name: Option<String>,
    pub description: Option<String>,
    pub score: f32,
    #[serde(rename = "inputSchema")]
    pub input_schema: Option<Value>,
    #[serde(
        rename = "argumentSuggestions",
        skip_serializing_if = "Option::is_none"
    )]
    pub argument_suggestions: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
pub struct TableHint {
    pub name: String,
    pub score: f32,
}

#[derive(Debug, Serialize)]
pub struct RankToolsResponse {
    pub tools: Vec<RankedTool>,
    #[serde(rename = "tableHints")]
    pub table_hints: Vec<TableHint>,
}

#[derive(Debug, Serialize)]
pub struct RankTablesResponse {
    pub tables: Vec<TableHint>,
}

/// POST /rank/tools - Rank catalog tools by relevance to a prompt.
///
/// # Flow
/// 1. Validate input, ensure the embedding provider is initialized
/// 2. Take one catalog snapshot and embed the prompt
/// 3. Rank tools by cosine similarity; independently rank table hints
/// 4. Attach argument suggestions derived from the primary table hint
pub async fn rank_tools_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RankRequest>,
) -> Result<Json<RankToolsResponse>> {
    validate(&request)?;

    let start = std::time::Instant::now();
    let embedder = state.embedder().await?;
    let snapshot = state.catalog.snapshot();

    let _permit = acquire_permit(&state).await?;

    let prompt = request.prompt;
    let limit = request.limit;

    let response = tokio::task::spawn_blocking(move || -> Result<RankToolsResponse> {
        let query = embedder.embed(&[prompt])?;
        let query = query.row(0).to_owned();

        let mut table_hints = Vec::new();
        if let Some(index) = snapshot.table_index.as_deref() {
            for (idx, score) in ranking::rank(query.view(), Some(index), TABLE_HINT_LIMIT) {
                table_hints.push(TableHint {
                    name: index.items()[idx].name.clone(),
                    score,
                });
            }
        }
        let primary_table = table_hints.first().map(|hint| hint.name.clone());

        let mut tools = Vec::new();
        if let Some(index) = snapshot.tool_index.as_deref() {
            for (idx, score) in ranking::rank(query.view(), Some(index), limit) {
                let tool = &index.items()[idx];
                tools.push(RankedTool {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    score,
                    input_schema: tool.input_schema.clone(),
                    argument_suggestions: suggest::suggest_arguments(
                        tool.input_schema.as_ref(),
                        primary_table.as_deref(),
                    ),
                });
            }
        }

        Ok(RankToolsResponse { tools, table_hints })
    })
    .await
    .map_err(|e| AppError::ResourceError(format!("Ranking task failed: {}", e)))??;

    tracing::debug!(
        tools = response.tools.len(),
        hints = response.table_hints.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Tool ranking completed"
    );

    metrics::counter!("rank_tools_requests_total").increment(1);
    metrics::histogram!("rank_latency_ms").record(start.elapsed().as_millis() as f64);

    Ok(Json(response))
}

/// POST /rank/tables - Rank catalog tables by relevance to a prompt.
pub async fn rank_tables_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RankRequest>,
) -> Result<Json<RankTablesResponse>> {
    validate(&request)?;

    let start = std::time::Instant::now();
    let embedder = state.embedder().await?;
    let snapshot = state.catalog.snapshot();

    let _permit = acquire_permit(&state).await?;

    let prompt = request.prompt;
    let limit = request.limit;

    let tables = tokio::task::spawn_blocking(move || -> Result<Vec<TableHint>> {
        let query = embedder.embed(&[prompt])?;
        let query = query.row(0).to_owned();

        let mut tables = Vec::new();
        if let Some(index) = snapshot.table_index.as_deref() {
            for (idx, score) in ranking::rank(query.view(), Some(index), limit) {
                tables.push(TableHint {
                    name: index.items()[idx].name.clone(),
                    score,
                });
            }
        }
        Ok(tables)
    })
    .await
    .map_err(|e| AppError::ResourceError(format!("Ranking task failed: {}", e)))??;

    tracing::debug!(
        tables = tables.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Table ranking completed"
    );

    metrics::counter!("rank_tables_requests_total").increment(1);
    metrics::histogram!("rank_latency_ms").record(start.elapsed().as_millis() as f64);

    Ok(Json(RankTablesResponse { tables }))
}

fn validate(request: &RankRequest) -> Result<()> {
    if request.prompt.is_empty() {
        return Err(AppError::ValidationError(
            "Prompt cannot be empty".to_string(),
        ));
    }
    if request.limit == 0 {
        return Err(AppError::ValidationError(
            "limit must be at least 1".to_string(),
        ));
    }
    Ok(())
}
