use crate::error::{AppError, Result};
use crate::handlers::acquire_permit;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct EmbedRequest {
    pub texts: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EmbedResponse {
    pub embeddings: Vec<Vec<f32>>,
}

/// POST /embed - Encode a batch of texts into embedding vectors.
///
/// Raw provider access with no ranking logic: one batch in, one ordered
/// matrix out.
pub async fn embed_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EmbedRequest>,
) -> Result<Json<EmbedResponse>> {
    if request.texts.is_empty() {
        return Err(AppError::ValidationError(
            "Texts list cannot be empty".to_string(),
        ));
    }
    let max_texts = state.config.max_texts;
    if request.texts.len() > max_texts {
        return Err(AppError::ValidationError(format!(
            "Maximum {} texts per request",
            max_texts
        )));
    }

    let embedder = state.embedder().await?;
    let _permit = acquire_permit(&state).await?;

    let texts = request.texts;
    let batch_size = texts.len();

    let matrix = tokio::task::spawn_blocking(move || embedder.embed(&texts))
        .await
        .map_err(|e| AppError::ResourceError(format!("Embedding task failed: {}", e)))??;

    let embeddings: Vec<Vec<f32>> = matrix.outer_iter().map(|row| row.to_vec()).collect();

    tracing::debug!(batch_size, "Embed completed");

    metrics::counter!("embed_requests_total").increment(1);
    metrics::histogram!("embed_batch_size").record(batch_size as f64);

    Ok(Json(EmbedResponse { embeddings }))
}
