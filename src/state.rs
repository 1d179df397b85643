use crate::catalog::CatalogStore;
use crate::config::Config;
use crate::embedding::{Embedder, OnnxEmbedder};
use crate::error::{AppError, Result};
use std::sync::Arc;
use tokio::sync::{OnceCell, Semaphore};

/// Application state shared across all request handlers.
///
/// Constructed once in `main` and passed to handlers through axum's `State`
/// extractor; there is no global lookup. The embedding model is NOT loaded
/// at construction - the first caller of [`AppState::embedder`] pays for
/// initialization, and every concurrent first caller awaits the same
/// in-flight load.
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<CatalogStore>,
    /// Bounds concurrent inference to the session pool size.
    pub semaphore: Arc<Semaphore>,
    embedder: OnceCell<Arc<dyn Embedder>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let permits = config.pool_size.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        });

        Self {
            config: Arc::new(config),
            catalog: Arc::new(CatalogStore::new()),
            semaphore: Arc::new(Semaphore::new(permits)),
            embedder: OnceCell::new(),
        }
    }

    /// Build state around an already-constructed embedding provider.
    ///
    /// The lazy-load barrier is pre-resolved; used by tests that substitute
    /// a deterministic encoder for the ONNX model.
    pub fn with_embedder(config: Config, embedder: Arc<dyn Embedder>) -> Self {
        let state = Self::new(config);
        Self {
            embedder: OnceCell::new_with(Some(embedder)),
            ..state
        }
    }

    /// Initialize-once access to the embedding provider.
    ///
    /// Concurrent first callers all await the same load; a failed load is
    /// surfaced to every waiter and retried by the next caller. Model
    /// loading is file I/O plus ONNX session construction, so it runs on
    /// the blocking pool.
    pub async fn embedder(&self) -> Result<Arc<dyn Embedder>> {
        let embedder = self
            .embedder
            .get_or_try_init(|| async {
                let config = Arc::clone(&self.config);
                let loaded = tokio::task::spawn_blocking(move || OnnxEmbedder::load(&config))
                    .await
                    .map_err(|e| {
                        AppError::ResourceError(format!("Embedder init task failed: {}", e))
                    })??;

                tracing::info!(model_id = %loaded.model_id(), "Embedding provider ready");
                Ok::<Arc<dyn Embedder>, AppError>(Arc::new(loaded))
            })
            .await?;

        Ok(Arc::clone(embedder))
    }

    /// Check if the service is ready to handle ranking requests.
    pub fn is_ready(&self) -> bool {
        self.embedder.initialized()
    }
}
