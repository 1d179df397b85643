pub mod catalog;
pub mod embed;
pub mod health;
pub mod rank;

pub use catalog::{
    config_handler, set_schema_handler, set_toolset_handler, toolset_info_handler,
};
pub use embed::embed_handler;
pub use health::{health_handler, ready_handler};
pub use rank::{rank_tables_handler, rank_tools_handler};

use crate::error::{AppError, Result};
use crate::state::AppState;
use std::time::Duration;
use tokio::sync::SemaphorePermit;

/// Acquire an inference permit, shedding load after a short wait.
///
/// Permits mirror the ONNX session pool size, so a granted permit means a
/// session will be available to the blocking task.
pub(crate) async fn acquire_permit(state: &AppState) -> Result<SemaphorePermit<'_>> {
    tokio::time::timeout(Duration::from_secs(5), state.semaphore.acquire())
        .await
        .map_err(|_| {
            AppError::ResourceError("Service temporarily overloaded, please retry".to_string())
        })?
        .map_err(|_| AppError::ResourceError("Semaphore closed".to_string()))
}
