//! toolrank - Embedding-based tool and schema ranking service
//!
//! This library exposes the core components of the ranking service,
//! enabling integration tests and potential embedding in other applications.

pub mod catalog;
pub mod config;
pub mod embedding;
pub mod error;
pub mod handlers;
pub mod ranking;
pub mod state;
pub mod suggest;

// Re-export key types for convenience
pub use catalog::{CatalogState, CatalogStore, TableRecord, ToolRecord, VectorIndex};
pub use config::Config;
pub use embedding::{Embedder, OnnxEmbedder};
pub use error::{AppError, Result};
pub use state::AppState;
