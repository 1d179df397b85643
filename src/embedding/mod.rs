//! Embedding provider abstraction and the ONNX-backed implementation.
//!
//! The [`Embedder`] trait is the seam between the catalog/ranking core and
//! the model runtime: the core only needs ordered batch encoding plus model
//! metadata, so tests can substitute a deterministic in-memory encoder.

pub mod onnx;

pub use onnx::OnnxEmbedder;

use crate::error::Result;
use ndarray::Array2;

/// Batch text encoder producing fixed-dimension embedding vectors.
///
/// Implementations must return one row per input text, in input order,
/// and must be deterministic for a fixed configuration.
pub trait Embedder: Send + Sync {
    /// Model identity string (e.g. the upstream model name).
    fn model_id(&self) -> &str;

    /// Embedding vector dimensionality.
    fn dims(&self) -> usize;

    /// Encode a batch of texts into a `(texts.len(), dims)` matrix.
    fn embed(&self, texts: &[String]) -> Result<Array2<f32>>;
}
