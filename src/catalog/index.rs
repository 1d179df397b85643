//! In-memory vector index pairing catalog items with embedding rows.

use crate::embedding::Embedder;
use crate::error::{AppError, Result};
use ndarray::Array2;

/// An ordered, immutable pairing of catalog items with their embedding
/// vectors. Row `i` of `vectors` is the embedding of `items[i]`; the pairing
/// is established at build time and never mutated afterwards.
///
/// An empty catalog has no index at all (`None` at the call sites) rather
/// than a zero-row matrix, which lets ranking short-circuit.
#[derive(Debug)]
pub struct VectorIndex<T> {
    items: Vec<T>,
    vectors: Array2<f32>,
}

impl<T> VectorIndex<T> {
    /// Embed all items in one provider batch and pair rows positionally.
    ///
    /// Returns `Ok(None)` for an empty item list. Construction is pure: the
    /// result has no effect until swapped into the catalog store.
    pub fn build<F>(items: Vec<T>, to_text: F, embedder: &dyn Embedder) -> Result<Option<Self>>
    where
        F: Fn(&T) -> String,
    {
        if items.is_empty() {
            return Ok(None);
        }

        let documents: Vec<String> = items.iter().map(to_text).collect();
        let vectors = embedder.embed(&documents)?;

        if vectors.nrows() != items.len() {
            return Err(AppError::EmbedderError(format!(
                "Expected {} embedding rows, got {}",
                items.len(),
                vectors.nrows()
            )));
        }

        Ok(Some(Self { items, vectors }))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn vectors(&self) -> &Array2<f32> {
        &self.vectors
    }
}
