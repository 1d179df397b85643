//! Cosine-similarity ranking over a vector index.

use crate::catalog::VectorIndex;
use ndarray::{Array2, ArrayView1};

/// Norm perturbation guarding against division by zero for degenerate
/// (all-zero) vectors. Scores stay well-defined, at the cost of not being
/// exactly bounded by [-1, 1] in the degenerate case.
const NORM_EPSILON: f32 = 1e-12;

/// Cosine similarity between `query` and every row of `vectors`.
pub fn cosine_scores(query: ArrayView1<f32>, vectors: &Array2<f32>) -> Vec<f32> {
    let query_norm = query.dot(&query).sqrt() + NORM_EPSILON;

    vectors
        .outer_iter()
        .map(|row| {
            let row_norm = row.dot(&row).sqrt() + NORM_EPSILON;
            query.dot(&row) / (query_norm * row_norm)
        })
        .collect()
}

/// Rank index entries by similarity to `query`, best first.
///
/// Returns `(item position, score)` pairs for the top `min(limit, len)`
/// entries. An absent index yields an empty ranking. The sort is stable, so
/// equal scores keep their catalog order. Zero and negative limits are a
/// caller contract violation rejected at the request boundary, not here.
pub fn rank<T>(
    query: ArrayView1<f32>,
    index: Option<&VectorIndex<T>>,
    limit: usize,
) -> Vec<(usize, f32)> {
    let Some(index) = index else {
        return Vec::new();
    };

    let scores = cosine_scores(query, index.vectors());

    let mut order: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
    order.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    order.truncate(limit.min(index.len()));
    order
}
