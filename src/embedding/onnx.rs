//! ONNX sentence encoder with a lock-free session pool.
//!
//! Produces sentence embeddings by mean pooling token states and L2
//! normalizing the result. Query and catalog documents are encoded
//! independently, which is what makes pre-computed catalog indexes possible.

use crate::config::Config;
use crate::embedding::Embedder;
use crate::error::{AppError, Result};
use crossbeam::queue::ArrayQueue;
use ndarray::{Array2, Axis};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use std::cell::UnsafeCell;
use std::sync::Arc;
use tokenizers::Tokenizer;

/// Embedding dimension of the default MiniLM-L12 sentence encoder.
const EMBEDDING_DIM: usize = 384;

/// Sentence embedding model backed by a pool of ONNX Runtime sessions.
///
/// # Design Rationale
/// ONNX `Session::run` requires `&mut self`, but embedding requests arrive
/// concurrently. Instead of a Mutex (which serializes all requests), the
/// embedder owns N independent sessions and hands out exclusive access via a
/// lock-free queue of indices, one session per in-flight inference.
///
/// # Safety
/// The `ArrayQueue` guarantees each session index is held by at most one
/// thread between acquire and release, which makes the `UnsafeCell` access
/// sound without blocking.
pub struct OnnxEmbedder {
    /// Pool of ONNX sessions, exclusive access guaranteed by `available`.
    sessions: Vec<UnsafeCell<Session>>,
    /// Lock-free queue of available session indices.
    available: Arc<ArrayQueue<usize>>,
    tokenizer: Tokenizer,
    max_length: usize,
    /// Texts per session run; larger batches are chunked internally.
    batch_size: usize,
    model_id: String,
}

impl OnnxEmbedder {
    /// Load the model file once and build the session pool and tokenizer.
    ///
    /// Pool size defaults to the number of available cores. Each session runs
    /// with a single intra-op thread; parallelism comes from the pool, not
    /// from threads inside a session.
    pub fn load(config: &Config) -> Result<Self> {
        let pool_size = config.pool_size.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        });

        let tokenizer = Tokenizer::from_file(&config.tokenizer_path)
            .map_err(|e| AppError::EmbedderError(format!("Failed to load tokenizer: {}", e)))?;

        let model_bytes = std::fs::read(&config.model_path)
            .map_err(|e| AppError::EmbedderError(format!("Failed to read model file: {}", e)))?;

        let mut sessions = Vec::with_capacity(pool_size);
        let available = Arc::new(ArrayQueue::new(pool_size));

        for i in 0..pool_size {
            let session = Session::builder()
                .map_err(|e| AppError::EmbedderError(e.to_string()))?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .map_err(|e| AppError::EmbedderError(e.to_string()))?
                .with_intra_threads(1)
                .map_err(|e| AppError::EmbedderError(e.to_string()))?
                .commit_from_memory(&model_bytes)
                .map_err(|e: ort::Error| AppError::EmbedderError(e.to_string()))?;

            sessions.push(UnsafeCell::new(session));
            available
                .push(i)
                .map_err(|_| AppError::EmbedderError("Failed to initialize session pool".into()))?;
        }

        tracing::info!(
            model = %config.model_path.display(),
            tokenizer = %config.tokenizer_path.display(),
            pool_size,
            max_length = config.max_sequence_length,
            "Embedding model loaded"
        );

        Ok(Self {
            sessions,
            available,
            tokenizer,
            max_length: config.max_sequence_length,
            batch_size: config.batch_size,
            model_id: config.model_id.clone(),
        })
    }

    fn acquire_session(&self) -> Result<usize> {
        self.available
            .pop()
            .ok_or_else(|| AppError::ResourceError("No available sessions in pool".into()))
    }

    fn release_session(&self, index: usize) {
        // Never fails: we only release indices we acquired.
        let _ = self.available.push(index);
    }

    /// Encode one chunk of texts in a single session run.
    fn encode_chunk(&self, texts: &[String]) -> Result<Array2<f32>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| AppError::EmbedderError(format!("Tokenization failed: {}", e)))?;

        let batch_size = encodings.len();

        // Pad to the longest sequence in this chunk, capped at max_length.
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len().min(self.max_length))
            .max()
            .unwrap_or(1);

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        let token_type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let len = ids.len().min(max_len);

            for j in 0..len {
                input_ids[i * max_len + j] = ids[j] as i64;
                attention_mask[i * max_len + j] = mask[j] as i64;
            }
        }

        let shape = [batch_size, max_len];
        let input_ids_tensor = Tensor::from_array((shape, input_ids))
            .map_err(|e| AppError::EmbedderError(e.to_string()))?;
        let attention_mask_tensor = Tensor::from_array((shape, attention_mask.clone()))
            .map_err(|e| AppError::EmbedderError(e.to_string()))?;
        let token_type_ids_tensor = Tensor::from_array((shape, token_type_ids))
            .map_err(|e| AppError::EmbedderError(e.to_string()))?;

        let session_idx = self.acquire_session()?;

        let result = self.run_pooled_inference(
            session_idx,
            input_ids_tensor,
            attention_mask_tensor,
            token_type_ids_tensor,
            &attention_mask,
            batch_size,
            max_len,
        );

        // Always return the session to the pool.
        self.release_session(session_idx);

        result
    }

    #[allow(clippy::too_many_arguments)]
    fn run_pooled_inference(
        &self,
        session_idx: usize,
        input_ids: Tensor<i64>,
        attention_mask_tensor: Tensor<i64>,
        token_type_ids: Tensor<i64>,
        attention_mask: &[i64],
        batch_size: usize,
        max_len: usize,
    ) -> Result<Array2<f32>> {
        // SAFETY: ArrayQueue guarantees exclusive access to this index.
        // Only one thread holds session_idx between acquire_session() and
        // release_session().
        let session = unsafe { &mut *self.sessions[session_idx].get() };

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids,
            ])
            .map_err(|e| AppError::EmbedderError(format!("Encoder inference failed: {}", e)))?;

        // Token states, shape (batch, seq_len, hidden_size).
        let hidden_state = outputs
            .get("last_hidden_state")
            .ok_or_else(|| {
                AppError::EmbedderError("No 'last_hidden_state' output found".to_string())
            })?;

        let tensor = hidden_state
            .try_extract_tensor::<f32>()
            .map_err(|e| AppError::EmbedderError(e.to_string()))?;

        let (shape_info, data) = tensor;
        let hidden_size = shape_info[2] as usize;

        // Mean pooling over non-padding tokens, then L2 normalization.
        let mut embeddings = Array2::zeros((batch_size, hidden_size));

        for i in 0..batch_size {
            let mut sum = vec![0.0f32; hidden_size];
            let mut count = 0.0f32;

            for j in 0..max_len {
                if attention_mask[i * max_len + j] == 1 {
                    let base_idx = i * max_len * hidden_size + j * hidden_size;
                    for (k, sum_val) in sum.iter_mut().enumerate() {
                        *sum_val += data[base_idx + k];
                    }
                    count += 1.0;
                }
            }

            if count > 0.0 {
                for (k, sum_val) in sum.iter().enumerate() {
                    embeddings[[i, k]] = sum_val / count;
                }
            }

            let norm: f32 = embeddings.row(i).iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                let mut row = embeddings.row_mut(i);
                for val in row.iter_mut() {
                    *val /= norm;
                }
            }
        }

        Ok(embeddings)
    }
}

impl Embedder for OnnxEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dims(&self) -> usize {
        EMBEDDING_DIM
    }

    fn embed(&self, texts: &[String]) -> Result<Array2<f32>> {
        if texts.is_empty() {
            return Ok(Array2::zeros((0, EMBEDDING_DIM)));
        }

        let mut chunks = Vec::with_capacity(texts.len().div_ceil(self.batch_size));
        for chunk in texts.chunks(self.batch_size) {
            chunks.push(self.encode_chunk(chunk)?);
        }

        let views: Vec<_> = chunks.iter().map(|chunk| chunk.view()).collect();
        ndarray::concatenate(Axis(0), &views)
            .map_err(|e| AppError::EmbedderError(format!("Failed to assemble batch: {}", e)))
    }
}

// SAFETY: OnnxEmbedder is Send + Sync because:
// - ArrayQueue is lock-free and thread-safe (crossbeam guarantee)
// - ArrayQueue::pop() returns each index to at most one caller at a time
// - Between pop and push, only one thread can access each UnsafeCell<Session>
// - The tokenizer is only accessed through &self and is itself Send + Sync
unsafe impl Send for OnnxEmbedder {}
unsafe impl Sync for OnnxEmbedder {}
