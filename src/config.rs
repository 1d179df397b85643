use std::env;
use std::path::PathBuf;

/// Default embedding model identity reported by `/config` and `/toolset/info`.
/// Matches the multilingual sentence encoder the service ships with.
pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2";

pub struct Config {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    /// Model identity string surfaced in info/config responses.
    pub model_id: String,
    pub max_sequence_length: usize,
    /// Optional override for the ONNX session pool size. If None, uses available cores.
    pub pool_size: Option<usize>,
    /// Batch size for internal chunking during embedding inference.
    pub batch_size: usize,
    /// Maximum texts per embed request.
    pub max_texts: usize,
    pub shutdown_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            model_path: PathBuf::from(
                env::var("MODEL_PATH").unwrap_or_else(|_| "./models/model_int8.onnx".to_string()),
            ),
            tokenizer_path: PathBuf::from(
                env::var("TOKENIZER_PATH")
                    .unwrap_or_else(|_| "./models/tokenizer.json".to_string()),
            ),
            model_id: env::var("MODEL_ID").unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string()),
            max_sequence_length: env::var("MAX_SEQ_LENGTH")
                .unwrap_or_else(|_| "512".to_string())
                .parse()?,
            pool_size: env::var("POOL_SIZE").ok().and_then(|s| s.parse().ok()),
            batch_size: env::var("BATCH_SIZE")
                .unwrap_or_else(|_| "32".to_string())
                .parse()?,
            max_texts: env::var("MAX_TEXTS")
                .unwrap_or_else(|_| "1024".to_string())
                .parse()?,
            shutdown_timeout_secs: env::var("SHUTDOWN_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
        })
    }
}
