//! Embedding model wrapper for fastembed.
//!
//! Provides a high-level interface for generating embeddings:
//! - The `Embedder` trait used by the search service
//! - The `ModelLoader` trait for the one-time, slow model load
//! - A fastembed-backed implementation of both

use fastembed::{InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::Mutex;

/// Error type for embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Invalid model name: {0}")]
    InvalidModel(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Model returned {got} embeddings for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
}

/// Maps text to fixed-dimension vectors.
///
/// Implementations must be deterministic: the same text always yields the
/// same vector, otherwise search results are not reproducible.
pub trait Embedder: Send + Sync {
    /// Output dimension, constant for the lifetime of the model.
    fn dimensions(&self) -> usize;

    /// Embed a batch, one vector per input in the same order.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single text.
    fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut embeddings = self.embed(&[text.to_string()])?;
        match embeddings.len() {
            1 => Ok(embeddings.remove(0)),
            got => Err(EmbeddingError::CountMismatch { expected: 1, got }),
        }
    }
}

/// Loads an embedding model. Called at most once per successful
/// initialization of the search service.
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<Box<dyn Embedder>, EmbeddingError>;
}

/// Wrapper around fastembed's TextEmbedding model.
/// Uses a Mutex because fastembed's embed() requires &mut self.
pub struct EmbeddingModel {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimensions: usize,
}

impl EmbeddingModel {
    /// Create a new embedding model with the given name.
    ///
    /// The model will be downloaded on first use if not cached.
    /// Models are cached in `cache_dir`.
    pub fn new(
        model_name: &str,
        cache_dir: PathBuf,
        show_download_progress: bool,
    ) -> Result<Self, EmbeddingError> {
        let model_enum = Self::parse_model_name(model_name)?;

        std::fs::create_dir_all(&cache_dir).map_err(|e| {
            EmbeddingError::ModelUnavailable(format!("Failed to create models directory: {}", e))
        })?;

        let options = InitOptions::new(model_enum)
            .with_cache_dir(cache_dir)
            .with_show_download_progress(show_download_progress);

        let mut model = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::ModelUnavailable(e.to_string()))?;

        // Get model dimensions by embedding a test string
        let dimensions = Self::probe_dimensions(&mut model)?;

        Ok(Self {
            model: Mutex::new(model),
            model_name: model_name.to_string(),
            dimensions,
        })
    }

    /// Get the model name
    pub fn name(&self) -> &str {
        &self.model_name
    }

    /// Parse model name string to fastembed enum.
    fn parse_model_name(name: &str) -> Result<fastembed::EmbeddingModel, EmbeddingError> {
        match name.to_lowercase().as_str() {
            "all-minilm-l6-v2" | "allminiml6v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
            "all-minilm-l6-v2-q" | "allminiml6v2q" => {
                Ok(fastembed::EmbeddingModel::AllMiniLML6V2Q)
            }
            "bge-small-en-v1.5" | "bgesmallenv15" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
            "bge-small-en-v1.5-q" | "bgesmallenv15q" => {
                Ok(fastembed::EmbeddingModel::BGESmallENV15Q)
            }
            "bge-base-en-v1.5" | "bgebaseenv15" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
            "bge-base-en-v1.5-q" | "bgebaseenv15q" => {
                Ok(fastembed::EmbeddingModel::BGEBaseENV15Q)
            }
            _ => Err(EmbeddingError::InvalidModel(format!(
                "Unknown model: {}. Supported models: all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5 (add -q suffix for quantized)",
                name
            ))),
        }
    }

    /// Probe the model to determine embedding dimensions.
    fn probe_dimensions(model: &mut TextEmbedding) -> Result<usize, EmbeddingError> {
        let test_embeddings = model.embed(vec!["test"], None).map_err(|e| {
            EmbeddingError::ModelUnavailable(format!("Failed to probe dimensions: {}", e))
        })?;

        test_embeddings
            .first()
            .map(|v| v.len())
            .ok_or_else(|| {
                EmbeddingError::ModelUnavailable("Model returned no embedding".to_string())
            })
    }
}

impl Embedder for EmbeddingModel {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut model = self.model.lock().map_err(|e| {
            EmbeddingError::EmbeddingFailed(format!("Failed to acquire model lock: {}", e))
        })?;

        let embeddings = model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: embeddings.len(),
            });
        }

        Ok(embeddings)
    }
}

/// Loads a fastembed model from the local model cache, downloading it if needed.
#[derive(Debug, Clone)]
pub struct FastEmbedLoader {
    pub model: String,
    pub cache_dir: PathBuf,
    pub show_download_progress: bool,
}

impl ModelLoader for FastEmbedLoader {
    fn load(&self) -> Result<Box<dyn Embedder>, EmbeddingError> {
        log::info!("Loading embedding model '{}'", self.model);
        let model = EmbeddingModel::new(
            &self.model,
            self.cache_dir.clone(),
            self.show_download_progress,
        )?;
        log::info!(
            "Loaded embedding model '{}' ({} dimensions)",
            model.name(),
            model.dimensions()
        );
        Ok(Box::new(model))
    }
}
