//! Embedding capability consumed by the ranking engine.
//!
//! The engine only sees `TextEmbedder` (synchronous, one text at a time). Network
//! providers implement `BatchEmbedder`; `PrecomputedEmbeddings` bridges the two by
//! fetching every vector a request needs in one batch call up front.

pub mod remote;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use thiserror::Error;

pub use remote::{RemoteEmbedder, RemoteEmbedderError};

pub type Embedding = Vec<f64>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmbeddingError {
    #[error("Embedding provider error: {0}")]
    Provider(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("No embedding available for text {0:?}")]
    MissingVector(String),
}

/// Maps a string to a fixed-length vector. Must be reentrant: the engine may be
/// called from several threads sharing one embedder.
pub trait TextEmbedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;
}

/// Async, batched embedding backend used by the HTTP layer.
#[async_trait]
pub trait BatchEmbedder: Send + Sync {
    /// Returns one vector per input text, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError>;

    fn model_name(&self) -> &str;
}

/// Vectors fetched ahead of time, served synchronously to the engine.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedEmbeddings {
    vectors: HashMap<String, Embedding>,
}

impl PrecomputedEmbeddings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, text: impl Into<String>, vector: Embedding) {
        self.vectors.insert(text.into(), vector);
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Embeds every distinct text with a single batch call.
    pub async fn fetch<B>(backend: &B, texts: Vec<String>) -> Result<Self, EmbeddingError>
    where
        B: BatchEmbedder + ?Sized,
    {
        let mut seen = HashSet::new();
        let distinct: Vec<String> = texts
            .into_iter()
            .filter(|text| seen.insert(text.clone()))
            .collect();
        if distinct.is_empty() {
            return Ok(Self::new());
        }

        let vectors = backend.embed_batch(&distinct).await?;
        if vectors.len() != distinct.len() {
            return Err(EmbeddingError::Provider(format!(
                "{} returned {} vectors for {} texts",
                backend.model_name(),
                vectors.len(),
                distinct.len()
            )));
        }

        tracing::debug!(
            model = backend.model_name(),
            texts = distinct.len(),
            "Fetched embeddings"
        );

        Ok(distinct.into_iter().zip(vectors).collect())
    }
}

impl FromIterator<(String, Embedding)> for PrecomputedEmbeddings {
    fn from_iter<I: IntoIterator<Item = (String, Embedding)>>(iter: I) -> Self {
        Self {
            vectors: iter.into_iter().collect(),
        }
    }
}

impl TextEmbedder for PrecomputedEmbeddings {
    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| EmbeddingError::MissingVector(text.to_string()))
    }
}
