//! Remote embedder — batch client for an OpenAI-compatible `/embeddings` endpoint.
//!
//! Retry policy for embedding calls lives here. The ranking engine never retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::EmbeddingConfig;
use crate::embedding::{BatchEmbedder, Embedding, EmbeddingError};

const EMBEDDINGS_PATH: &str = "/embeddings";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum RemoteEmbedderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },
}

impl From<RemoteEmbedderError> for EmbeddingError {
    fn from(err: RemoteEmbedderError) -> Self {
        EmbeddingError::Provider(err.to_string())
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct RemoteEmbedder {
    client: Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

impl RemoteEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, RemoteEmbedderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}{}", config.api_base.trim_end_matches('/'), EMBEDDINGS_PATH),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// Embeds `texts` in one request. Retries 429 and 5xx with exponential backoff.
    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Embedding>, RemoteEmbedderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let mut last_error: Option<RemoteEmbedderError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Embedding call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.post(&self.url).json(&body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(RemoteEmbedderError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Embedding API returned {}: {}", status, body);
                last_error = Some(RemoteEmbedderError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(RemoteEmbedderError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let text = response.text().await?;
            let vectors = parse_embedding_response(&text, texts.len())?;

            debug!(
                model = %self.model,
                texts = texts.len(),
                dimensions = vectors.first().map(Vec::len).unwrap_or(0),
                "Embedding call succeeded"
            );

            return Ok(vectors);
        }

        Err(last_error.unwrap_or(RemoteEmbedderError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl BatchEmbedder for RemoteEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        Ok(self.embed_texts(texts).await?)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Parses the `data` array, restoring input order from each item's `index`.
fn parse_embedding_response(
    body: &str,
    expected: usize,
) -> Result<Vec<Embedding>, RemoteEmbedderError> {
    let response: EmbeddingResponse = serde_json::from_str(body)?;

    let mut indexed: Vec<(usize, Embedding)> = response
        .data
        .into_iter()
        .enumerate()
        .map(|(position, datum)| (datum.index.unwrap_or(position), datum.embedding))
        .collect();
    indexed.sort_by_key(|(index, _)| *index);

    if indexed.len() != expected {
        return Err(RemoteEmbedderError::InvalidResponse(format!(
            "expected {expected} embeddings, got {}",
            indexed.len()
        )));
    }

    if let Some((position, (index, _))) = indexed
        .iter()
        .enumerate()
        .find(|(position, (index, _))| position != index)
    {
        return Err(RemoteEmbedderError::InvalidResponse(format!(
            "embedding indices must cover 0..{expected} once each; found {index} at position {position}"
        )));
    }

    let dimensions = indexed.first().map(|(_, v)| v.len()).unwrap_or(0);
    if let Some((index, vector)) = indexed.iter().find(|(_, v)| v.len() != dimensions) {
        return Err(RemoteEmbedderError::InvalidResponse(format!(
            "embedding {index} has {} dimensions, expected {dimensions}",
            vector.len()
        )));
    }

    Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}
