//! Embedding provider: the trait seam and the TEI HTTP client
//!
//! The whole corpus must be embedded by one model; the router records the
//! indexed dimensionality and rejects mismatched query embeddings.

use crate::{EngineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TEI_URL: &str = "http://localhost:8081";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_BATCH: usize = 32;

fn env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Anything that turns text into a vector in the indexed embedding space.
///
/// Implementations must be deterministic per input for reproducible builds;
/// the HTTP client delegates that property to the model server.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, preserving order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Client for a TEI-style embeddings service
#[derive(Clone)]
pub struct TeiClient {
    client: Client,
    base_url: String,
    max_batch: usize,
}

impl TeiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            max_batch: DEFAULT_MAX_BATCH,
        }
    }

    /// Client configured from `TEI_URL`, falling back to localhost
    pub fn from_env() -> Self {
        Self::new(env_or_default("TEI_URL", DEFAULT_TEI_URL))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Health check
    pub async fn health(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }

    async fn request_embeddings(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embed", self.base_url);
        let request = EmbedRequest { inputs: texts };

        debug!("Requesting embeddings for {} texts", request.inputs.len());

        let embeddings: Vec<Vec<f32>> = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!("Received {} embeddings", embeddings.len());
        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for TeiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.request_embeddings(vec![text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::EmbeddingService("no embedding returned".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.max_batch) {
            let embeddings = self.request_embeddings(batch.to_vec()).await?;
            if embeddings.len() != batch.len() {
                return Err(EngineError::EmbeddingService(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }
            out.extend(embeddings);
        }
        Ok(out)
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    inputs: Vec<String>,
}
