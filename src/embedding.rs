//! Embedding provider abstraction and the hosted implementations.
//!
//! Defines the [`Embedder`] trait and one implementation per provider
//! variant:
//! - **[`OpenAiEmbedder`]**: `POST /v1/embeddings` with `text-embedding-ada-002`.
//! - **[`GeminiEmbedder`]**: `batchEmbedContents` / `embedContent` with
//!   `models/embedding-001`, using the document and query task types.
//!
//! The model identifier is fixed per variant (see
//! [`ProviderKind`](crate::session::ProviderKind)). Calls are never retried.
//!
//! Also provides [`cosine_similarity`], used by the in-memory store.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::PipelineResult;
use crate::http::{client, parse_vector, send_json};
use crate::session::{ProviderKind, SessionConfig};

/// Trait for embedding providers.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-ada-002"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;

    /// Embed a batch of chunk texts, one vector per input in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single question.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_documents(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
    }
}

/// Create the embedder for the session's provider variant.
///
/// Fails with a configuration error, without touching the network, when the
/// provider key is missing.
pub fn create_embedder(session: &SessionConfig, base_url: &str) -> PipelineResult<Box<dyn Embedder>> {
    session.require_provider_key()?;
    let key = session.provider_api_key.clone();
    Ok(match session.provider {
        ProviderKind::OpenAi => Box::new(OpenAiEmbedder::new(key, base_url)),
        ProviderKind::Gemini => Box::new(GeminiEmbedder::new(key, base_url)),
    })
}

// ============ OpenAI ============

pub struct OpenAiEmbedder {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: client(),
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        ProviderKind::OpenAi.embedding_model()
    }

    fn dims(&self) -> usize {
        ProviderKind::OpenAi.embedding_dims()
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({
            "model": self.model_name(),
            "input": texts,
        });
        let request = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body);
        let json = send_json("OpenAI", request).await?;
        parse_openai_response(&json, texts.len())
    }
}

/// Extract `data[].embedding`, ordered by each item's `index`.
fn parse_openai_response(json: &Value, expected: usize) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        let embedding = item
            .get("embedding")
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing embedding"))?;
        indexed.push((index, parse_vector(embedding, "OpenAI embedding")?));
    }
    indexed.sort_by_key(|(i, _)| *i);

    if indexed.len() != expected {
        anyhow::bail!(
            "OpenAI returned {} embeddings for {} inputs",
            indexed.len(),
            expected
        );
    }
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Gemini ============

pub struct GeminiEmbedder {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiEmbedder {
    pub fn new(api_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: client(),
        }
    }

    fn request(&self, model: &str, task_type: &str, text: &str) -> Value {
        json!({
            "model": model,
            "content": { "parts": [{ "text": text }] },
            "taskType": task_type,
        })
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn model_name(&self) -> &str {
        ProviderKind::Gemini.embedding_model()
    }

    fn dims(&self) -> usize {
        ProviderKind::Gemini.embedding_dims()
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.model_name();
        let requests: Vec<Value> = texts
            .iter()
            .map(|t| self.request(model, "RETRIEVAL_DOCUMENT", t))
            .collect();
        let request = self
            .client
            .post(format!("{}/v1beta/{}:batchEmbedContents", self.base_url, model))
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({ "requests": requests }));
        let json = send_json("Gemini", request).await?;
        parse_gemini_batch(&json, texts.len())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let model = self.model_name();
        let request = self
            .client
            .post(format!("{}/v1beta/{}:embedContent", self.base_url, model))
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request(model, "RETRIEVAL_QUERY", text));
        let json = send_json("Gemini", request).await?;
        let values = json
            .get("embedding")
            .and_then(|e| e.get("values"))
            .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing embedding"))?;
        parse_vector(values, "Gemini embedding")
    }
}

fn parse_gemini_batch(json: &Value, expected: usize) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing embeddings array"))?;
    let vectors = embeddings
        .iter()
        .map(|e| {
            let values = e
                .get("values")
                .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing values"))?;
            parse_vector(values, "Gemini embedding")
        })
        .collect::<Result<Vec<_>>>()?;
    if vectors.len() != expected {
        anyhow::bail!(
            "Gemini returned {} embeddings for {} inputs",
            vectors.len(),
            expected
        );
    }
    Ok(vectors)
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors or vectors
/// of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
