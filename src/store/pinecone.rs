//! Pinecone REST client (environment-scoped controller API).
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | list indexes | `GET {controller}/databases` |
//! | create index | `POST {controller}/databases` |
//! | index status | `GET {controller}/databases/{name}` |
//! | project name | `GET {controller}/actions/whoami` |
//! | upsert | `POST {index_host}/vectors/upsert` |
//! | query | `POST {index_host}/query` |
//!
//! `{controller}` is `https://controller.{env}.pinecone.io` and
//! `{index_host}` is `https://{index}-{project}.svc.{env}.pinecone.io`
//! unless overridden in `[pinecone]`.

use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

use crate::config::PineconeConfig;
use crate::http::{client, send_json};
use crate::models::{QueryMatch, VectorRecord};

use super::VectorStore;

const SERVICE: &str = "Pinecone";
const READY_POLL: Duration = Duration::from_secs(2);

pub struct PineconeStore {
    api_key: String,
    environment: String,
    config: PineconeConfig,
    client: reqwest::Client,
    project: OnceCell<String>,
}

impl PineconeStore {
    pub fn new(api_key: &str, environment: &str, config: &PineconeConfig) -> Self {
        Self {
            api_key: api_key.to_string(),
            environment: environment.to_string(),
            config: config.clone(),
            client: client(),
            project: OnceCell::new(),
        }
    }

    fn controller(&self) -> String {
        self.config.controller_url(&self.environment)
    }

    fn get(&self, url: String) -> reqwest::RequestBuilder {
        self.client.get(url).header("Api-Key", &self.api_key)
    }

    fn post(&self, url: String) -> reqwest::RequestBuilder {
        self.client.post(url).header("Api-Key", &self.api_key)
    }

    async fn list_indexes(&self) -> Result<Vec<String>> {
        let json = send_json(SERVICE, self.get(format!("{}/databases", self.controller()))).await?;
        parse_index_list(&json)
    }

    async fn project_name(&self) -> Result<&str> {
        let project = self
            .project
            .get_or_try_init(|| async {
                let json = send_json(
                    SERVICE,
                    self.get(format!("{}/actions/whoami", self.controller())),
                )
                .await?;
                json.get("project_name")
                    .and_then(|p| p.as_str())
                    .map(|p| p.to_string())
                    .ok_or_else(|| anyhow::anyhow!("Pinecone whoami response missing project_name"))
            })
            .await?;
        Ok(project.as_str())
    }

    async fn index_host(&self, index: &str) -> Result<String> {
        let project = self.project_name().await?;
        Ok(self.config.index_url(index, project, &self.environment))
    }

    async fn is_ready(&self, index: &str) -> Result<bool> {
        let json = send_json(
            SERVICE,
            self.get(format!("{}/databases/{}", self.controller(), index)),
        )
        .await?;
        Ok(json
            .get("status")
            .and_then(|s| s.get("ready"))
            .and_then(|r| r.as_bool())
            .unwrap_or(false))
    }

    async fn wait_until_ready(&self, index: &str) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(self.config.ready_timeout_secs);
        loop {
            if self.is_ready(index).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                bail!(
                    "index '{}' was created but is not ready after {}s",
                    index,
                    self.config.ready_timeout_secs
                );
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        Ok(self.list_indexes().await?.iter().any(|n| n == index))
    }

    async fn create_index(&self, index: &str, dims: usize) -> Result<()> {
        let body = json!({
            "name": index,
            "dimension": dims,
            "metric": "cosine",
        });
        send_json(
            SERVICE,
            self.post(format!("{}/databases", self.controller()))
                .json(&body),
        )
        .await?;
        self.wait_until_ready(index).await
    }

    async fn upsert(&self, index: &str, records: &[VectorRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let host = self.index_host(index).await?;
        let json = send_json(
            SERVICE,
            self.post(format!("{}/vectors/upsert", host))
                .json(&json!({ "vectors": records })),
        )
        .await?;
        Ok(json
            .get("upsertedCount")
            .and_then(|c| c.as_u64())
            .map(|c| c as usize)
            .unwrap_or(records.len()))
    }

    async fn query(&self, index: &str, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
        let host = self.index_host(index).await?;
        let body = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "includeValues": false,
        });
        let json = send_json(SERVICE, self.post(format!("{}/query", host)).json(&body)).await?;
        parse_query_response(&json)
    }
}

/// The controller answers `GET /databases` with a bare array of names.
fn parse_index_list(json: &Value) -> Result<Vec<String>> {
    let arr = json
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("Invalid Pinecone response: index list is not an array"))?;
    Ok(arr
        .iter()
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect())
}

fn parse_query_response(json: &Value) -> Result<Vec<QueryMatch>> {
    let matches = json
        .get("matches")
        .and_then(|m| m.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Pinecone response: missing matches"))?;

    Ok(matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let metadata = m.get("metadata");
            let field = |key: &str| {
                metadata
                    .and_then(|md| md.get(key))
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
            };
            QueryMatch {
                rank: i + 1,
                score: m.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0) as f32,
                source: field("source").unwrap_or_else(|| "N/A".to_string()),
                page: metadata.and_then(|md| md.get("page")).and_then(page_number),
                text: field("text").unwrap_or_default(),
            }
        })
        .collect())
}

/// Pinecone keeps numeric metadata as floats, so a stored `2` reads back as
/// `2.0`. Only whole, non-negative values are pages.
fn page_number(value: &Value) -> Option<u32> {
    let n = value.as_f64()?;
    if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 {
        Some(n as u32)
    } else {
        None
    }
}
