//! TOML configuration for non-secret settings.
//!
//! Credentials never live here: they are entered per session and carried in
//! [`SessionConfig`](crate::session::SessionConfig). This file only controls
//! the server address, chunking, retrieval, batch size and provider endpoints.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::session::ProviderKind;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub pinecone: PineconeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexingConfig {
    /// Chunks embedded and upserted per request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

fn default_batch_size() -> usize {
    32
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvidersConfig {
    /// Variant preselected in the form and used by the CLI when no
    /// `--provider` is given.
    #[serde(default = "default_provider")]
    pub default: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            default: default_provider(),
            temperature: default_temperature(),
            openai_base_url: default_openai_base_url(),
            gemini_base_url: default_gemini_base_url(),
        }
    }
}

impl ProvidersConfig {
    pub fn default_kind(&self) -> ProviderKind {
        // Validated in load_config.
        self.default.parse().unwrap_or(ProviderKind::OpenAi)
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_temperature() -> f32 {
    0.6
}
fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PineconeConfig {
    /// Override for the environment-scoped controller, e.g. a local mock.
    /// `{env}` is replaced with the session's environment.
    #[serde(default)]
    pub controller_url: Option<String>,
    /// Override for the data-plane host of every index. `{index}`,
    /// `{project}` and `{env}` are substituted.
    #[serde(default)]
    pub index_url: Option<String>,
    /// Seconds to wait for a freshly created index to report ready.
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_secs: u64,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            controller_url: None,
            index_url: None,
            ready_timeout_secs: default_ready_timeout(),
        }
    }
}

fn default_ready_timeout() -> u64 {
    120
}

impl PineconeConfig {
    pub fn controller_url(&self, environment: &str) -> String {
        self.controller_url
            .as_deref()
            .unwrap_or("https://controller.{env}.pinecone.io")
            .replace("{env}", environment)
    }

    pub fn index_url(&self, index: &str, project: &str, environment: &str) -> String {
        self.index_url
            .as_deref()
            .unwrap_or("https://{index}-{project}.svc.{env}.pinecone.io")
            .replace("{index}", index)
            .replace("{project}", project)
            .replace("{env}", environment)
    }
}

/// Load and validate the config file. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        let config = Config::default();
        validate(&config)?;
        return Ok(config);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.chunk_overlap must be smaller than chunking.chunk_size");
    }
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.indexing.batch_size < 1 {
        anyhow::bail!("indexing.batch_size must be >= 1");
    }
    if !(0.0..=2.0).contains(&config.providers.temperature) {
        anyhow::bail!("providers.temperature must be in [0.0, 2.0]");
    }
    config
        .providers
        .default
        .parse::<ProviderKind>()
        .map_err(|e| anyhow::anyhow!("providers.default: {}", e))?;
    Ok(())
}
