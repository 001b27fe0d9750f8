//! Per-interaction credentials and the vector-database session check.
//!
//! A [`SessionConfig`] is built from the sidebar form (or CLI flags) for each
//! user action and passed by reference into every stage. It is never written
//! to disk and its `Debug` output redacts every key.

use std::fmt;
use std::str::FromStr;

use crate::error::{PipelineError, PipelineResult};
use crate::store::VectorStore;

/// Hosted embedding/completion provider variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::OpenAi, ProviderKind::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }

    /// Human label used in the sidebar and in messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Gemini => "Google",
        }
    }

    pub fn embedding_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "text-embedding-ada-002",
            ProviderKind::Gemini => "models/embedding-001",
        }
    }

    pub fn embedding_dims(&self) -> usize {
        match self {
            ProviderKind::OpenAi => 1536,
            ProviderKind::Gemini => 768,
        }
    }

    pub fn completion_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-3.5-turbo-instruct",
            ProviderKind::Gemini => "gemini-pro",
        }
    }

    /// Environment variable the CLI falls back to for this provider's key.
    pub fn key_env_var(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Gemini => "GOOGLE_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            other => Err(format!(
                "unknown provider '{}'. Must be openai or gemini.",
                other
            )),
        }
    }
}

/// Credentials and target index for one user interaction.
#[derive(Clone)]
pub struct SessionConfig {
    pub provider: ProviderKind,
    pub provider_api_key: String,
    pub pinecone_api_key: String,
    pub pinecone_environment: String,
    pub index_name: String,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("provider", &self.provider)
            .field("provider_api_key", &redact(&self.provider_api_key))
            .field("pinecone_api_key", &redact(&self.pinecone_api_key))
            .field("pinecone_environment", &self.pinecone_environment)
            .field("index_name", &self.index_name)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

impl SessionConfig {
    /// Build a session, trimming surrounding whitespace from every field.
    pub fn new(
        provider: ProviderKind,
        provider_api_key: &str,
        pinecone_api_key: &str,
        pinecone_environment: &str,
        index_name: &str,
    ) -> Self {
        Self {
            provider,
            provider_api_key: provider_api_key.trim().to_string(),
            pinecone_api_key: pinecone_api_key.trim().to_string(),
            pinecone_environment: pinecone_environment.trim().to_string(),
            index_name: index_name.trim().to_string(),
        }
    }

    fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.provider_api_key.is_empty() {
            missing.push(format!("{} API Key", self.provider.display_name()));
        }
        if self.pinecone_api_key.is_empty() {
            missing.push("Pinecone API Key".to_string());
        }
        if self.pinecone_environment.is_empty() {
            missing.push("Pinecone Environment".to_string());
        }
        if self.index_name.is_empty() {
            missing.push("Pinecone Index Name".to_string());
        }
        missing
    }

    /// All four sidebar fields must be filled before ingestion.
    pub fn require_all(&self) -> PipelineResult<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::config(format!(
                "Please provide all API keys and Pinecone details in the sidebar before processing (missing: {}).",
                missing.join(", ")
            )))
        }
    }

    pub fn require_provider_key(&self) -> PipelineResult<()> {
        if self.provider_api_key.is_empty() {
            return Err(PipelineError::config(format!(
                "{} API Key is missing. Please provide it in the sidebar.",
                self.provider.display_name()
            )));
        }
        Ok(())
    }

    pub fn require_index_name(&self) -> PipelineResult<()> {
        if self.index_name.is_empty() {
            return Err(PipelineError::config(
                "Please provide the Pinecone Index Name in the sidebar.",
            ));
        }
        Ok(())
    }

    pub fn require_vector_db(&self) -> PipelineResult<()> {
        if self.pinecone_api_key.is_empty() || self.pinecone_environment.is_empty() {
            return Err(PipelineError::config(
                "Pinecone API Key or environment not set. Please configure them in the sidebar.",
            ));
        }
        self.require_index_name()
    }

    /// Provider key, vector-database key, environment and index name.
    pub fn require_query_credentials(&self) -> PipelineResult<()> {
        if self.provider_api_key.is_empty()
            || self.pinecone_api_key.is_empty()
            || self.pinecone_environment.is_empty()
        {
            return Err(PipelineError::config(
                "API keys or Pinecone environment not set. Please configure them in the sidebar.",
            ));
        }
        self.require_index_name()
    }
}

/// Advisory result of [`check_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    IndexFound(String),
    /// The index will be created by the indexing stage.
    IndexMissing(String),
}

impl SessionStatus {
    pub fn message(&self) -> String {
        match self {
            SessionStatus::IndexFound(name) => {
                format!("Pinecone initialized. Index '{}' found.", name)
            }
            SessionStatus::IndexMissing(name) => format!(
                "Index '{}' not found. It will be created upon vectorization.",
                name
            ),
        }
    }
}

/// Validate vector-database connectivity and report whether the index exists.
///
/// A missing index is not an error: ingestion creates it on demand.
pub async fn check_session(
    session: &SessionConfig,
    store: &dyn VectorStore,
) -> PipelineResult<SessionStatus> {
    session.require_vector_db()?;
    let exists = store
        .index_exists(&session.index_name)
        .await
        .map_err(|e| PipelineError::Connection(format!("{:#}", e)))?;
    tracing::info!(index = %session.index_name, exists, "vector database session checked");
    Ok(if exists {
        SessionStatus::IndexFound(session.index_name.clone())
    } else {
        SessionStatus::IndexMissing(session.index_name.clone())
    })
}
