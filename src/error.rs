//! Stage-boundary error taxonomy.
//!
//! Every external-call failure is converted into one of these variants at the
//! stage that made the call. None of them is fatal to the session: the
//! presentation layer renders the message and the user may retry.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing credential, index name or unusable setting. Raised before any
    /// network call.
    #[error("configuration error: {0}")]
    Config(String),

    /// Ingestion produced zero chunks, so there is nothing to embed.
    #[error("no chunks to index: every document failed extraction")]
    NothingToIndex,

    /// The vector database could not be reached or rejected the credentials.
    #[error("vector database connection failed: {0}")]
    Connection(String),

    /// Embedding or upsert failed. Records upserted before the failure stay
    /// in the index.
    #[error("indexing failed after {upserted} records were upserted: {message}")]
    Indexing { upserted: usize, message: String },

    #[error("query failed: {0}")]
    Query(String),

    #[error("completion failed: {0}")]
    Completion(String),
}

impl PipelineError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
