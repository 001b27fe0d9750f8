//! Vector-database abstraction.
//!
//! The [`VectorStore`] trait covers the four operations the pipeline needs
//! from the external index: existence check, creation, upsert and
//! similarity search. [`pinecone::PineconeStore`] talks to the hosted
//! service; [`memory::InMemoryStore`] is a brute-force cosine store for tests
//! and offline runs.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;
pub mod pinecone;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{QueryMatch, VectorRecord};

/// Abstract vector index backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`index_exists`](VectorStore::index_exists) | Does the named index exist? |
/// | [`create_index`](VectorStore::create_index) | Create a cosine index of the given dimension |
/// | [`upsert`](VectorStore::upsert) | Insert or overwrite records by id |
/// | [`query`](VectorStore::query) | Top-k nearest records with metadata |
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool>;

    async fn create_index(&self, index: &str, dims: usize) -> Result<()>;

    /// Returns the number of records the backend reports as upserted.
    async fn upsert(&self, index: &str, records: &[VectorRecord]) -> Result<usize>;

    /// Nearest neighbours in the order the backend ranks them.
    async fn query(&self, index: &str, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>>;
}

/// Create `index` unless it already exists.
///
/// Returns `true` when the index was created by this call.
pub async fn ensure_index(store: &dyn VectorStore, index: &str, dims: usize) -> Result<bool> {
    if store.index_exists(index).await? {
        return Ok(false);
    }
    store.create_index(index, dims).await?;
    tracing::info!(index, dims, "created vector index");
    Ok(true)
}
