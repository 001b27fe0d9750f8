//! Indexing stage: embed chunks and upsert them into the vector index.
//!
//! Chunks are processed in batches of `[indexing].batch_size`. Every record
//! gets a fresh UUID, so ingesting the same document twice stores it twice.
//! A failure part-way through leaves earlier batches in the index and is
//! reported with the number of records already upserted.

use uuid::Uuid;

use crate::config::IndexingConfig;
use crate::embedding::Embedder;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Chunk, RecordMetadata, VectorRecord};
use crate::session::SessionConfig;
use crate::store::{ensure_index, VectorStore};

/// Outcome of a successful [`index_chunks`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSummary {
    pub index_name: String,
    /// Whether the index was created by this call.
    pub created_index: bool,
    pub upserted: usize,
}

/// Embed `chunks` and store them in the session's index, creating the index
/// with the embedder's dimension if it does not exist.
pub async fn index_chunks(
    session: &SessionConfig,
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    chunks: Vec<Chunk>,
    config: &IndexingConfig,
) -> PipelineResult<IndexSummary> {
    session.require_provider_key()?;
    session.require_index_name()?;
    if chunks.is_empty() {
        return Err(PipelineError::NothingToIndex);
    }

    let index = session.index_name.as_str();
    let created_index = ensure_index(store, index, embedder.dims())
        .await
        .map_err(|e| PipelineError::Indexing {
            upserted: 0,
            message: format!("{:#}", e),
        })?;

    let batch_size = config.batch_size.max(1);
    let total = chunks.len();
    let mut upserted = 0usize;

    for batch in chunks.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder
            .embed_documents(&texts)
            .await
            .map_err(|e| PipelineError::Indexing {
                upserted,
                message: format!("{:#}", e),
            })?;
        if vectors.len() != batch.len() {
            return Err(PipelineError::Indexing {
                upserted,
                message: format!(
                    "embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                ),
            });
        }

        let records: Vec<VectorRecord> = batch
            .iter()
            .zip(vectors)
            .map(|(chunk, values)| VectorRecord {
                id: Uuid::new_v4().to_string(),
                values,
                metadata: RecordMetadata {
                    source: chunk.source.clone(),
                    text: chunk.text.clone(),
                    page: chunk.page,
                },
            })
            .collect();

        let reported = store
            .upsert(index, &records)
            .await
            .map_err(|e| PipelineError::Indexing {
                upserted,
                message: format!("{:#}", e),
            })?;
        if reported != records.len() {
            return Err(PipelineError::Indexing {
                upserted: upserted + reported,
                message: format!(
                    "vector store upserted {} of {} records",
                    reported,
                    records.len()
                ),
            });
        }
        upserted += reported;
        tracing::debug!(index, upserted, total, "batch upserted");
    }

    tracing::info!(
        index,
        upserted,
        model = embedder.model_name(),
        created_index,
        "chunks indexed"
    );

    Ok(IndexSummary {
        index_name: index.to_string(),
        created_index,
        upserted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ProviderKind;
    use crate::store::memory::InMemoryStore;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Two-dimensional embedder; fails on the call numbered `fail_on`.
    struct CountingEmbedder {
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    impl CountingEmbedder {
        fn new(fail_on: Option<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on,
            }
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn model_name(&self) -> &str {
            "counting"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(call) == self.fail_on {
                anyhow::bail!("rate limited");
            }
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    /// Accepts every upsert but reports one record fewer than it was sent.
    struct ShortCountStore(InMemoryStore);

    #[async_trait]
    impl VectorStore for ShortCountStore {
        async fn index_exists(&self, index: &str) -> Result<bool> {
            self.0.index_exists(index).await
        }
        async fn create_index(&self, index: &str, dims: usize) -> Result<()> {
            self.0.create_index(index, dims).await
        }
        async fn upsert(&self, index: &str, records: &[VectorRecord]) -> Result<usize> {
            Ok(self.0.upsert(index, records).await?.saturating_sub(1))
        }
        async fn query(
            &self,
            index: &str,
            vector: &[f32],
            top_k: usize,
        ) -> Result<Vec<crate::models::QueryMatch>> {
            self.0.query(index, vector, top_k).await
        }
    }

    fn session() -> SessionConfig {
        SessionConfig::new(ProviderKind::OpenAi, "sk", "pc", "env", "docs")
    }

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n)
            .map(|i| Chunk {
                source: "a.pdf".to_string(),
                chunk_index: i,
                page: Some(1),
                text: format!("chunk {}", i),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_creates_index_and_upserts_all() {
        let store = InMemoryStore::new();
        let embedder = CountingEmbedder::new(None);
        let config = IndexingConfig { batch_size: 2 };
        let summary = index_chunks(&session(), &embedder, &store, chunks(5), &config)
            .await
            .unwrap();
        assert!(summary.created_index);
        assert_eq!(summary.upserted, 5);
        assert_eq!(store.record_count("docs"), 5);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_chunks_is_nothing_to_index() {
        let store = InMemoryStore::new();
        let embedder = CountingEmbedder::new(None);
        let err = index_chunks(&session(), &embedder, &store, vec![], &IndexingConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NothingToIndex));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert!(!store.index_exists("docs").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_any_call() {
        let store = InMemoryStore::new();
        let embedder = CountingEmbedder::new(None);
        let mut s = session();
        s.provider_api_key.clear();
        let err = index_chunks(&s, &embedder, &store, chunks(1), &IndexingConfig::default())
            .await
            .unwrap_err();
        assert!(err.is_config());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_partial_failure_reports_upserted() {
        let store = InMemoryStore::new();
        let embedder = CountingEmbedder::new(Some(1));
        let config = IndexingConfig { batch_size: 2 };
        let err = index_chunks(&session(), &embedder, &store, chunks(5), &config)
            .await
            .unwrap_err();
        match err {
            PipelineError::Indexing { upserted, message } => {
                assert_eq!(upserted, 2);
                assert!(message.contains("rate limited"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.record_count("docs"), 2);
    }

    #[tokio::test]
    async fn test_reingest_duplicates_records() {
        let store = InMemoryStore::new();
        let embedder = CountingEmbedder::new(None);
        let config = IndexingConfig::default();
        index_chunks(&session(), &embedder, &store, chunks(3), &config)
            .await
            .unwrap();
        let second = index_chunks(&session(), &embedder, &store, chunks(3), &config)
            .await
            .unwrap();
        assert!(!second.created_index);
        assert_eq!(store.record_count("docs"), 6);
    }

    #[tokio::test]
    async fn test_short_upsert_count_is_an_indexing_error() {
        let store = ShortCountStore(InMemoryStore::new());
        let embedder = CountingEmbedder::new(None);
        let config = IndexingConfig { batch_size: 2 };
        let err = index_chunks(&session(), &embedder, &store, chunks(4), &config)
            .await
            .unwrap_err();
        match err {
            PipelineError::Indexing { upserted, message } => {
                assert_eq!(upserted, 1);
                assert!(message.contains("upserted 1 of 2"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }
}
