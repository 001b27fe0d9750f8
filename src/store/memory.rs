//! In-memory [`VectorStore`] for tests and offline runs.
//!
//! Uses a `HashMap` of indexes behind `std::sync::RwLock`. Search is
//! brute-force cosine similarity over every record in the index. Like the
//! hosted service, upserting a vector whose dimension differs from the
//! index's is rejected, and ids are overwritten on re-upsert.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{QueryMatch, VectorRecord};

use super::VectorStore;

struct MemoryIndex {
    dims: usize,
    records: Vec<VectorRecord>,
}

/// In-memory store keyed by index name.
#[derive(Default)]
pub struct InMemoryStore {
    indexes: RwLock<HashMap<String, MemoryIndex>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held by `index` (0 when absent).
    pub fn record_count(&self, index: &str) -> usize {
        self.indexes
            .read()
            .map(|ix| ix.get(index).map(|i| i.records.len()).unwrap_or(0))
            .unwrap_or(0)
    }

    /// Texts held by `index`, in insertion order.
    pub fn texts(&self, index: &str) -> Vec<String> {
        self.indexes
            .read()
            .map(|ix| {
                ix.get(index)
                    .map(|i| i.records.iter().map(|r| r.metadata.text.clone()).collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow::anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        Ok(self.indexes.read().map_err(poisoned)?.contains_key(index))
    }

    async fn create_index(&self, index: &str, dims: usize) -> Result<()> {
        let mut indexes = self.indexes.write().map_err(poisoned)?;
        if indexes.contains_key(index) {
            bail!("index '{}' already exists", index);
        }
        indexes.insert(
            index.to_string(),
            MemoryIndex {
                dims,
                records: Vec::new(),
            },
        );
        Ok(())
    }

    async fn upsert(&self, index: &str, records: &[VectorRecord]) -> Result<usize> {
        let mut indexes = self.indexes.write().map_err(poisoned)?;
        let target = indexes
            .get_mut(index)
            .ok_or_else(|| anyhow::anyhow!("index '{}' not found", index))?;
        for record in records {
            if record.values.len() != target.dims {
                bail!(
                    "vector dimension {} does not match index dimension {}",
                    record.values.len(),
                    target.dims
                );
            }
        }
        for record in records {
            target.records.retain(|r| r.id != record.id);
            target.records.push(record.clone());
        }
        Ok(records.len())
    }

    async fn query(&self, index: &str, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
        let indexes = self.indexes.read().map_err(poisoned)?;
        let target = indexes
            .get(index)
            .ok_or_else(|| anyhow::anyhow!("index '{}' not found", index))?;
        if vector.len() != target.dims {
            bail!(
                "query dimension {} does not match index dimension {}",
                vector.len(),
                target.dims
            );
        }

        let mut scored: Vec<(f32, &VectorRecord)> = target
            .records
            .iter()
            .map(|r| (cosine_similarity(vector, &r.values), r))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(i, (score, r))| QueryMatch {
                rank: i + 1,
                score,
                source: r.metadata.source.clone(),
                page: r.metadata.page,
                text: r.metadata.text.clone(),
            })
            .collect())
    }
}
