//! Core data models used throughout pdf-query.
//!
//! These types represent the uploads, chunks, vector records and query
//! results that flow through the ingestion and retrieval pipeline.

use serde::{Deserialize, Serialize};

/// One uploaded PDF file, as received from the form or read from disk.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// Plain text of one document, one entry per page in page order.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub filename: String,
    pub pages: Vec<String>,
}

/// A contiguous slice of a document's text, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Source filename copied from the owning document.
    pub source: String,
    /// Position of this chunk within its document, starting at 0.
    pub chunk_index: usize,
    /// 1-based page on which the chunk starts, when known.
    pub page: Option<u32>,
    pub text: String,
}

/// Metadata stored alongside every vector in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub source: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// A vector plus its chunk text and metadata, ready to upsert.
#[derive(Debug, Clone, Serialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: RecordMetadata,
}

/// One entry of a similarity search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMatch {
    /// 1-based rank in the order the database returned the match.
    pub rank: usize,
    pub score: f32,
    pub source: String,
    pub page: Option<u32>,
    pub text: String,
}

impl QueryMatch {
    /// File name of the source without any leading directories.
    pub fn source_name(&self) -> &str {
        std::path::Path::new(&self.source)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.source)
    }
}

/// A synthesized answer and the matches that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub matches: Vec<QueryMatch>,
}
