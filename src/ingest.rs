//! Ingestion pipeline: uploaded documents → extracted pages → chunks.
//!
//! Each document is processed independently. Its outcome is recorded in the
//! [`IngestReport`] as either a set of chunks or a failure reason; a failed
//! document never stops the others.

use crate::chunk::chunk_document;
use crate::config::ChunkingConfig;
use crate::extract::TextExtractor;
use crate::models::{Chunk, ExtractedDocument, UploadedDocument};

/// What happened to one uploaded document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOutcome {
    Chunked {
        filename: String,
        pages: usize,
        chunks: usize,
    },
    Failed {
        filename: String,
        reason: String,
    },
}

impl DocumentOutcome {
    pub fn filename(&self) -> &str {
        match self {
            DocumentOutcome::Chunked { filename, .. } | DocumentOutcome::Failed { filename, .. } => {
                filename
            }
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, DocumentOutcome::Failed { .. })
    }
}

/// Flat ordered chunks from every successful document, plus one outcome per
/// input document in input order.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub chunks: Vec<Chunk>,
    pub outcomes: Vec<DocumentOutcome>,
}

impl IngestReport {
    /// `true` when no document produced any chunk.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &DocumentOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }
}

/// Extract and chunk every document.
pub fn read_and_chunk(
    documents: &[UploadedDocument],
    extractor: &dyn TextExtractor,
    config: &ChunkingConfig,
) -> IngestReport {
    let mut report = IngestReport::default();

    for doc in documents {
        if !has_pdf_extension(&doc.filename) {
            tracing::warn!(file = %doc.filename, "not a PDF, skipped");
            report.outcomes.push(DocumentOutcome::Failed {
                filename: doc.filename.clone(),
                reason: "not a PDF file".to_string(),
            });
            continue;
        }
        let outcome = match extractor.extract_pages(doc) {
            Ok(pages) => {
                let extracted = ExtractedDocument {
                    filename: doc.filename.clone(),
                    pages,
                };
                let chunks = chunk_document(&extracted, config);
                if chunks.is_empty() {
                    DocumentOutcome::Failed {
                        filename: doc.filename.clone(),
                        reason: "no extractable text".to_string(),
                    }
                } else {
                    let outcome = DocumentOutcome::Chunked {
                        filename: doc.filename.clone(),
                        pages: extracted.pages.len(),
                        chunks: chunks.len(),
                    };
                    report.chunks.extend(chunks);
                    outcome
                }
            }
            Err(e) => DocumentOutcome::Failed {
                filename: doc.filename.clone(),
                reason: e.to_string(),
            },
        };

        match &outcome {
            DocumentOutcome::Chunked {
                filename,
                pages,
                chunks,
            } => tracing::info!(file = %filename, pages, chunks, "document chunked"),
            DocumentOutcome::Failed { filename, reason } => {
                tracing::warn!(file = %filename, %reason, "document skipped")
            }
        }
        report.outcomes.push(outcome);
    }

    report
}

fn has_pdf_extension(filename: &str) -> bool {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}
