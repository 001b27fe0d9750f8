//! PDF text extraction through a scoped temporary file.
//!
//! The uploaded bytes are written to a [`tempfile::NamedTempFile`] that is
//! removed when it goes out of scope, so the copy disappears on success, on
//! error and while unwinding from a panic inside the PDF parser.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::UploadedDocument;

/// Leading bytes of every PDF file.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Why a single document could not be turned into text. The pipeline
/// skips the document and keeps going.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("not a PDF file")]
    NotPdf,
    #[error("temporary file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("no extractable text")]
    NoText,
}

/// Turns one uploaded document into ordered per-page text.
pub trait TextExtractor: Send + Sync {
    fn extract_pages(&self, doc: &UploadedDocument) -> Result<Vec<String>, ExtractError>;
}

/// [`TextExtractor`] backed by `pdf-extract`, staging uploads in a
/// temporary directory.
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    temp_dir: PathBuf,
}

impl PdfExtractor {
    pub fn new() -> Self {
        Self::in_dir(std::env::temp_dir())
    }

    pub fn in_dir(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
        }
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for PdfExtractor {
    fn extract_pages(&self, doc: &UploadedDocument) -> Result<Vec<String>, ExtractError> {
        extract_pdf_pages(&doc.bytes, &self.temp_dir)
    }
}

/// Extract per-page text from PDF bytes, staging them in `temp_dir`.
pub fn extract_pdf_pages(bytes: &[u8], temp_dir: &Path) -> Result<Vec<String>, ExtractError> {
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(ExtractError::NotPdf);
    }

    let mut staged = tempfile::Builder::new()
        .prefix("pdfq-")
        .suffix(".pdf")
        .tempfile_in(temp_dir)?;
    staged.write_all(bytes)?;
    staged.flush()?;

    let path = staged.path();
    // pdf-extract panics on some malformed inputs; treat that as a failed document.
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_by_pages(path))
        .map_err(|panic| ExtractError::Pdf(panic_message(panic)))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    if pages.iter().all(|p| p.trim().is_empty()) {
        return Err(ExtractError::NoText);
    }
    Ok(pages)
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "parser panicked".to_string())
}
