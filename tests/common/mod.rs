//! Offline doubles shared by the integration tests.

#![allow(dead_code)]

pub mod hosted;
pub mod pdf;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pdf_query::completion::Completer;
use pdf_query::embedding::Embedder;
use pdf_query::error::PipelineResult;
use pdf_query::extract::{ExtractError, TextExtractor};
use pdf_query::models::{QueryMatch, UploadedDocument, VectorRecord};
use pdf_query::services::ServiceFactory;
use pdf_query::session::{ProviderKind, SessionConfig};
use pdf_query::store::memory::InMemoryStore;
use pdf_query::store::VectorStore;

/// Words the keyword embedder counts. Filler text uses none of them.
pub const KEYWORDS: [&str; 3] = ["quasar", "zebra", "volcano"];

/// One dimension per keyword plus a small constant so no vector is zero.
pub struct KeywordEmbedder;

impl KeywordEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut v: Vec<f32> = KEYWORDS
            .iter()
            .map(|k| lower.matches(k).count() as f32)
            .collect();
        v.push(0.01);
        v
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword-test"
    }
    fn dims(&self) -> usize {
        KEYWORDS.len() + 1
    }
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

/// Answers by naming the first keyword present in the prompt's context.
pub struct EchoCompleter {
    pub prompts: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Completer for EchoCompleter {
    fn model_name(&self) -> &str {
        "echo-test"
    }
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let context = prompt.split("Question:").next().unwrap_or_default();
        Ok(match KEYWORDS.iter().find(|k| context.contains(*k)) {
            Some(k) => format!("The document mentions the {}.", k),
            None => "I don't know.".to_string(),
        })
    }
}

/// Returns canned pages by filename; unknown files fail as corrupt.
#[derive(Default)]
pub struct PagesExtractor {
    pub pages: HashMap<String, Vec<String>>,
}

impl PagesExtractor {
    pub fn with(mut self, filename: &str, pages: Vec<String>) -> Self {
        self.pages.insert(filename.to_string(), pages);
        self
    }
}

impl TextExtractor for PagesExtractor {
    fn extract_pages(&self, doc: &UploadedDocument) -> Result<Vec<String>, ExtractError> {
        self.pages
            .get(&doc.filename)
            .cloned()
            .ok_or_else(|| ExtractError::Pdf("invalid cross-reference table".to_string()))
    }
}

/// Hands out the same in-memory store for every session.
pub struct SharedStore(pub Arc<InMemoryStore>);

#[async_trait]
impl VectorStore for SharedStore {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        self.0.index_exists(index).await
    }
    async fn create_index(&self, index: &str, dims: usize) -> Result<()> {
        self.0.create_index(index, dims).await
    }
    async fn upsert(&self, index: &str, records: &[VectorRecord]) -> Result<usize> {
        self.0.upsert(index, records).await
    }
    async fn query(&self, index: &str, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
        self.0.query(index, vector, top_k).await
    }
}

/// Fails the test if any method is called.
pub struct PanicStore;

#[async_trait]
impl VectorStore for PanicStore {
    async fn index_exists(&self, _: &str) -> Result<bool> {
        panic!("vector store must not be called")
    }
    async fn create_index(&self, _: &str, _: usize) -> Result<()> {
        panic!("vector store must not be called")
    }
    async fn upsert(&self, _: &str, _: &[VectorRecord]) -> Result<usize> {
        panic!("vector store must not be called")
    }
    async fn query(&self, _: &str, _: &[f32], _: usize) -> Result<Vec<QueryMatch>> {
        panic!("vector store must not be called")
    }
}

/// Fails the test if any embedding is requested.
pub struct PanicEmbedder;

#[async_trait]
impl Embedder for PanicEmbedder {
    fn model_name(&self) -> &str {
        "panic"
    }
    fn dims(&self) -> usize {
        4
    }
    async fn embed_documents(&self, _: &[String]) -> Result<Vec<Vec<f32>>> {
        panic!("embedder must not be called")
    }
}

/// Offline [`ServiceFactory`] over an in-memory store.
pub struct TestServices {
    pub store: Arc<InMemoryStore>,
    pub extractor: Arc<PagesExtractor>,
    pub prompts: Arc<Mutex<Vec<String>>>,
    /// When set, asking for an embedder panics.
    pub forbid_embedding: bool,
}

impl TestServices {
    pub fn new(extractor: PagesExtractor) -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
            extractor: Arc::new(extractor),
            prompts: Arc::new(Mutex::new(Vec::new())),
            forbid_embedding: false,
        }
    }
}

impl ServiceFactory for TestServices {
    fn embedder(&self, session: &SessionConfig) -> PipelineResult<Box<dyn Embedder>> {
        session.require_provider_key()?;
        if self.forbid_embedding {
            panic!("embedder must not be created");
        }
        Ok(Box::new(KeywordEmbedder))
    }

    fn completer(&self, session: &SessionConfig) -> PipelineResult<Box<dyn Completer>> {
        session.require_provider_key()?;
        Ok(Box::new(EchoCompleter {
            prompts: self.prompts.clone(),
        }))
    }

    fn store(&self, session: &SessionConfig) -> PipelineResult<Box<dyn VectorStore>> {
        session.require_vector_db()?;
        Ok(Box::new(SharedStore(self.store.clone())))
    }

    fn extractor(&self) -> Arc<dyn TextExtractor> {
        self.extractor.clone()
    }
}

/// Panics on every service request.
pub struct PanicServices;

impl ServiceFactory for PanicServices {
    fn embedder(&self, _: &SessionConfig) -> PipelineResult<Box<dyn Embedder>> {
        panic!("no service may be created")
    }
    fn completer(&self, _: &SessionConfig) -> PipelineResult<Box<dyn Completer>> {
        panic!("no service may be created")
    }
    fn store(&self, _: &SessionConfig) -> PipelineResult<Box<dyn VectorStore>> {
        panic!("no service may be created")
    }
    fn extractor(&self) -> Arc<dyn TextExtractor> {
        panic!("no service may be created")
    }
}

pub fn session(index: &str) -> SessionConfig {
    SessionConfig::new(ProviderKind::OpenAi, "sk-test", "pc-test", "test-env", index)
}

/// `len` characters of keyword-free filler, with `keyword` written at
/// `offset` when given.
pub fn filler(len: usize, keyword: Option<(usize, &str)>) -> String {
    let mut text = String::new();
    while text.len() < len {
        text.push_str("alpha beta gamma delta ");
    }
    text.truncate(len);
    if let Some((offset, word)) = keyword {
        let padded = format!(" {} ", word);
        text.replace_range(offset..offset + padded.len(), &padded);
    }
    text
}

/// Two pages, 1250 characters each, no paragraph breaks. "quasar" sits
/// 150 characters into page 2, which only the second chunk covers.
pub fn two_page_report() -> Vec<String> {
    vec![filler(1250, None), filler(1250, Some((150, "quasar")))]
}
