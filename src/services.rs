//! Construction of the external services for one session.
//!
//! The server and CLI never build clients directly; they ask a
//! [`ServiceFactory`] for an embedder, completer, vector store and text
//! extractor bound to the session's credentials. [`HostedServices`] is the
//! production factory. Tests substitute their own to run the whole pipeline
//! offline.

use std::sync::Arc;

use crate::completion::{create_completer, Completer};
use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::error::PipelineResult;
use crate::extract::{PdfExtractor, TextExtractor};
use crate::session::{ProviderKind, SessionConfig};
use crate::store::pinecone::PineconeStore;
use crate::store::VectorStore;

pub trait ServiceFactory: Send + Sync {
    fn embedder(&self, session: &SessionConfig) -> PipelineResult<Box<dyn Embedder>>;

    fn completer(&self, session: &SessionConfig) -> PipelineResult<Box<dyn Completer>>;

    fn store(&self, session: &SessionConfig) -> PipelineResult<Box<dyn VectorStore>>;

    fn extractor(&self) -> Arc<dyn TextExtractor>;
}

/// Hosted providers and Pinecone, configured from `[providers]` and
/// `[pinecone]`.
pub struct HostedServices {
    config: Arc<Config>,
    extractor: Arc<dyn TextExtractor>,
}

impl HostedServices {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            extractor: Arc::new(PdfExtractor::new()),
        }
    }

    fn base_url(&self, session: &SessionConfig) -> &str {
        match session.provider {
            ProviderKind::OpenAi => &self.config.providers.openai_base_url,
            ProviderKind::Gemini => &self.config.providers.gemini_base_url,
        }
    }
}

impl ServiceFactory for HostedServices {
    fn embedder(&self, session: &SessionConfig) -> PipelineResult<Box<dyn Embedder>> {
        create_embedder(session, self.base_url(session))
    }

    fn completer(&self, session: &SessionConfig) -> PipelineResult<Box<dyn Completer>> {
        create_completer(
            session,
            self.base_url(session),
            self.config.providers.temperature,
        )
    }

    fn store(&self, session: &SessionConfig) -> PipelineResult<Box<dyn VectorStore>> {
        session.require_vector_db()?;
        Ok(Box::new(PineconeStore::new(
            &session.pinecone_api_key,
            &session.pinecone_environment,
            &self.config.pinecone,
        )))
    }

    fn extractor(&self) -> Arc<dyn TextExtractor> {
        self.extractor.clone()
    }
}
