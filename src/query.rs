//! Retrieval stage: embed a question and fetch the nearest chunks.

use crate::embedding::Embedder;
use crate::error::{PipelineError, PipelineResult};
use crate::models::QueryMatch;
use crate::session::SessionConfig;
use crate::store::VectorStore;

/// Return up to `top_k` matches for `question`, ranked by the index.
///
/// Credentials and the question are validated before any network call.
/// The index must already exist; retrieval never creates it.
pub async fn retrieve(
    session: &SessionConfig,
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    question: &str,
    top_k: usize,
) -> PipelineResult<Vec<QueryMatch>> {
    session.require_query_credentials()?;
    let question = question.trim();
    if question.is_empty() {
        return Err(PipelineError::config("Please enter a question."));
    }
    if top_k == 0 {
        return Err(PipelineError::config("top_k must be >= 1"));
    }

    let vector = embedder
        .embed_query(question)
        .await
        .map_err(|e| PipelineError::Query(format!("{:#}", e)))?;
    let matches = store
        .query(&session.index_name, &vector, top_k)
        .await
        .map_err(|e| PipelineError::Query(format!("{:#}", e)))?;

    tracing::info!(
        index = %session.index_name,
        top_k,
        returned = matches.len(),
        "retrieved matches"
    );
    Ok(matches)
}
