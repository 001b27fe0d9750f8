//! Answer synthesis: "stuff" every retrieved chunk into one prompt and make a
//! single completion call.

use crate::completion::Completer;
use crate::embedding::Embedder;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Answer, QueryMatch};
use crate::query::retrieve;
use crate::session::SessionConfig;
use crate::store::VectorStore;

const PROMPT_PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// Build the completion prompt. Chunks appear in rank order.
pub fn build_prompt(question: &str, matches: &[QueryMatch]) -> String {
    let context = matches
        .iter()
        .map(|m| m.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "{}\n\n{}\n\nQuestion: {}\nHelpful Answer:",
        PROMPT_PREAMBLE, context, question
    )
}

/// Produce an answer from already-retrieved matches.
///
/// An empty match list still produces a prompt, leaving the model to say it
/// does not know.
pub async fn synthesize(
    session: &SessionConfig,
    completer: &dyn Completer,
    question: &str,
    matches: Vec<QueryMatch>,
) -> PipelineResult<Answer> {
    session.require_provider_key()?;
    let prompt = build_prompt(question.trim(), &matches);
    let text = completer
        .complete(&prompt)
        .await
        .map_err(|e| PipelineError::Completion(format!("{:#}", e)))?;
    tracing::info!(
        model = completer.model_name(),
        context_chunks = matches.len(),
        "answer synthesized"
    );
    Ok(Answer { text, matches })
}

/// Retrieve then synthesize.
pub async fn answer_question(
    session: &SessionConfig,
    embedder: &dyn Embedder,
    completer: &dyn Completer,
    store: &dyn VectorStore,
    question: &str,
    top_k: usize,
) -> PipelineResult<Answer> {
    let matches = retrieve(session, embedder, store, question, top_k).await?;
    synthesize(session, completer, question, matches).await
}
