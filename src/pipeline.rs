//! The two user-facing flows, "Process and Vectorize" and "Ask", expressed as
//! sequences of stage calls that collect user-visible [`Notice`]s.
//!
//! Both flows are shared by the web UI and the CLI. Neither ever fails: every
//! stage error becomes an error notice and the flow stops there.

use serde::Serialize;

use crate::answer::answer_question;
use crate::config::Config;
use crate::error::PipelineError;
use crate::index::{index_chunks, IndexSummary};
use crate::ingest::{read_and_chunk, DocumentOutcome, IngestReport};
use crate::models::{Answer, UploadedDocument};
use crate::services::ServiceFactory;
use crate::session::{check_session, SessionConfig, SessionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

/// One status line shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: Level,
    pub text: String,
}

impl Notice {
    pub fn new(level: Level, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
    pub fn success(text: impl Into<String>) -> Self {
        Self::new(Level::Success, text)
    }
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(Level::Info, text)
    }
    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(Level::Warning, text)
    }
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Level::Error, text)
    }
}

/// Result of the "Process and Vectorize" flow.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutcome {
    pub notices: Vec<Notice>,
    pub report: Option<IngestReport>,
    pub summary: Option<IndexSummary>,
}

impl ProcessOutcome {
    fn push(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub fn succeeded(&self) -> bool {
        self.summary.is_some()
    }
}

/// Result of the "Ask" flow.
#[derive(Debug, Clone, Default)]
pub struct AskOutcome {
    pub notices: Vec<Notice>,
    pub answer: Option<Answer>,
}

/// Validate the session, extract and chunk `documents`, then index them.
pub async fn process_uploads(
    session: &SessionConfig,
    documents: Vec<UploadedDocument>,
    services: &dyn ServiceFactory,
    config: &Config,
) -> ProcessOutcome {
    let mut outcome = ProcessOutcome::default();

    if let Err(e) = session.require_all() {
        outcome.push(Notice::warning(config_message(&e)));
        return outcome;
    }
    if documents.is_empty() {
        outcome.push(Notice::warning("Please upload at least one PDF file."));
        return outcome;
    }

    let store = match services.store(session) {
        Ok(store) => store,
        Err(e) => {
            outcome.push(Notice::error(format!("Pinecone connection failed: {}", e)));
            return outcome;
        }
    };
    match check_session(session, store.as_ref()).await {
        Ok(status) => outcome.push(session_notice(&status)),
        Err(e) => {
            outcome.push(Notice::error(format!("Pinecone connection failed: {}", e)));
            return outcome;
        }
    }

    let extractor = services.extractor();
    let chunking = config.chunking.clone();
    let report =
        match tokio::task::spawn_blocking(move || read_and_chunk(&documents, extractor.as_ref(), &chunking))
            .await
        {
            Ok(report) => report,
            Err(e) => {
                outcome.push(Notice::error(format!("Error processing documents: {}", e)));
                return outcome;
            }
        };

    for failed in report.failures() {
        if let DocumentOutcome::Failed { filename, reason } = failed {
            outcome.push(Notice::error(format!(
                "Error processing {}: {}",
                filename, reason
            )));
        }
    }
    if report.is_empty() {
        outcome.push(Notice::error(
            "No text could be extracted from the uploaded PDFs. Nothing was vectorized.",
        ));
        outcome.report = Some(report);
        return outcome;
    }
    outcome.push(Notice::info(format!(
        "Total chunks created: {}",
        report.chunks.len()
    )));

    let embedder = match services.embedder(session) {
        Ok(embedder) => embedder,
        Err(e) => {
            outcome.push(Notice::error(format!("Failed to create vector store: {}", e)));
            outcome.report = Some(report);
            return outcome;
        }
    };
    match index_chunks(
        session,
        embedder.as_ref(),
        store.as_ref(),
        report.chunks.clone(),
        &config.indexing,
    )
    .await
    {
        Ok(summary) => {
            outcome.push(Notice::success(
                "Documents have been successfully vectorized and stored in Pinecone.",
            ));
            outcome.summary = Some(summary);
        }
        Err(e) => {
            tracing::warn!(error = %e, "indexing failed");
            outcome.push(Notice::error(format!("Failed to create vector store: {}", e)));
        }
    }
    outcome.report = Some(report);
    outcome
}

/// Answer `question` from the session's index.
pub async fn ask(
    session: &SessionConfig,
    question: &str,
    services: &dyn ServiceFactory,
    config: &Config,
) -> AskOutcome {
    let mut outcome = AskOutcome::default();

    if question.trim().is_empty() {
        outcome.notices.push(Notice::warning("Please enter a question."));
        return outcome;
    }
    if let Err(e) = session.require_index_name() {
        outcome.notices.push(Notice::warning(config_message(&e)));
        return outcome;
    }
    if let Err(e) = session.require_query_credentials() {
        outcome.notices.push(Notice::error(config_message(&e)));
        return outcome;
    }

    let store = match services.store(session) {
        Ok(store) => store,
        Err(e) => {
            outcome
                .notices
                .push(Notice::error(format!("Pinecone connection failed: {}", e)));
            return outcome;
        }
    };
    // A missing index is only advisory here too; the query itself reports it.
    match check_session(session, store.as_ref()).await {
        Ok(status) => outcome.notices.push(session_notice(&status)),
        Err(e) => {
            outcome
                .notices
                .push(Notice::error(format!("Pinecone connection failed: {}", e)));
            return outcome;
        }
    }

    let result = match (services.embedder(session), services.completer(session)) {
        (Ok(embedder), Ok(completer)) => {
            answer_question(
                session,
                embedder.as_ref(),
                completer.as_ref(),
                store.as_ref(),
                question,
                config.retrieval.top_k,
            )
            .await
        }
        (Err(e), _) | (_, Err(e)) => Err(e),
    };

    match result {
        Ok(answer) => outcome.answer = Some(answer),
        Err(e) => {
            tracing::warn!(error = %e, "ask failed");
            outcome
                .notices
                .push(Notice::error(format!("Failed to retrieve answers: {}", e)));
        }
    }
    outcome
}

fn session_notice(status: &SessionStatus) -> Notice {
    match status {
        SessionStatus::IndexFound(_) => Notice::success(status.message()),
        SessionStatus::IndexMissing(_) => Notice::warning(status.message()),
    }
}

/// Config errors carry a ready-made sentence; show it without the prefix.
fn config_message(e: &PipelineError) -> String {
    match e {
        PipelineError::Config(msg) => msg.clone(),
        other => other.to_string(),
    }
}

