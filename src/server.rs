//! Web front end.
//!
//! Serves a single server-rendered page. Each form submission carries the
//! sidebar credentials, runs one pipeline flow to completion inside the
//! request handler and re-renders the page with the resulting notices.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Empty page |
//! | `POST` | `/process` | Multipart upload of `pdfs` plus credentials; ingest and index |
//! | `POST` | `/ask` | Urlencoded question plus credentials; retrieve and answer |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::models::UploadedDocument;
use crate::pipeline::{ask, process_uploads, Notice};
use crate::services::{HostedServices, ServiceFactory};
use crate::session::{ProviderKind, SessionConfig};
use crate::ui::{render_page, FormValues, PageView};

/// Largest accepted request body (all uploaded PDFs together).
const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    services: Arc<dyn ServiceFactory>,
}

/// Starts the web server with the hosted providers and Pinecone.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let config = Arc::new(config.clone());
    let services: Arc<dyn ServiceFactory> = Arc::new(HostedServices::new(config.clone()));
    run_server_with_services(config, services).await
}

/// Starts the web server with a custom [`ServiceFactory`].
pub async fn run_server_with_services(
    config: Arc<Config>,
    services: Arc<dyn ServiceFactory>,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(config, services);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!("pdfq listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router.
pub fn router(config: Arc<Config>, services: Arc<dyn ServiceFactory>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_index))
        .route("/process", post(handle_process))
        .route("/ask", post(handle_ask))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { config, services })
}

// ============ Credential fields ============

/// Sidebar fields shared by both forms.
#[derive(Debug, Default, Deserialize)]
struct CredentialFields {
    #[serde(default)]
    provider: String,
    #[serde(default)]
    provider_api_key: String,
    #[serde(default)]
    pinecone_api_key: String,
    #[serde(default)]
    pinecone_environment: String,
    #[serde(default)]
    index_name: String,
}

impl CredentialFields {
    /// Resolve the session. An unknown provider falls back to the configured
    /// default and yields a warning.
    fn resolve(&self, config: &Config) -> (SessionConfig, Option<Notice>) {
        let (provider, warning) = if self.provider.trim().is_empty() {
            (config.providers.default_kind(), None)
        } else {
            match self.provider.parse::<ProviderKind>() {
                Ok(p) => (p, None),
                Err(e) => (config.providers.default_kind(), Some(Notice::warning(e))),
            }
        };
        let session = SessionConfig::new(
            provider,
            &self.provider_api_key,
            &self.pinecone_api_key,
            &self.pinecone_environment,
            &self.index_name,
        );
        (session, warning)
    }
}

fn form_values(session: &SessionConfig, question: &str) -> FormValues {
    FormValues {
        provider: session.provider,
        provider_api_key: session.provider_api_key.clone(),
        pinecone_api_key: session.pinecone_api_key.clone(),
        pinecone_environment: session.pinecone_environment.clone(),
        index_name: session.index_name.clone(),
        question: question.to_string(),
    }
}

// ============ GET / ============

async fn handle_index(State(state): State<AppState>) -> Html<String> {
    let view = PageView::new(FormValues::empty(state.config.providers.default_kind()));
    Html(render_page(&view))
}

// ============ POST /process ============

/// Handler for `POST /process`.
///
/// Reads the credential fields and every `pdfs` file part, then runs the
/// "Process and Vectorize" flow. A malformed multipart body re-renders the
/// page with `400 Bad Request`.
async fn handle_process(State(state): State<AppState>, multipart: Multipart) -> Response {
    let (fields, documents) = match read_upload(multipart).await {
        Ok(parts) => parts,
        Err(e) => {
            let mut view =
                PageView::new(FormValues::empty(state.config.providers.default_kind()));
            view.notices
                .push(Notice::error(format!("Could not read the upload: {}", e)));
            return (StatusCode::BAD_REQUEST, Html(render_page(&view))).into_response();
        }
    };

    let (session, warning) = fields.resolve(&state.config);
    let mut view = PageView::new(form_values(&session, ""));
    view.notices.extend(warning);

    tracing::info!(files = documents.len(), provider = %session.provider, "process request");
    let outcome =
        process_uploads(&session, documents, state.services.as_ref(), &state.config).await;
    view.notices.extend(outcome.notices);

    Html(render_page(&view)).into_response()
}

async fn read_upload(
    mut multipart: Multipart,
) -> Result<(CredentialFields, Vec<UploadedDocument>), axum::extract::multipart::MultipartError> {
    let mut fields = CredentialFields::default();
    let mut documents = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "pdfs" {
            let filename = field.file_name().unwrap_or("upload.pdf").to_string();
            let bytes = field.bytes().await?;
            // Browsers send an empty part when no file was chosen.
            if bytes.is_empty() && filename.is_empty() {
                continue;
            }
            documents.push(UploadedDocument::new(filename, bytes.to_vec()));
            continue;
        }

        let value = field.text().await?;
        match name.as_str() {
            "provider" => fields.provider = value,
            "provider_api_key" => fields.provider_api_key = value,
            "pinecone_api_key" => fields.pinecone_api_key = value,
            "pinecone_environment" => fields.pinecone_environment = value,
            "index_name" => fields.index_name = value,
            _ => {}
        }
    }

    Ok((fields, documents))
}

// ============ POST /ask ============

#[derive(Debug, Deserialize)]
struct AskForm {
    #[serde(flatten)]
    credentials: CredentialFields,
    #[serde(default)]
    question: String,
}

/// Handler for `POST /ask`.
async fn handle_ask(State(state): State<AppState>, Form(form): Form<AskForm>) -> Html<String> {
    let (session, warning) = form.credentials.resolve(&state.config);
    let mut view = PageView::new(form_values(&session, &form.question));
    view.notices.extend(warning);

    tracing::info!(provider = %session.provider, index = %session.index_name, "ask request");
    let outcome = ask(
        &session,
        &form.question,
        state.services.as_ref(),
        &state.config,
    )
    .await;
    view.notices.extend(outcome.notices);
    view.answer = outcome.answer;

    Html(render_page(&view))
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

/// Handler for `GET /health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
