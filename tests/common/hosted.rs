//! In-process mocks of the hosted services: the Pinecone controller and
//! data plane, and the OpenAI and Gemini endpoints the clients call.

use axum::extract::{Path, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use pdf_query::config::PineconeConfig;
use pdf_query::embedding::cosine_similarity;

use super::{KeywordEmbedder, KEYWORDS};

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    addr
}

// ============ Pinecone ============

pub const PINECONE_KEY: &str = "pc-test";
pub const PROJECT: &str = "proj";

#[derive(Default)]
pub struct MockPinecone {
    pub indexes: Vec<(String, usize)>,
    /// Status polls that answer `ready: false` before the index is ready.
    pub not_ready_polls: usize,
    pub status_polls: usize,
    pub whoami_calls: usize,
    /// Report one record fewer than received on every upsert.
    pub short_count: bool,
    pub created: Vec<Value>,
    pub upserts: Vec<Value>,
    pub queries: Vec<Value>,
    pub records: HashMap<String, Vec<Value>>,
}

pub type SharedPinecone = Arc<Mutex<MockPinecone>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("Api-Key").and_then(|v| v.to_str().ok()) == Some(PINECONE_KEY)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "API key is invalid").into_response()
}

/// `{index}-{project}` back to the index name.
fn index_from_host(host: &str) -> Option<String> {
    host.strip_suffix(&format!("-{}", PROJECT)).map(|s| s.to_string())
}

async fn list_indexes(State(state): State<SharedPinecone>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let state = state.lock().unwrap();
    let names: Vec<&str> = state.indexes.iter().map(|(n, _)| n.as_str()).collect();
    Json(json!(names)).into_response()
}

async fn create_index(
    State(state): State<SharedPinecone>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = state.lock().unwrap();
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let dims = body["dimension"].as_u64().unwrap_or_default() as usize;
    state.indexes.push((name, dims));
    state.created.push(body);
    StatusCode::CREATED.into_response()
}

async fn describe_index(
    State(state): State<SharedPinecone>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = state.lock().unwrap();
    if !state.indexes.iter().any(|(n, _)| *n == name) {
        return (StatusCode::NOT_FOUND, "index not found").into_response();
    }
    state.status_polls += 1;
    let ready = state.status_polls > state.not_ready_polls;
    Json(json!({ "database": { "name": name }, "status": { "ready": ready } })).into_response()
}

async fn whoami(State(state): State<SharedPinecone>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    state.lock().unwrap().whoami_calls += 1;
    Json(json!({ "project_name": PROJECT, "user_label": "default" })).into_response()
}

async fn upsert(
    State(state): State<SharedPinecone>,
    headers: HeaderMap,
    Path(host): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let Some(index) = index_from_host(&host) else {
        return (StatusCode::NOT_FOUND, "unknown host").into_response();
    };
    let mut state = state.lock().unwrap();
    let vectors = body["vectors"].as_array().cloned().unwrap_or_default();
    let mut count = vectors.len();
    if state.short_count {
        count = count.saturating_sub(1);
    }
    state.records.entry(index).or_default().extend(vectors);
    state.upserts.push(body);
    Json(json!({ "upsertedCount": count })).into_response()
}

fn as_vector(value: &Value) -> Vec<f32> {
    value
        .as_array()
        .map(|a| a.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
        .unwrap_or_default()
}

async fn query(
    State(state): State<SharedPinecone>,
    headers: HeaderMap,
    Path(host): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let Some(index) = index_from_host(&host) else {
        return (StatusCode::NOT_FOUND, "unknown host").into_response();
    };
    let mut state = state.lock().unwrap();
    let vector = as_vector(&body["vector"]);
    let top_k = body["topK"].as_u64().unwrap_or(10) as usize;
    let mut scored: Vec<(f32, Value)> = state
        .records
        .get(&index)
        .map(|records| {
            records
                .iter()
                .map(|r| (cosine_similarity(&vector, &as_vector(&r["values"])), r.clone()))
                .collect()
        })
        .unwrap_or_default();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    let matches: Vec<Value> = scored
        .into_iter()
        .take(top_k)
        .map(|(score, r)| {
            let mut metadata = r["metadata"].clone();
            // Numeric metadata comes back as a float.
            if let Some(page) = metadata.get("page").and_then(|p| p.as_u64()) {
                metadata["page"] = json!(page as f64);
            }
            json!({ "id": r["id"], "score": score, "metadata": metadata })
        })
        .collect();
    state.queries.push(body);
    Json(json!({ "matches": matches, "namespace": "" })).into_response()
}

/// Serve the mock on an ephemeral port and return the store settings
/// pointing at it.
pub async fn start_pinecone(state: SharedPinecone, ready_timeout_secs: u64) -> PineconeConfig {
    let app = Router::new()
        .route("/databases", get(list_indexes).post(create_index))
        .route("/databases/{name}", get(describe_index))
        .route("/actions/whoami", get(whoami))
        .route("/{host}/vectors/upsert", post(upsert))
        .route("/{host}/query", post(query))
        .with_state(state);
    let addr = serve(app).await;
    PineconeConfig {
        controller_url: Some(format!("http://{}", addr)),
        index_url: Some(format!("http://{}/{{index}}-{{project}}", addr)),
        ready_timeout_secs,
    }
}

// ============ OpenAI / Gemini ============

pub const PROVIDER_KEY: &str = "sk-test";

/// One request received by the provider mock.
#[derive(Debug, Clone)]
pub struct ProviderCall {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Value,
}

#[derive(Default)]
pub struct MockProviders {
    pub calls: Vec<ProviderCall>,
}

pub type SharedProviders = Arc<Mutex<MockProviders>>;

/// Names the first keyword in the prompt's context, like the offline
/// completer. A prompt containing `BLOCKED` is refused by the Gemini route.
fn answer_for(prompt: &str) -> String {
    let context = prompt.split("Question:").next().unwrap_or_default();
    match KEYWORDS.iter().find(|k| context.contains(*k)) {
        Some(k) => format!("The document mentions the {}.", k),
        None => "I don't know.".to_string(),
    }
}

fn provider_authorized(headers: &HeaderMap) -> bool {
    let bearer = format!("Bearer {}", PROVIDER_KEY);
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) == Some(bearer.as_str())
        || headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) == Some(PROVIDER_KEY)
}

fn strings(values: &Value) -> Vec<String> {
    values
        .as_array()
        .map(|a| a.iter().filter_map(|v| v.as_str()).map(|s| s.to_string()).collect())
        .unwrap_or_default()
}

async fn provider_call(
    State(state): State<SharedProviders>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let path = uri.path().to_string();
    state.lock().unwrap().calls.push(ProviderCall {
        path: path.clone(),
        headers: headers.clone(),
        body: body.clone(),
    });
    if !provider_authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "message": "Incorrect API key provided" } })),
        )
            .into_response();
    }

    match path.as_str() {
        "/v1/embeddings" => {
            // Reversed, so clients must order by `index`.
            let data: Vec<Value> = strings(&body["input"])
                .iter()
                .enumerate()
                .rev()
                .map(|(i, t)| json!({ "object": "embedding", "index": i, "embedding": KeywordEmbedder::vector(t) }))
                .collect();
            Json(json!({ "object": "list", "data": data, "model": body["model"] })).into_response()
        }
        "/v1/completions" => {
            let prompt = body["prompt"].as_str().unwrap_or_default();
            Json(json!({ "choices": [{ "index": 0, "text": format!(" {}", answer_for(prompt)) }] }))
                .into_response()
        }
        p if p.ends_with(":batchEmbedContents") => {
            let embeddings: Vec<Value> = body["requests"]
                .as_array()
                .cloned()
                .unwrap_or_default()
                .iter()
                .map(|r| {
                    let text = r["content"]["parts"][0]["text"].as_str().unwrap_or_default();
                    json!({ "values": KeywordEmbedder::vector(text) })
                })
                .collect();
            Json(json!({ "embeddings": embeddings })).into_response()
        }
        p if p.ends_with(":embedContent") => {
            let text = body["content"]["parts"][0]["text"].as_str().unwrap_or_default();
            Json(json!({ "embedding": { "values": KeywordEmbedder::vector(text) } })).into_response()
        }
        p if p.ends_with(":generateContent") => {
            let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default();
            if prompt.contains("BLOCKED") {
                return Json(json!({ "promptFeedback": { "blockReason": "SAFETY" } })).into_response();
            }
            let answer = answer_for(prompt);
            let (head, tail) = answer.split_at(answer.len() / 2);
            Json(json!({
                "candidates": [{ "content": { "role": "model", "parts": [{ "text": head }, { "text": tail }] } }]
            }))
            .into_response()
        }
        _ => (StatusCode::NOT_FOUND, "no such endpoint").into_response(),
    }
}

/// Serve the provider mock and return its base URL.
pub async fn start_providers(state: SharedProviders) -> String {
    let app = Router::new().fallback(provider_call).with_state(state);
    format!("http://{}", serve(app).await)
}
