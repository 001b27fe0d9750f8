//! Hosted completion models.
//!
//! One [`Completer`] per provider variant, each with a fixed model and the
//! configured temperature. The response text is returned as-is.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::PipelineResult;
use crate::http::{client, send_json};
use crate::session::{ProviderKind, SessionConfig};

/// Output budget for the OpenAI completions endpoint.
const OPENAI_MAX_TOKENS: u32 = 256;

#[async_trait]
pub trait Completer: Send + Sync {
    fn model_name(&self) -> &str;
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Create the completer for the session's provider variant. Fails without a
/// network call when the provider key is missing.
pub fn create_completer(
    session: &SessionConfig,
    base_url: &str,
    temperature: f32,
) -> PipelineResult<Box<dyn Completer>> {
    session.require_provider_key()?;
    let key = session.provider_api_key.clone();
    let base_url = base_url.trim_end_matches('/').to_string();
    Ok(match session.provider {
        ProviderKind::OpenAi => Box::new(OpenAiCompleter {
            api_key: key,
            base_url,
            temperature,
            client: client(),
        }),
        ProviderKind::Gemini => Box::new(GeminiCompleter {
            api_key: key,
            base_url,
            temperature,
            client: client(),
        }),
    })
}

pub struct OpenAiCompleter {
    api_key: String,
    base_url: String,
    temperature: f32,
    client: reqwest::Client,
}

#[async_trait]
impl Completer for OpenAiCompleter {
    fn model_name(&self) -> &str {
        ProviderKind::OpenAi.completion_model()
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model_name(),
            "prompt": prompt,
            "temperature": self.temperature,
            "max_tokens": OPENAI_MAX_TOKENS,
        });
        let request = self
            .client
            .post(format!("{}/v1/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body);
        let json = send_json("OpenAI", request).await?;
        parse_openai_completion(&json)
    }
}

fn parse_openai_completion(json: &Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("text"))
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].text"))
}

pub struct GeminiCompleter {
    api_key: String,
    base_url: String,
    temperature: f32,
    client: reqwest::Client,
}

#[async_trait]
impl Completer for GeminiCompleter {
    fn model_name(&self) -> &str {
        ProviderKind::Gemini.completion_model()
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": self.temperature },
        });
        let request = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url,
                self.model_name()
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        let json = send_json("Gemini", request).await?;
        parse_gemini_completion(&json)
    }
}

/// Concatenate the text parts of the first candidate.
fn parse_gemini_completion(json: &Value) -> Result<String> {
    let parts = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| {
            let reason = json
                .get("promptFeedback")
                .and_then(|f| f.get("blockReason"))
                .and_then(|r| r.as_str())
                .unwrap_or("no candidates");
            anyhow::anyhow!("Invalid Gemini response: {}", reason)
        })?;
    Ok(parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join(""))
}
