//! `LlmProvider` — the provider-facing half of the LLM Client Layer (C9).
//!
//! The retry/timeout/structured-output machinery in [`crate::client`] is
//! provider-agnostic; this module owns the two wire shapes the workspace
//! speaks, selected at startup by [`crate::client::LlmConfig`] from
//! `LLM_PROVIDER_MODEL` (§9's open question about the source toggling
//! between two LLM providers). [`AnthropicProvider`] follows the
//! Messages-API request/response shape; [`GeminiProvider`] is grounded
//! directly on the teacher's `codehud-llm::gemini::GeminiClient`, the one
//! LLM integration the teacher workspace already carried.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{LlmError, Result};

/// One provider-neutral completion request. Built by [`crate::client::LlmClient`]
/// from an [`crate::client::InvokeRequest`]; `system`/`user` are assembled by the
/// calling pipeline stage.
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A backend capable of turning one completion request into response text.
/// Transport retries, timeouts and JSON-schema validation are handled by the
/// caller ([`crate::client::LlmClient`]); implementations only need to issue
/// the HTTP call and classify the outcome into [`LlmError`].
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String>;
}

/// 5xx is a retryable provider error; any other non-2xx (4xx) is a fatal
/// client error and must not be retried (§4.9/§7).
fn classify_status(status: reqwest::StatusCode, body: String) -> LlmError {
    if status.is_server_error() {
        LlmError::ProviderError(format!("provider returned {status}: {body}"))
    } else {
        LlmError::ClientError(format!("provider returned {status}: {body}"))
    }
}

// ---------------------------------------------------------------------
// Anthropic Messages API
// ---------------------------------------------------------------------

const ANTHROPIC_DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl AnthropicProvider {
    pub fn new(http: reqwest::Client, model: String, api_key: Option<String>) -> Self {
        let endpoint = std::env::var("LLM_PROVIDER_ENDPOINT")
            .unwrap_or_else(|_| ANTHROPIC_DEFAULT_ENDPOINT.to_string());
        Self { http, endpoint, api_key, model }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: [AnthropicMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let body = AnthropicRequest {
            model: &self.model,
            system: request.system,
            messages: [AnthropicMessage { role: "user", content: request.user }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let mut builder = self
            .http
            .post(&self.endpoint)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let parsed: AnthropicResponse = response.json().await?;
        parsed
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .ok_or_else(|| LlmError::ProviderError("empty content array".to_string()))
    }
}

// ---------------------------------------------------------------------
// Google AI Studio (Gemini) — grounded on the teacher's GeminiClient
// ---------------------------------------------------------------------

const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiProvider {
    http: reqwest::Client,
    model: String,
    api_key: Option<String>,
}

impl GeminiProvider {
    pub fn new(http: reqwest::Client, model: String, api_key: Option<String>) -> Self {
        Self { http, model, api_key }
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContentResponse,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::ProviderError("missing LLM_API_KEY for gemini provider".to_string()))?;
        let url = format!("{GEMINI_API_BASE_URL}/{}:generateContent?key={api_key}", self.model);

        let body = GeminiRequest {
            contents: vec![GeminiContent { parts: vec![GeminiPart { text: request.user }] }],
            system_instruction: Some(GeminiContent { parts: vec![GeminiPart { text: request.system }] }),
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let parsed: GeminiResponse = response.json().await?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| LlmError::ProviderError("no candidates in gemini response".to_string()))
    }
}

// ---------------------------------------------------------------------
// OpenAI-compatible chat-completions shape — used for self-hosted or
// test-double gateways reached via an explicit `LLM_PROVIDER_ENDPOINT`
// override rather than the two named providers above.
// ---------------------------------------------------------------------

pub struct OpenAiCompatibleProvider {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    region: Option<String>,
    model: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        http: reqwest::Client,
        endpoint: String,
        model: String,
        api_key: Option<String>,
        region: Option<String>,
    ) -> Self {
        Self { http, endpoint, api_key, region, model }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: request.system },
                ChatMessage { role: "user", content: request.user },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut builder = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        if let Some(region) = &self.region {
            builder = builder.header("X-Provider-Region", region);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::ProviderError("empty choices array".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn anthropic_provider_extracts_first_text_block() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "hello from claude"}]
            })))
            .mount(&server)
            .await;

        let mut provider = AnthropicProvider::new(reqwest::Client::new(), "test-model".to_string(), None);
        provider.endpoint = server.uri();

        let req = CompletionRequest { system: "sys", user: "user", max_tokens: 100, temperature: 0.0 };
        let text = provider.complete(&req).await.unwrap();
        assert_eq!(text, "hello from claude");
    }

    #[tokio::test]
    async fn gemini_provider_requires_api_key() {
        let provider = GeminiProvider::new(reqwest::Client::new(), "gemini-2.0-flash".to_string(), None);
        let req = CompletionRequest { system: "sys", user: "user", max_tokens: 100, temperature: 0.0 };
        let result = provider.complete(&req).await;
        assert!(result.is_err());
    }
}
