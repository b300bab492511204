//! LLM Client Layer (component C9).
//!
//! A single narrow seam through which every LLM call in the pipeline is
//! issued: transport-level retries with exponential backoff, connect/read
//! timeouts, and — when the caller supplies a JSON schema — structured
//! output validation. Every call site fixes `temperature = 0`. The wire
//! shape itself is delegated to an [`crate::provider::LlmProvider`],
//! selected once at construction time from [`LlmConfig`].

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::provider::{AnthropicProvider, CompletionRequest, GeminiProvider, LlmProvider, OpenAiCompatibleProvider};
use crate::{json_extract::extract_json_object, LlmError, Result};

const RETRY_ATTEMPTS: u32 = 3;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Read timeout for the Chunker's planning call (§4.9).
pub const CHUNKER_READ_TIMEOUT: Duration = Duration::from_secs(300);
/// Read timeout for the report aggregators and the PRD call (§4.9).
pub const REPORT_READ_TIMEOUT: Duration = Duration::from_secs(600);

/// Assembled once at startup from `LLM_PROVIDER_MODEL`, `LLM_PROVIDER_REGION`
/// and `LLM_API_KEY` (see [`codepulse_utils::EngineConfig`]). `endpoint`, when
/// set, overrides provider selection with a direct OpenAI-compatible
/// chat-completions endpoint — used by tests and by self-hosted gateways;
/// left unset in production, where `model` picks between the two named
/// providers.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,
    pub region: Option<String>,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
}

impl LlmConfig {
    pub fn from_engine_config(config: &codepulse_utils::EngineConfig) -> Self {
        Self {
            model: config.llm_provider_model.clone(),
            region: config.llm_provider_region.clone(),
            api_key: config.llm_api_key.clone(),
            endpoint: std::env::var("LLM_PROVIDER_ENDPOINT").ok(),
        }
    }
}

/// One LLM invocation. `system` and `user` are composed by the calling
/// stage; `read_timeout` is fixed per call site (§4.9).
pub struct InvokeRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub read_timeout: Duration,
}

impl InvokeRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>, read_timeout: Duration) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 8192,
            temperature: 0.0,
            read_timeout,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

pub struct LlmClient {
    provider: Arc<dyn LlmProvider>,
}

/// Model-name substrings used to route to the Gemini provider; anything
/// else falls back to the Anthropic Messages API shape.
const GEMINI_MODEL_MARKER: &str = "gemini";

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .expect("reqwest client builder never fails with only a connect timeout set");

        let provider: Arc<dyn LlmProvider> = if let Some(endpoint) = config.endpoint.clone() {
            Arc::new(OpenAiCompatibleProvider::new(
                http,
                endpoint,
                config.model.clone(),
                config.api_key.clone(),
                config.region.clone(),
            ))
        } else if config.model.to_lowercase().contains(GEMINI_MODEL_MARKER) {
            Arc::new(GeminiProvider::new(http, config.model.clone(), config.api_key.clone()))
        } else {
            Arc::new(AnthropicProvider::new(http, config.model.clone(), config.api_key.clone()))
        };

        Self { provider }
    }

    /// Issue one invocation, retrying transport failures and provider 5xx
    /// responses up to [`RETRY_ATTEMPTS`] times with exponential backoff
    /// (base 1s, doubling). Non-2xx 4xx responses are fatal immediately.
    pub async fn invoke(&self, req: InvokeRequest) -> Result<String> {
        let mut attempt = 0;
        let mut backoff = Duration::from_secs(1);

        loop {
            attempt += 1;
            match self.try_invoke(&req).await {
                Ok(text) => return Ok(text),
                Err(e) if Self::is_retryable(&e) && attempt < RETRY_ATTEMPTS => {
                    warn!("LLM invocation attempt {attempt} failed: {e}; retrying in {backoff:?}");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// [`Self::invoke`], then strip a single markdown fence if present,
    /// parse the remainder as JSON, and deserialize into `T`. Any failure
    /// along that chain is a schema error, per §4.9.
    pub async fn invoke_structured<T: DeserializeOwned>(&self, req: InvokeRequest) -> Result<T> {
        let raw = self.invoke(req).await?;
        let json_text = extract_json_object(&raw)
            .ok_or_else(|| LlmError::Schema("response contained no JSON object".to_string()))?;
        serde_json::from_str(&json_text).map_err(|e| {
            LlmError::Schema(format!("structured response failed to parse: {e}"))
        })
    }

    /// Only transport failures and provider 5xx responses are retried;
    /// `ClientError` (4xx) is fatal immediately (§4.9/§7).
    fn is_retryable(err: &LlmError) -> bool {
        matches!(err, LlmError::Http(_) | LlmError::ProviderError(_))
    }

    async fn try_invoke(&self, req: &InvokeRequest) -> Result<String> {
        let completion = CompletionRequest {
            system: &req.system,
            user: &req.user,
            max_tokens: req.max_tokens,
            temperature: req.temperature,
        };

        tokio::time::timeout(req.read_timeout, self.provider.complete(&completion))
            .await
            .map_err(|_| LlmError::Timeout { seconds: req.read_timeout.as_secs() })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(endpoint: String) -> LlmConfig {
        LlmConfig {
            model: "test-model".to_string(),
            region: None,
            api_key: None,
            endpoint: Some(endpoint),
        }
    }

    #[tokio::test]
    async fn invoke_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "hello"}}]
            })))
            .mount(&server)
            .await;

        let client = LlmClient::new(test_config(server.uri()));
        let text = client
            .invoke(InvokeRequest::new("sys", "user", Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn retries_on_server_error_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "recovered"}}]
            })))
            .mount(&server)
            .await;

        let client = LlmClient::new(test_config(server.uri()));
        let text = client
            .invoke(InvokeRequest::new("sys", "user", Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(text, "recovered");
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;

        let client = LlmClient::new(test_config(server.uri()));
        let result = client
            .invoke(InvokeRequest::new("sys", "user", Duration::from_secs(5)))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn invoke_structured_strips_markdown_fence() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "```json\n{\"a\": 1}\n```"}}]
            })))
            .mount(&server)
            .await;

        #[derive(serde::Deserialize)]
        struct Payload {
            a: u32,
        }

        let client = LlmClient::new(test_config(server.uri()));
        let payload: Payload = client
            .invoke_structured(InvokeRequest::new("sys", "user", Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(payload.a, 1);
    }

    #[test]
    fn gemini_model_name_routes_to_gemini_provider() {
        let config = test_config_no_endpoint("gemini-2.0-flash-exp".to_string());
        // `endpoint` unset means provider selection runs; constructing the
        // client must not panic regardless of which provider is chosen.
        let _client = LlmClient::new(config);
    }

    fn test_config_no_endpoint(model: String) -> LlmConfig {
        LlmConfig { model, region: None, api_key: None, endpoint: None }
    }
}
