//! OpenAI-compatible chat-completions provider
//!
//! Works against any service exposing `POST {base_url}/chat/completions` in the
//! OpenAI wire format: Mistral La Plateforme, OpenAI, Azure OpenAI proxies,
//! vLLM and Ollama's compatibility layer.
//!
//! # Retry behaviour
//!
//! - Server errors (5xx) and connection failures are retried with exponential
//!   backoff (100ms, 200ms, 400ms, ...) up to `retry_attempts` times
//! - Timeouts, rate limits and other client errors (4xx) fail immediately
//!
//! # Example
//!
//! ```no_run
//! use llmroute::llm::providers::{OpenAiCompatConfig, OpenAiCompatProvider};
//!
//! let config = OpenAiCompatConfig::new("https://api.mistral.ai/v1")
//!     .with_api_key("secret")
//!     .with_timeout_ms(3000)
//!     .with_retry_attempts(1);
//!
//! let provider = OpenAiCompatProvider::new(config).unwrap();
//! ```

use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, Message,
    MessageRole, TokenUsage,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Configuration for an OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    /// Base URL including the version prefix (e.g., "https://api.mistral.ai/v1")
    pub base_url: String,
    /// Bearer token; empty for unauthenticated local servers
    pub api_key: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Number of retry attempts for transient failures
    pub retry_attempts: usize,
}

impl Default for OpenAiCompatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mistral.ai/v1".to_string(),
            api_key: String::new(),
            timeout_ms: 5000,
            retry_attempts: 2,
        }
    }
}

impl OpenAiCompatConfig {
    /// Create a config for the given base URL with default timeout and retries
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_retry_attempts(mut self, retry_attempts: usize) -> Self {
        self.retry_attempts = retry_attempts;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.base_url.trim_end_matches('/'))
    }
}

/// Chat-completions client for OpenAI-compatible services
pub struct OpenAiCompatProvider {
    config: OpenAiCompatConfig,
    client: Client,
}

impl OpenAiCompatProvider {
    /// Create a new provider; fails only if the HTTP client cannot be built
    pub fn new(config: OpenAiCompatConfig) -> Result<Self, LlmError> {
        if config.base_url.trim().is_empty() {
            return Err(LlmError::NotConfigured("base_url is required".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Convert completion request to wire format (pure function)
    fn convert_request(request: &CompletionRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }

    fn convert_message(message: &Message) -> ChatMessage {
        ChatMessage {
            role: match message.role {
                MessageRole::System => "system".to_string(),
                MessageRole::User => "user".to_string(),
                MessageRole::Assistant => "assistant".to_string(),
            },
            content: Some(message.content.clone()),
        }
    }

    /// Parse wire response into the provider-neutral shape (pure function)
    fn parse_response(response: ChatCompletionResponse) -> Result<CompletionResponse, LlmError> {
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            LlmError::InvalidResponse("No choices returned from provider".to_string())
        })?;

        Ok(CompletionResponse {
            content: choice.message.content,
            model: response.model,
            usage: TokenUsage {
                prompt_tokens: response.usage.prompt_tokens,
                completion_tokens: response.usage.completion_tokens,
                total_tokens: response.usage.total_tokens,
            },
            finish_reason: Self::convert_finish_reason(choice.finish_reason.as_deref()),
        })
    }

    fn convert_finish_reason(reason: Option<&str>) -> FinishReason {
        match reason {
            Some("stop") => FinishReason::Stop,
            Some("length") | Some("model_length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Error,
        }
    }

    /// Check if error should trigger retry (pure)
    fn should_retry(error: &LlmError) -> bool {
        match error {
            LlmError::NetworkError(_) => true,
            LlmError::ApiError(msg) => msg.contains("server error"),
            _ => false,
        }
    }

    /// Retry orchestrator around single API calls
    async fn complete_with_retry(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        let retry_attempts = self.config.retry_attempts;
        let mut last_error = None;

        for attempt in 0..=retry_attempts {
            if attempt > 0 {
                let backoff_ms = 100 * 2_u64.pow((attempt - 1) as u32);
                debug!(attempt, backoff_ms, "Retrying chat completion");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }

            match self.make_api_request(request).await {
                Ok(response) => {
                    let parsed = Self::parse_response(response)?;
                    debug!(
                        model = %parsed.model,
                        total_tokens = parsed.usage.total_tokens,
                        finish_reason = ?parsed.finish_reason,
                        "Chat completion succeeded"
                    );
                    return Ok(parsed);
                }
                Err(e) if Self::should_retry(&e) && attempt < retry_attempts => {
                    warn!(error = %e, attempt = attempt + 1, "Chat completion failed, will retry");
                    last_error = Some(e);
                }
                Err(e) => {
                    error!(error = %e, attempt = attempt + 1, "Chat completion failed");
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::NetworkError("All retry attempts failed".to_string())))
    }

    /// Make single API request
    async fn make_api_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let mut builder = self.client.post(self.config.completions_url()).json(request);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(format!("no response within {:?}", self.config.timeout()))
            } else {
                LlmError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, &body));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(format!("no response within {:?}", self.config.timeout()))
            } else {
                LlmError::NetworkError(format!("Failed to read response body: {e}"))
            }
        })?;

        serde_json::from_str(&body)
            .map_err(|e| LlmError::InvalidResponse(format!("Invalid JSON from provider: {e}")))
    }

    /// Map a non-success status to an error (pure)
    fn status_error(status: StatusCode, body: &str) -> LlmError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                LlmError::AuthenticationFailed(format!("{status} - {body}"))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                LlmError::RateLimitExceeded(format!("{status} - {body}"))
            }
            s if s.is_server_error() => {
                LlmError::ApiError(format!("server error: {status} - {body}"))
            }
            _ => LlmError::ApiError(format!("client error: {status} - {body}")),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let wire_request = Self::convert_request(&request);
        debug!(
            model = %wire_request.model,
            messages = wire_request.messages.len(),
            "Sending chat completion request"
        );
        self.complete_with_retry(&wire_request).await
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        let mut builder = self.client.get(self.config.models_url());
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::status_error(status, ""))
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: ChatUsage,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}
