//! LLM-backed classifier
//!
//! Sends the classification prompt to a chat-completion model and returns the
//! model's raw answer. Normalising that answer against the policy's category
//! names is the router's job, not the classifier's.

use super::{Classifier, ClassifierError};
use crate::llm::provider::{CompletionRequest, LlmProvider, Message};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

const SYSTEM_PROMPT: &str =
    "You route API requests. Answer with a single category name and nothing else.";

/// Classifier that asks a chat-completion model for the category
pub struct LlmClassifier {
    /// LLM provider (OpenAI-compatible endpoint, mock, ...)
    provider: Arc<dyn LlmProvider>,
    /// Model to use for classification
    model: String,
    /// Sampling temperature (default: 0.0 for deterministic labels)
    temperature: f32,
    /// Completion budget; a label needs only a few tokens
    max_tokens: u32,
    enabled: bool,
}

impl LlmClassifier {
    /// Create a new classifier over `provider` using `model`
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: 16,
            enabled: true,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Enable or disable classification without removing the classifier
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_completion_request(&self, prompt: &str) -> CompletionRequest {
        CompletionRequest {
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)],
            model: self.model.clone(),
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
        }
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn is_available(&self) -> bool {
        self.enabled && !self.model.trim().is_empty()
    }

    async fn classify(&self, prompt: &str) -> Result<String, ClassifierError> {
        let request = self.build_completion_request(prompt);
        let response = self.provider.complete(request).await?;

        let content = response
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                ClassifierError::InvalidResponse("No content in classifier response".to_string())
            })?;

        debug!(
            model = %response.model,
            label = %content,
            "Classifier returned label"
        );

        Ok(content)
    }

    async fn health_check(&self) -> Result<(), ClassifierError> {
        self.provider.health_check().await.map_err(ClassifierError::from)
    }
}
