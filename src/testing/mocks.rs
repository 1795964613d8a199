//! Mock implementations for testing
//!
//! Provides mock LlmProvider and Classifier implementations so routing can be
//! exercised without a live model endpoint.

use crate::classifier::{Classifier, ClassifierError};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, TokenUsage,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Mock LLM provider for testing
#[derive(Debug, Default)]
pub struct MockLlmProvider {
    pub responses: Vec<String>,
    pub current_response: Arc<Mutex<usize>>,
    pub should_fail: bool,
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            ..Default::default()
        }
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn single_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    pub async fn get_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().await.push(request);

        if self.should_fail {
            return Err(LlmError::NetworkError("Mock LLM failure".to_string()));
        }

        let mut current = self.current_response.lock().await;
        let response_idx = *current % self.responses.len().max(1);
        *current += 1;

        let content = if self.responses.is_empty() {
            "NONE".to_string()
        } else {
            self.responses[response_idx].clone()
        };

        Ok(CompletionResponse {
            content: Some(content),
            model: "mock-model".to_string(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 1,
                total_tokens: 11,
            },
            finish_reason: FinishReason::Stop,
        })
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        if self.should_fail {
            Err(LlmError::NetworkError(
                "Mock health check failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Scripted outcome for one [`MockClassifier`] call
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Label(String),
    Fail(ClassifierError),
}

/// Mock classifier for testing
///
/// Replays its script in order, repeating the last entry once exhausted. An
/// empty script answers `NONE`.
#[derive(Debug)]
pub struct MockClassifier {
    pub script: Vec<MockOutcome>,
    pub available: bool,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl MockClassifier {
    pub fn new(script: Vec<MockOutcome>) -> Self {
        Self {
            script,
            available: true,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always answer `label`
    pub fn returning(label: impl Into<String>) -> Self {
        Self::new(vec![MockOutcome::Label(label.into())])
    }

    /// Always fail with `error`
    pub fn failing(error: ClassifierError) -> Self {
        Self::new(vec![MockOutcome::Fail(error)])
    }

    /// Report itself unavailable
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(vec![])
        }
    }

    /// Sleep before answering; used to exercise classification timeouts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn get_prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn classify(&self, prompt: &str) -> Result<String, ClassifierError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().await.push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self
            .script
            .get(call)
            .or_else(|| self.script.last())
            .cloned()
            .unwrap_or_else(|| MockOutcome::Label("NONE".to_string()));

        match outcome {
            MockOutcome::Label(label) => Ok(label),
            MockOutcome::Fail(error) => Err(error),
        }
    }
}
