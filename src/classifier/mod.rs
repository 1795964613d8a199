//! Request classification
//!
//! A [`Classifier`] turns a classification prompt into a raw category label.
//! The router treats every classifier outcome as advisory: unavailability and
//! every [`ClassifierError`] fall back to default-endpoint routing.
//!
//! ## Implementations
//!
//! - [`LlmClassifier`] asks a chat-completion model through an
//!   [`LlmProvider`](crate::llm::LlmProvider)
//! - [`DisabledClassifier`] is never available; used when no classifier is configured

pub mod llm_classifier;

pub use llm_classifier::LlmClassifier;

use crate::llm::provider::LlmError;
use async_trait::async_trait;
use thiserror::Error;

/// Text classifier consulted before endpoint selection
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Short identifier for logs
    fn name(&self) -> &str;

    /// Cheap liveness check; classification is skipped when false
    fn is_available(&self) -> bool;

    /// Return the raw label the classifier chose for `prompt`
    async fn classify(&self, prompt: &str) -> Result<String, ClassifierError>;

    /// Check that the backing service answers; nothing to check by default
    async fn health_check(&self) -> Result<(), ClassifierError> {
        Ok(())
    }
}

/// Reasons a classification produced no label
#[derive(Debug, Clone, Error)]
pub enum ClassifierError {
    #[error("Classifier unavailable: {0}")]
    Unavailable(String),
    #[error("Classification timed out: {0}")]
    Timeout(String),
    #[error("Classifier network error: {0}")]
    Network(String),
    #[error("Invalid classifier response: {0}")]
    InvalidResponse(String),
    #[error("Classifier API error: {0}")]
    Api(String),
}

impl From<LlmError> for ClassifierError {
    fn from(error: LlmError) -> Self {
        match error {
            LlmError::NotConfigured(msg) => ClassifierError::Unavailable(msg),
            LlmError::Timeout(msg) => ClassifierError::Timeout(msg),
            LlmError::NetworkError(msg) => ClassifierError::Network(msg),
            LlmError::InvalidResponse(msg) => ClassifierError::InvalidResponse(msg),
            other => ClassifierError::Api(other.to_string()),
        }
    }
}

/// Classifier that is never available
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledClassifier;

#[async_trait]
impl Classifier for DisabledClassifier {
    fn name(&self) -> &str {
        "disabled"
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn classify(&self, _prompt: &str) -> Result<String, ClassifierError> {
        Err(ClassifierError::Unavailable(
            "classification is disabled".to_string(),
        ))
    }
}
