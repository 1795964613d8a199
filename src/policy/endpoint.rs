//! Backend model endpoint references
//!
//! An [`EndpointRef`] names one backend model deployment: the model identifier
//! sent upstream and the gateway endpoint that serves it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a single backend model deployment
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRef {
    /// Model identifier (e.g., "gpt-4o", "mistral-large-latest")
    #[serde(default)]
    pub model: String,
    /// Gateway endpoint identifier serving the model
    #[serde(default)]
    pub endpoint_id: String,
}

impl EndpointRef {
    /// Create a new endpoint reference
    pub fn new(model: impl Into<String>, endpoint_id: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            endpoint_id: endpoint_id.into(),
        }
    }

    /// Both identifiers must be non-blank after trimming
    pub fn is_valid(&self) -> bool {
        !self.model.trim().is_empty() && !self.endpoint_id.trim().is_empty()
    }
}

impl fmt::Display for EndpointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.model, self.endpoint_id)
    }
}
