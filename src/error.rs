//! Error types for routing operations
//!
//! Only configuration problems abort routing. Classifier trouble never
//! surfaces here; the router absorbs it and falls back to the default
//! endpoint. [`RouteError::to_fault`] turns an error into the fault the
//! gateway reports when mediation fails.

use crate::config::ConfigError;
use crate::policy::PolicyError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest fault message handed to the gateway
const MAX_FAULT_MESSAGE_LEN: usize = 500;

/// Main error type for routing operations
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("Routing policy configuration error: {0}")]
    Configuration(#[from] PolicyError),

    #[error("Gateway configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Fault category reported to the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultCode {
    ConfigurationError,
    InternalError,
}

/// Mediation failure as seen by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediationFault {
    pub code: FaultCode,
    pub message: String,
}

impl RouteError {
    /// Convert into a gateway fault with a sanitised message
    pub fn to_fault(&self) -> MediationFault {
        let code = match self {
            RouteError::Configuration(_) | RouteError::Config(_) => FaultCode::ConfigurationError,
            RouteError::Internal { .. } => FaultCode::InternalError,
        };

        MediationFault {
            code,
            message: sanitize_error_message(&self.to_string()),
        }
    }

    /// Whether the error stems from configuration rather than a request
    pub fn is_configuration(&self) -> bool {
        matches!(self, RouteError::Configuration(_) | RouteError::Config(_))
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

static SECRET_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").ok());

static SENSITIVE_PATH_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+").ok()
});

/// Redact secrets and sensitive paths, then cap the length
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = message.to_string();

    if let Some(pattern) = SECRET_PATTERN.as_ref() {
        sanitized = pattern.replace_all(&sanitized, "${1}=***").to_string();
    }

    if let Some(pattern) = SENSITIVE_PATH_PATTERN.as_ref() {
        sanitized = pattern
            .replace_all(&sanitized, "/***REDACTED***/")
            .to_string();
    }

    if sanitized.len() > MAX_FAULT_MESSAGE_LEN {
        let truncate_suffix = "...[truncated]";
        let mut cut = MAX_FAULT_MESSAGE_LEN - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], truncate_suffix);
    }

    sanitized
}

/// Result type for routing operations
pub type RouteResult<T> = Result<T, RouteError>;
