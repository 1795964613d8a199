//! Gateway configuration
//!
//! TOML file naming the routing policy document, the default environment and
//! the (optional) classifier backend. API keys are never stored in the file;
//! `api_key_env` names the environment variable read at runtime.

use crate::policy::Environment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main gateway configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayConfig {
    pub policy: PolicySection,
    /// Absent means classification is disabled
    pub classifier: Option<ClassifierSection>,
    /// Directory of the loaded file; relative policy paths resolve against it
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// Policy section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicySection {
    /// Routing policy document (JSON)
    pub path: PathBuf,
    /// Environment used when a request does not name one
    #[serde(default)]
    pub environment: Environment,
}

/// Classifier section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifierSection {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// OpenAI-compatible API base, e.g. `https://api.mistral.ai/v1`
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Environment variable containing API key; absent for unauthenticated local servers
    pub api_key_env: Option<String>,
    /// Per-attempt timeout in milliseconds (default: 5000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retry attempts after the first (default: 2)
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: usize,
    /// Sampling temperature (default: 0.0)
    #[serde(default)]
    pub temperature: f32,
    /// Completion budget (default: 16)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_enabled() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_retry_attempts() -> usize {
    2
}

fn default_max_tokens() -> u32 {
    16
}

impl ClassifierSection {
    /// Validate classifier settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "[classifier] base_url must not be empty".to_string(),
            ));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidConfig(format!(
                "[classifier] base_url '{}' must start with http:// or https://",
                self.base_url
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "[classifier] model must not be empty".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "[classifier] timeout_ms must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidConfig(format!(
                "[classifier] temperature {} must be between 0.0 and 2.0",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::InvalidConfig(
                "[classifier] max_tokens must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GatewayConfig {
    /// Configuration with no classifier, used when no config file is given
    pub fn with_policy(path: impl Into<PathBuf>, environment: Environment) -> Self {
        Self {
            policy: PolicySection {
                path: path.into(),
                environment,
            },
            classifier: None,
            base_dir: None,
        }
    }

    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: GatewayConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.policy.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "[policy] path must not be empty".to_string(),
            ));
        }
        if let Some(ref classifier) = self.classifier {
            classifier.validate()?;
        }
        Ok(())
    }

    /// Policy document path, resolved against the config file's directory
    pub fn policy_path(&self) -> PathBuf {
        match &self.base_dir {
            Some(dir) if self.policy.path.is_relative() => dir.join(&self.policy.path),
            _ => self.policy.path.clone(),
        }
    }

    /// Whether a classifier is configured and switched on
    pub fn classification_enabled(&self) -> bool {
        self.classifier.as_ref().is_some_and(|c| c.enabled)
    }

    /// Get classifier API key from its environment variable
    ///
    /// `Ok(None)` when no variable is configured; an error when it is
    /// configured but unset.
    pub fn get_classifier_api_key(&self) -> Result<Option<String>, ConfigError> {
        let Some(env_name) = self
            .classifier
            .as_ref()
            .and_then(|c| c.api_key_env.as_deref())
        else {
            return Ok(None);
        };

        std::env::var(env_name)
            .map(Some)
            .map_err(|_| ConfigError::EnvVarNotFound(env_name.to_string()))
    }
}
