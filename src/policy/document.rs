//! Routing policy documents
//!
//! The policy document is JSON as attached to an API by the gateway:
//!
//! ```json
//! {
//!   "production": {
//!     "defaultModel": {"model": "gpt-4o-mini", "endpointId": "ep-default"},
//!     "categories": [
//!       {"name": "Billing", "context": "payment questions",
//!        "model": "gpt-4o", "endpointId": "ep-billing"}
//!     ]
//!   },
//!   "sandbox": null,
//!   "suspendDuration": 30
//! }
//! ```

use super::deployment::DeploymentPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Milliseconds per second, for suspend duration conversion
pub const MILLISECONDS_IN_SECOND: u64 = 1000;

/// Errors raised while reading a routing policy document
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Routing policy document is missing or empty")]
    Missing,
    #[error("Failed to parse routing policy: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to read routing policy: {0}")]
    Io(#[from] std::io::Error),
}

/// Gateway environment a request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Environment {
    #[default]
    Production,
    Sandbox,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "sandbox" => Ok(Self::Sandbox),
            other => Err(format!(
                "invalid environment '{other}', expected: production, sandbox"
            )),
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Sandbox => write!(f, "sandbox"),
        }
    }
}

/// Top-level routing policy: one deployment per environment plus failover timing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingPolicy {
    #[serde(default)]
    pub production: Option<DeploymentPolicy>,
    #[serde(default)]
    pub sandbox: Option<DeploymentPolicy>,
    /// Seconds the gateway suspends a failed endpoint before retrying it
    #[serde(default)]
    pub suspend_duration: u64,
}

impl RoutingPolicy {
    /// Parse a policy document; blank input and `null` are rejected
    pub fn from_json(document: &str) -> Result<Self, PolicyError> {
        if document.trim().is_empty() {
            return Err(PolicyError::Missing);
        }

        let parsed: Option<RoutingPolicy> = serde_json::from_str(document)?;
        parsed.ok_or(PolicyError::Missing)
    }

    /// Read and parse a policy document from disk
    pub fn load_from_file(path: &Path) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Deployment for an environment; absent means nothing routable there
    pub fn deployment(&self, environment: Environment) -> Option<&DeploymentPolicy> {
        match environment {
            Environment::Production => self.production.as_ref(),
            Environment::Sandbox => self.sandbox.as_ref(),
        }
    }

    pub fn suspend_duration(&self) -> Duration {
        Duration::from_secs(self.suspend_duration)
    }

    /// Suspend duration in the gateway's failover unit
    pub fn suspend_duration_millis(&self) -> u64 {
        self.suspend_duration.saturating_mul(MILLISECONDS_IN_SECOND)
    }
}
