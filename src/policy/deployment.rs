//! Per-environment deployment policy
//!
//! A [`DeploymentPolicy`] holds the default endpoint and the ordered category
//! rules for one environment (production or sandbox). Label lookups go through
//! a category cache that is built exactly once on first use; the cache lives in
//! a [`OnceLock`] so a policy shared between concurrent requests never exposes
//! a partially built map.

use super::category::Category;
use super::endpoint::EndpointRef;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// Routing configuration for a single environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_model: Option<EndpointRef>,
    #[serde(default, deserialize_with = "deserialize_categories")]
    categories: Vec<Category>,
    #[serde(skip)]
    category_cache: OnceLock<HashMap<String, EndpointRef>>,
}

/// Accepts `null` for the list and for individual entries, dropping the nulls
fn deserialize_categories<'de, D>(deserializer: D) -> Result<Vec<Category>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Option<Category>>> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default().into_iter().flatten().collect())
}

impl DeploymentPolicy {
    /// Create a deployment policy from a default endpoint and category rules
    pub fn new(default_model: Option<EndpointRef>, categories: Vec<Category>) -> Self {
        Self {
            default_model,
            categories,
            category_cache: OnceLock::new(),
        }
    }

    /// Configured default endpoint, valid or not
    pub fn default_endpoint(&self) -> Option<&EndpointRef> {
        self.default_model.as_ref()
    }

    /// Category rules in stored order, including invalid ones
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn set_default_endpoint(&mut self, default_model: Option<EndpointRef>) {
        self.default_model = default_model;
    }

    /// Replace all category rules and drop the lookup cache
    pub fn set_categories(&mut self, categories: Vec<Category>) {
        self.categories = categories;
        self.category_cache = OnceLock::new();
    }

    /// Append a category rule and drop the lookup cache
    pub fn add_category(&mut self, category: Category) {
        self.categories.push(category);
        self.category_cache = OnceLock::new();
    }

    /// Valid categories in stored order
    pub fn valid_categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter().filter(|c| c.is_valid())
    }

    /// Names of valid categories, deduplicated, first-seen order
    pub fn available_categories(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for category in self.valid_categories() {
            if !names.contains(&category.name()) {
                names.push(category.name());
            }
        }
        names
    }

    /// Number of valid categories
    pub fn category_count(&self) -> usize {
        self.valid_categories().count()
    }

    /// Whether a valid default or at least one valid category exists
    pub fn has_valid_endpoints(&self) -> bool {
        self.valid_default_endpoint().is_some() || self.category_count() > 0
    }

    /// Default endpoint, only if it is valid
    pub fn valid_default_endpoint(&self) -> Option<&EndpointRef> {
        self.default_model.as_ref().filter(|e| e.is_valid())
    }

    /// Resolve the endpoint for a classification label
    ///
    /// A missing or blank label selects the valid default endpoint. A label
    /// found in the category cache selects that category's endpoint; unknown
    /// labels fall back to the valid default. `None` means nothing is routable.
    pub fn select_endpoint(&self, category_label: Option<&str>) -> Option<&EndpointRef> {
        let label = match category_label {
            Some(label) if !label.trim().is_empty() => label,
            _ => return self.valid_default_endpoint(),
        };

        match self.category_cache().get(label) {
            Some(endpoint) => Some(endpoint),
            None => {
                debug!(label = %label, "No category endpoint for label, using default");
                self.valid_default_endpoint()
            }
        }
    }

    /// Name to endpoint map over valid categories, last duplicate wins
    fn category_cache(&self) -> &HashMap<String, EndpointRef> {
        self.category_cache.get_or_init(|| {
            let mut cache = HashMap::new();
            for category in &self.categories {
                if let Some(endpoint) = category.to_endpoint_ref() {
                    cache.insert(category.name().to_string(), endpoint.clone());
                }
            }
            debug!(entries = cache.len(), "Built category endpoint cache");
            cache
        })
    }
}
