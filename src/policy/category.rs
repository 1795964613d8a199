//! Category routing rules
//!
//! A [`Category`] maps a classification label to the endpoint that should
//! serve requests of that kind. The name doubles as the label the classifier
//! is asked to answer with; `context` is shown to the classifier to help it
//! decide, and `description` is documentation only.

use super::endpoint::EndpointRef;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Named routing rule mapping a classification label to an endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    model: String,
    #[serde(default)]
    endpoint_id: String,
    /// Memoized target; reset by every setter touching model or endpoint id
    #[serde(skip)]
    endpoint: OnceLock<EndpointRef>,
}

impl Category {
    /// Create a category routing `name` to `model` served by `endpoint_id`
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        endpoint_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            endpoint_id: endpoint_id.into(),
            ..Default::default()
        }
    }

    /// Set the classifier-facing context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set the human-readable description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint_id(&self) -> &str {
        &self.endpoint_id
    }

    /// Context text when present and non-blank
    pub fn prompt_context(&self) -> Option<&str> {
        self.context.as_deref().filter(|c| !c.trim().is_empty())
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_context(&mut self, context: Option<String>) {
        self.context = context;
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
        self.endpoint = OnceLock::new();
    }

    pub fn set_endpoint_id(&mut self, endpoint_id: impl Into<String>) {
        self.endpoint_id = endpoint_id.into();
        self.endpoint = OnceLock::new();
    }

    /// Replace model and endpoint id together
    pub fn set_target(&mut self, model: impl Into<String>, endpoint_id: impl Into<String>) {
        self.model = model.into();
        self.endpoint_id = endpoint_id.into();
        self.endpoint = OnceLock::new();
    }

    /// Name, model and endpoint id must all be non-blank
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.model.trim().is_empty()
            && !self.endpoint_id.trim().is_empty()
    }

    /// Target endpoint, or `None` while the category is invalid
    pub fn to_endpoint_ref(&self) -> Option<&EndpointRef> {
        if !self.is_valid() {
            return None;
        }
        Some(
            self.endpoint
                .get_or_init(|| EndpointRef::new(self.model.clone(), self.endpoint_id.clone())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_category_yields_endpoint() {
        let category = Category::new("Billing", "m1", "ep-billing");
        assert!(category.is_valid());
        assert_eq!(
            category.to_endpoint_ref(),
            Some(&EndpointRef::new("m1", "ep-billing"))
        );
    }

    #[test]
    fn test_invalid_category_yields_none() {
        assert!(Category::new("", "m1", "e1").to_endpoint_ref().is_none());
        assert!(Category::new("Billing", " ", "e1").to_endpoint_ref().is_none());
        assert!(Category::new("Billing", "m1", "").to_endpoint_ref().is_none());
    }

    #[test]
    fn test_memo_is_stable_between_calls() {
        let category = Category::new("Billing", "m1", "e1");
        let first = category.to_endpoint_ref().unwrap() as *const EndpointRef;
        let second = category.to_endpoint_ref().unwrap() as *const EndpointRef;
        assert_eq!(first, second);
    }

    #[test]
    fn test_setters_invalidate_memo() {
        let mut category = Category::new("Billing", "m1", "e1");
        assert_eq!(category.to_endpoint_ref().unwrap().model, "m1");

        category.set_model("m2");
        assert_eq!(category.to_endpoint_ref().unwrap().model, "m2");

        category.set_endpoint_id("e2");
        assert_eq!(category.to_endpoint_ref().unwrap().endpoint_id, "e2");

        category.set_target("m3", "e3");
        assert_eq!(
            category.to_endpoint_ref(),
            Some(&EndpointRef::new("m3", "e3"))
        );
    }

    #[test]
    fn test_validity_reevaluated_after_name_change() {
        let mut category = Category::new("Billing", "m1", "e1");
        assert!(category.to_endpoint_ref().is_some());

        category.set_name("  ");
        assert!(!category.is_valid());
        assert!(category.to_endpoint_ref().is_none());
    }

    #[test]
    fn test_blank_context_is_not_prompt_context() {
        let category = Category::new("Billing", "m1", "e1").with_context("   ");
        assert_eq!(category.context(), Some("   "));
        assert!(category.prompt_context().is_none());

        let category = Category::new("Billing", "m1", "e1").with_context("payments");
        assert_eq!(category.prompt_context(), Some("payments"));
    }

    #[test]
    fn test_deserialize_category() {
        let category: Category = serde_json::from_str(
            r#"{
                "name": "Support",
                "context": "product help",
                "description": "Support desk traffic",
                "model": "mistral-small",
                "endpointId": "ep-support"
            }"#,
        )
        .unwrap();

        assert_eq!(category.name(), "Support");
        assert_eq!(category.context(), Some("product help"));
        assert_eq!(category.description(), Some("Support desk traffic"));
        assert_eq!(
            category.to_endpoint_ref(),
            Some(&EndpointRef::new("mistral-small", "ep-support"))
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn field() -> impl Strategy<Value = String> {
            prop_oneof!["", "[ \t\n]{1,3}", "[ ]{0,2}[a-zA-Z0-9-]{1,12}[ ]{0,2}"]
        }

        proptest! {
            #[test]
            fn prop_endpoint_ref_present_iff_valid(
                name in field(),
                model in field(),
                endpoint_id in field(),
            ) {
                let category = Category::new(name.clone(), model.clone(), endpoint_id.clone());
                let expected_valid = !name.trim().is_empty()
                    && !model.trim().is_empty()
                    && !endpoint_id.trim().is_empty();

                prop_assert_eq!(category.is_valid(), expected_valid);
                prop_assert_eq!(category.to_endpoint_ref().is_some(), category.is_valid());
                if let Some(endpoint) = category.to_endpoint_ref() {
                    prop_assert_eq!(endpoint, &EndpointRef::new(model, endpoint_id));
                }
            }

            #[test]
            fn prop_retargeting_follows_new_fields(
                model in field(),
                endpoint_id in field(),
            ) {
                let mut category = Category::new("Billing", "m1", "ep-billing");
                prop_assert!(category.to_endpoint_ref().is_some());

                category.set_target(model.clone(), endpoint_id.clone());

                let expected = (!model.trim().is_empty() && !endpoint_id.trim().is_empty())
                    .then(|| EndpointRef::new(model, endpoint_id));
                prop_assert_eq!(category.to_endpoint_ref(), expected.as_ref());
            }
        }
    }
}
