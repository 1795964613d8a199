//! Policy router: classification and endpoint selection
//!
//! One call to [`PolicyRouter::route`] decides where a single request goes:
//!
//! ```text
//! RoutingPolicy ─► DeploymentPolicy (by environment)
//!                     │
//!                     ├─ no categories / no content / classifier down ─► default endpoint
//!                     │
//!                     └─ prompt ─► Classifier ─► normalize ─► select_endpoint(label)
//!                                                                │
//!                                              Forward{endpoint} ◄┴► Reject
//! ```
//!
//! Classification is best-effort. Every classifier failure, timeout or
//! unmatched answer degrades to default-endpoint routing. Only an unreadable
//! policy document is an error, and only from [`PolicyRouter::route_document`].

use super::decision::RoutingDecision;
use super::normalize::normalize_response;
use super::prompt::build_classification_prompt;
use crate::classifier::{Classifier, ClassifierError, DisabledClassifier, LlmClassifier};
use crate::config::{ClassifierSection, ConfigError, GatewayConfig};
use crate::error::{RouteError, RouteResult};
use crate::llm::providers::{OpenAiCompatConfig, OpenAiCompatProvider};
use crate::observability::metrics::metrics;
use crate::policy::{DeploymentPolicy, Environment, RoutingPolicy};
use crate::{classify_span, route_span};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn, Instrument};

/// Why classification was not attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The deployment has no valid categories
    NoCategories,
    /// Request content is absent or blank
    NoContent,
    /// The classifier reported itself unavailable
    ClassifierUnavailable,
}

/// Outcome of the classification step
#[derive(Debug, Clone)]
pub enum Classification {
    /// The classifier named one of the deployment's categories
    Matched(String),
    /// The classifier answered, but with NONE or nothing recognisable
    NoCategory,
    Skipped(SkipReason),
    /// The classifier failed or timed out
    Failed(ClassifierError),
}

impl Classification {
    /// Label handed to endpoint selection; only a match carries one
    pub fn label(&self) -> Option<&str> {
        match self {
            Classification::Matched(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Classification::Matched(_))
    }
}

/// Routes requests according to a [`RoutingPolicy`]
pub struct PolicyRouter {
    classifier: Arc<dyn Classifier>,
    classification_timeout: Option<Duration>,
}

impl PolicyRouter {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier,
            classification_timeout: None,
        }
    }

    /// Router that always takes the default-only path
    pub fn without_classifier() -> Self {
        Self::new(Arc::new(DisabledClassifier))
    }

    /// Bound each classifier call; a late answer counts as a failure
    pub fn with_classification_timeout(mut self, timeout: Duration) -> Self {
        self.classification_timeout = Some(timeout);
        self
    }

    /// Build a router from gateway configuration
    ///
    /// Without an enabled `[classifier]` section the router never classifies.
    pub fn from_config(config: &GatewayConfig) -> RouteResult<Self> {
        let Some(section) = config.classifier.as_ref().filter(|c| c.enabled) else {
            info!("Classification disabled; routing to default endpoints only");
            return Ok(Self::without_classifier());
        };

        let mut provider_config = OpenAiCompatConfig::new(section.base_url.clone())
            .with_timeout_ms(section.timeout_ms)
            .with_retry_attempts(section.retry_attempts);
        if let Some(api_key) = config.get_classifier_api_key()? {
            provider_config = provider_config.with_api_key(api_key);
        }

        let provider = OpenAiCompatProvider::new(provider_config)
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;

        let classifier = LlmClassifier::new(Arc::new(provider), section.model.clone())
            .with_temperature(section.temperature)
            .with_max_tokens(section.max_tokens);

        info!(
            base_url = %section.base_url,
            model = %section.model,
            timeout_ms = section.timeout_ms,
            retry_attempts = section.retry_attempts,
            "Classifier configured"
        );

        Ok(Self::new(Arc::new(classifier))
            .with_classification_timeout(classification_budget(section)))
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    pub fn classification_timeout(&self) -> Option<Duration> {
        self.classification_timeout
    }

    /// Ask the classifier backend whether it is reachable
    ///
    /// A classifier that is not available is reported as such without a call.
    pub async fn check_classifier(&self) -> Result<(), ClassifierError> {
        if !self.classifier.is_available() {
            return Err(ClassifierError::Unavailable(format!(
                "classifier '{}' is not available",
                self.classifier.name()
            )));
        }
        self.classifier.health_check().await
    }

    /// Run the classification step for one request against `deployment`
    pub async fn classify(
        &self,
        deployment: &DeploymentPolicy,
        content: Option<&str>,
    ) -> Classification {
        let available = deployment.available_categories();
        if available.is_empty() {
            return skipped(SkipReason::NoCategories);
        }

        let Some(content) = content.filter(|c| !c.trim().is_empty()) else {
            return skipped(SkipReason::NoContent);
        };

        if !self.classifier.is_available() {
            return skipped(SkipReason::ClassifierUnavailable);
        }

        let prompt = build_classification_prompt(deployment, content);
        debug!(categories = available.len(), prompt = %prompt, "Built classification prompt");

        let span = classify_span!(classifier = %self.classifier.name());
        let started = Instant::now();
        let result = self.call_classifier(&prompt).instrument(span).await;
        let latency = started.elapsed();

        match result {
            Ok(raw) => match normalize_response(Some(&raw), &available) {
                Some(name) => {
                    debug!(raw = %raw.trim(), category = %name, "Classifier label matched");
                    metrics().classification_matched(latency);
                    Classification::Matched(name.to_string())
                }
                None => {
                    debug!(raw = %raw.trim(), "Classifier label matched no category");
                    metrics().classification_no_category(latency);
                    Classification::NoCategory
                }
            },
            Err(e) => {
                warn!(
                    classifier = %self.classifier.name(),
                    error = %e,
                    latency_ms = latency.as_millis() as u64,
                    "Classification failed; falling back to default endpoint"
                );
                metrics().classification_failed(latency);
                Classification::Failed(e)
            }
        }
    }

    async fn call_classifier(&self, prompt: &str) -> Result<String, ClassifierError> {
        match self.classification_timeout {
            Some(limit) => tokio::time::timeout(limit, self.classifier.classify(prompt))
                .await
                .unwrap_or_else(|_| {
                    Err(ClassifierError::Timeout(format!(
                        "no answer within {}ms",
                        limit.as_millis()
                    )))
                }),
            None => self.classifier.classify(prompt).await,
        }
    }

    /// Decide where a request goes; never fails
    pub async fn route(
        &self,
        policy: &RoutingPolicy,
        environment: Environment,
        content: Option<&str>,
    ) -> RoutingDecision {
        let span = route_span!(environment = %environment);
        self.route_inner(policy, environment, content)
            .instrument(span)
            .await
    }

    async fn route_inner(
        &self,
        policy: &RoutingPolicy,
        environment: Environment,
        content: Option<&str>,
    ) -> RoutingDecision {
        metrics().request_received();

        let Some(deployment) = policy.deployment(environment) else {
            info!(%environment, "No deployment configured for environment; rejecting");
            metrics().request_rejected();
            return RoutingDecision::Reject;
        };

        let classification = self.classify(deployment, content).await;
        let label = classification.label();

        match deployment.select_endpoint(label) {
            Some(endpoint) => {
                info!(
                    %environment,
                    category = label.unwrap_or("-"),
                    model = %endpoint.model,
                    endpoint_id = %endpoint.endpoint_id,
                    "Routing request"
                );
                metrics().request_forwarded(&endpoint.endpoint_id);
                RoutingDecision::forward(endpoint.clone(), policy.suspend_duration_millis())
            }
            None => {
                info!(
                    %environment,
                    category = label.unwrap_or("-"),
                    "No valid endpoint; rejecting"
                );
                metrics().request_rejected();
                RoutingDecision::Reject
            }
        }
    }

    /// Parse `document` and route; an unreadable document is a hard failure
    pub async fn route_document(
        &self,
        document: &str,
        environment: Environment,
        content: Option<&str>,
    ) -> RouteResult<RoutingDecision> {
        let policy = RoutingPolicy::from_json(document).map_err(|e| {
            error!(error = %e, "Invalid routing policy");
            metrics().configuration_error();
            RouteError::from(e)
        })?;

        Ok(self.route(&policy, environment, content).await)
    }
}

fn skipped(reason: SkipReason) -> Classification {
    debug!(?reason, "Skipping classification");
    metrics().classification_skipped();
    Classification::Skipped(reason)
}

/// Upper bound for one classification including provider retries and backoff
fn classification_budget(section: &ClassifierSection) -> Duration {
    let attempts = section.retry_attempts as u64 + 1;
    let backoff_ms: u64 = (1..attempts).map(|a| 100u64 << (a - 1).min(16)).sum();
    Duration::from_millis(
        section
            .timeout_ms
            .saturating_mul(attempts)
            .saturating_add(backoff_ms),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Category, EndpointRef};
    use crate::testing::mocks::{MockClassifier, MockOutcome};

    fn deployment() -> DeploymentPolicy {
        DeploymentPolicy::new(
            Some(EndpointRef::new("m0", "ep-default")),
            vec![
                Category::new("Billing", "m1", "ep-billing").with_context("payment questions"),
                Category::new("Support", "m2", "ep-support"),
            ],
        )
    }

    fn policy() -> RoutingPolicy {
        RoutingPolicy {
            production: Some(deployment()),
            sandbox: None,
            suspend_duration: 30,
        }
    }

    fn router(classifier: MockClassifier) -> (PolicyRouter, Arc<MockClassifier>) {
        let classifier = Arc::new(classifier);
        (PolicyRouter::new(classifier.clone()), classifier)
    }

    #[tokio::test]
    async fn test_matched_category() {
        let (router, _) = router(MockClassifier::returning("Billing"));
        let decision = router
            .route(&policy(), Environment::Production, Some("Where is my invoice?"))
            .await;

        assert_eq!(decision.target_endpoint(), "ep-billing");
        assert_eq!(decision.suspend_duration_millis(), Some(30_000));
    }

    #[tokio::test]
    async fn test_fuzzy_label() {
        let (router, _) = router(MockClassifier::returning("The category is: support."));
        let decision = router
            .route(&policy(), Environment::Production, Some("My app crashes"))
            .await;

        assert_eq!(decision.target_endpoint(), "ep-support");
    }

    #[tokio::test]
    async fn test_none_falls_back_to_default() {
        let (router, _) = router(MockClassifier::returning("NONE"));
        let decision = router
            .route(&policy(), Environment::Production, Some("hello"))
            .await;

        assert_eq!(decision.target_endpoint(), "ep-default");
    }

    #[tokio::test]
    async fn test_classifier_failure_falls_back_to_default() {
        let (router, classifier) = router(MockClassifier::failing(ClassifierError::Network(
            "connection refused".into(),
        )));
        let decision = router
            .route(&policy(), Environment::Production, Some("hello"))
            .await;

        assert_eq!(classifier.call_count(), 1);
        assert_eq!(decision.target_endpoint(), "ep-default");
    }

    #[tokio::test]
    async fn test_unavailable_classifier_is_not_called() {
        let (router, classifier) = router(MockClassifier::unavailable());
        let classification = router.classify(&deployment(), Some("hello")).await;

        assert!(matches!(
            classification,
            Classification::Skipped(SkipReason::ClassifierUnavailable)
        ));
        assert_eq!(classifier.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_content_skips_classification() {
        let (router, classifier) = router(MockClassifier::returning("Billing"));

        for content in [None, Some(""), Some("  \n")] {
            let classification = router.classify(&deployment(), content).await;
            assert!(matches!(
                classification,
                Classification::Skipped(SkipReason::NoContent)
            ));
        }
        assert_eq!(classifier.call_count(), 0);
    }

    #[tokio::test]
    async fn test_no_valid_categories_skips_classification() {
        let (router, classifier) = router(MockClassifier::returning("Billing"));
        let deployment = DeploymentPolicy::new(
            Some(EndpointRef::new("m0", "ep-default")),
            vec![Category::new("Billing", "", "ep-billing")],
        );

        let classification = router.classify(&deployment, Some("invoice")).await;
        assert!(matches!(
            classification,
            Classification::Skipped(SkipReason::NoCategories)
        ));
        assert_eq!(classifier.call_count(), 0);
    }

    #[tokio::test]
    async fn test_prompt_reaches_classifier() {
        let (router, classifier) = router(MockClassifier::returning("Billing"));
        router.classify(&deployment(), Some("Where is my invoice?")).await;

        let prompts = classifier.get_prompts().await;
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("- Billing - payment questions\n- Support"));
        assert!(prompts[0].contains("Respond with ONLY one of these category names: Billing, Support"));
        assert!(prompts[0].ends_with("Request: Where is my invoice?"));
    }

    #[tokio::test]
    async fn test_classification_timeout() {
        let (router, _) = router(
            MockClassifier::returning("Billing").with_delay(Duration::from_millis(500)),
        );
        let router = router.with_classification_timeout(Duration::from_millis(20));

        let classification = router.classify(&deployment(), Some("invoice")).await;
        assert!(matches!(
            classification,
            Classification::Failed(ClassifierError::Timeout(_))
        ));

        let decision = router
            .route(&policy(), Environment::Production, Some("invoice"))
            .await;
        assert_eq!(decision.target_endpoint(), "ep-default");
    }

    #[tokio::test]
    async fn test_missing_environment_rejects() {
        let (router, classifier) = router(MockClassifier::returning("Billing"));
        let decision = router
            .route(&policy(), Environment::Sandbox, Some("invoice"))
            .await;

        assert!(decision.is_reject());
        assert_eq!(classifier.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unmatched_label_without_default_rejects() {
        let (router, _) = router(MockClassifier::new(vec![MockOutcome::Label(
            "Shipping".into(),
        )]));
        let policy = RoutingPolicy {
            production: Some(DeploymentPolicy::new(
                None,
                vec![Category::new("Billing", "m1", "ep-billing")],
            )),
            ..Default::default()
        };

        let decision = router
            .route(&policy, Environment::Production, Some("where is my parcel"))
            .await;
        assert!(decision.is_reject());
    }

    #[tokio::test]
    async fn test_route_document_rejects_bad_policy() {
        let router = PolicyRouter::without_classifier();

        for document in ["", "null", "{not json", r#"{"suspendDuration": -1}"#] {
            let result = router
                .route_document(document, Environment::Production, Some("hi"))
                .await;
            assert!(
                matches!(result, Err(RouteError::Configuration(_))),
                "document {document:?} should be a configuration error"
            );
        }
    }

    #[tokio::test]
    async fn test_route_document_routes() {
        let router = PolicyRouter::without_classifier();
        let document = r#"{"production": {"defaultModel": {"model": "gpt", "endpointId": "ep-default"}}}"#;

        let decision = router
            .route_document(document, Environment::Production, Some("hello"))
            .await
            .unwrap();
        assert_eq!(decision, RoutingDecision::forward(EndpointRef::new("gpt", "ep-default"), 0));
    }

    #[test]
    fn test_classification_label() {
        assert_eq!(Classification::Matched("Billing".into()).label(), Some("Billing"));
        assert_eq!(Classification::NoCategory.label(), None);
        assert_eq!(Classification::Skipped(SkipReason::NoContent).label(), None);
        assert_eq!(
            Classification::Failed(ClassifierError::Timeout("x".into())).label(),
            None
        );
    }

    #[test]
    fn test_from_config_without_classifier() {
        let config = GatewayConfig::with_policy("policy.json", Environment::Production);
        let router = PolicyRouter::from_config(&config).unwrap();

        assert_eq!(router.classifier_name(), "disabled");
        assert!(router.classification_timeout().is_none());
    }

    #[test]
    fn test_from_config_with_classifier() {
        let config = GatewayConfig::from_toml(
            r#"
[policy]
path = "policy.json"

[classifier]
base_url = "http://localhost:8000/v1"
model = "local-model"
timeout_ms = 1000
retry_attempts = 2
"#,
        )
        .unwrap();

        let router = PolicyRouter::from_config(&config).unwrap();
        assert_eq!(router.classifier_name(), "openai-compatible");
        // 3 attempts of 1000ms plus 100ms and 200ms of backoff
        assert_eq!(
            router.classification_timeout(),
            Some(Duration::from_millis(3300))
        );
    }

    #[test]
    fn test_from_config_missing_api_key() {
        let config = GatewayConfig::from_toml(
            r#"
[policy]
path = "policy.json"

[classifier]
base_url = "http://localhost:8000/v1"
model = "local-model"
api_key_env = "LLMROUTE_ROUTER_TEST_UNSET_KEY"
"#,
        )
        .unwrap();

        assert!(matches!(
            PolicyRouter::from_config(&config),
            Err(RouteError::Config(ConfigError::EnvVarNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_blank_answer_selects_first_category() {
        let (router, _) = router(MockClassifier::returning("  "));

        let classification = router.classify(&deployment(), Some("hello")).await;

        assert_eq!(classification.label(), Some("Billing"));
    }

    #[tokio::test]
    async fn test_check_classifier() {
        let (healthy, classifier) = router(MockClassifier::returning("Billing"));
        assert!(healthy.check_classifier().await.is_ok());
        assert_eq!(classifier.call_count(), 0);

        let (unavailable, _) = router(MockClassifier::unavailable());
        assert!(matches!(
            unavailable.check_classifier().await,
            Err(ClassifierError::Unavailable(_))
        ));
        assert!(matches!(
            PolicyRouter::without_classifier().check_classifier().await,
            Err(ClassifierError::Unavailable(_))
        ));
    }
}
