//! Routing decision handed back to the gateway
//!
//! A decision is either `Forward` to a concrete endpoint or `Reject`. The
//! gateway consumes it through [`RoutingDecision::to_properties`], which yields
//! the message-context properties the mediation layer sets on each request.

use crate::policy::EndpointRef;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Property naming the selected endpoint id (or [`REJECT_ENDPOINT`])
pub const TARGET_ENDPOINT: &str = "TARGET_ENDPOINT";
/// Value of [`TARGET_ENDPOINT`] when no endpoint could be selected
pub const REJECT_ENDPOINT: &str = "REJECT";
/// Property carrying the selected model endpoint and failover timing
pub const LLM_ROUTE_CONFIGS: &str = "LLM_ROUTE_CONFIGS";
pub const TARGET_MODEL_ENDPOINT: &str = "TARGET_MODEL_ENDPOINT";
pub const SUSPEND_DURATION: &str = "SUSPEND_DURATION";

/// Outcome of routing one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoutingDecision {
    /// Send the request to `endpoint`
    Forward {
        endpoint: EndpointRef,
        /// Backoff the gateway honours before retrying a suspended endpoint
        suspend_duration_millis: u64,
    },
    /// No valid endpoint could be determined
    Reject,
}

impl RoutingDecision {
    pub fn forward(endpoint: EndpointRef, suspend_duration_millis: u64) -> Self {
        RoutingDecision::Forward {
            endpoint,
            suspend_duration_millis,
        }
    }

    pub fn is_forward(&self) -> bool {
        matches!(self, RoutingDecision::Forward { .. })
    }

    pub fn is_reject(&self) -> bool {
        matches!(self, RoutingDecision::Reject)
    }

    /// Selected endpoint if this is a Forward decision
    pub fn endpoint(&self) -> Option<&EndpointRef> {
        match self {
            RoutingDecision::Forward { endpoint, .. } => Some(endpoint),
            RoutingDecision::Reject => None,
        }
    }

    pub fn suspend_duration_millis(&self) -> Option<u64> {
        match self {
            RoutingDecision::Forward {
                suspend_duration_millis,
                ..
            } => Some(*suspend_duration_millis),
            RoutingDecision::Reject => None,
        }
    }

    /// Endpoint id, or `REJECT`
    pub fn target_endpoint(&self) -> &str {
        self.endpoint()
            .map(|endpoint| endpoint.endpoint_id.as_str())
            .unwrap_or(REJECT_ENDPOINT)
    }

    /// Gateway message-context properties for this decision
    pub fn to_properties(&self) -> Map<String, Value> {
        let mut properties = Map::new();
        properties.insert(
            TARGET_ENDPOINT.to_string(),
            Value::String(self.target_endpoint().to_string()),
        );

        if let RoutingDecision::Forward {
            endpoint,
            suspend_duration_millis,
        } = self
        {
            properties.insert(
                LLM_ROUTE_CONFIGS.to_string(),
                json!({
                    TARGET_MODEL_ENDPOINT: endpoint,
                    SUSPEND_DURATION: suspend_duration_millis,
                }),
            );
        }

        properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_decision() {
        let decision = RoutingDecision::forward(EndpointRef::new("m1", "ep-billing"), 30_000);

        assert!(decision.is_forward());
        assert!(!decision.is_reject());
        assert_eq!(decision.target_endpoint(), "ep-billing");
        assert_eq!(decision.suspend_duration_millis(), Some(30_000));
        assert_eq!(decision.endpoint().map(|e| e.model.as_str()), Some("m1"));
    }

    #[test]
    fn test_reject_decision() {
        let decision = RoutingDecision::Reject;

        assert!(decision.is_reject());
        assert!(decision.endpoint().is_none());
        assert_eq!(decision.target_endpoint(), "REJECT");
        assert_eq!(decision.suspend_duration_millis(), None);
    }

    #[test]
    fn test_forward_properties() {
        let decision = RoutingDecision::forward(EndpointRef::new("m0", "ep-default"), 5000);
        let properties = decision.to_properties();

        assert_eq!(properties[TARGET_ENDPOINT], "ep-default");
        assert_eq!(
            properties[LLM_ROUTE_CONFIGS],
            json!({
                "TARGET_MODEL_ENDPOINT": {"model": "m0", "endpointId": "ep-default"},
                "SUSPEND_DURATION": 5000
            })
        );
    }

    #[test]
    fn test_reject_properties() {
        let properties = RoutingDecision::Reject.to_properties();

        assert_eq!(properties.len(), 1);
        assert_eq!(properties[TARGET_ENDPOINT], "REJECT");
    }

    #[test]
    fn test_serialized_shape() {
        let forward = RoutingDecision::forward(EndpointRef::new("m1", "e1"), 0);
        assert_eq!(
            serde_json::to_value(&forward).unwrap(),
            json!({
                "type": "forward",
                "endpoint": {"model": "m1", "endpointId": "e1"},
                "suspend_duration_millis": 0
            })
        );

        assert_eq!(
            serde_json::to_value(RoutingDecision::Reject).unwrap(),
            json!({"type": "reject"})
        );
    }
}
