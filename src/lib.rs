//! llmroute - content-aware routing for LLM API gateways
//!
//! Decides which backend model endpoint should serve an inbound LLM API
//! request. A JSON routing policy maps named categories to endpoints per
//! environment; an optional classifier labels the request text, and the label
//! selects the endpoint. Anything that goes wrong with classification falls
//! back to the environment's default endpoint.
//!
//! # Overview
//!
//! - [`policy`]: the routing policy data model and document parsing
//! - [`routing`]: [`PolicyRouter`], prompt construction, label normalisation
//!   and the [`RoutingDecision`] handed to the gateway
//! - [`classifier`]: the [`Classifier`] trait and an LLM-backed implementation
//! - [`llm`]: OpenAI-compatible chat-completions client used by the classifier
//! - [`extract`]: pulls the request text out of a chat-style JSON body
//!
//! # Quick Start
//!
//! ```rust
//! use llmroute::{Environment, PolicyRouter, RoutingPolicy};
//!
//! # tokio_test::block_on(async {
//! let policy = RoutingPolicy::from_json(r#"{
//!     "production": {
//!         "defaultModel": {"model": "gpt-4o-mini", "endpointId": "ep-default"}
//!     },
//!     "suspendDuration": 30
//! }"#).unwrap();
//!
//! let router = PolicyRouter::without_classifier();
//! let decision = router.route(&policy, Environment::Production, Some("hello")).await;
//!
//! assert_eq!(decision.target_endpoint(), "ep-default");
//! assert_eq!(decision.suspend_duration_millis(), Some(30_000));
//! # });
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod observability;
pub mod policy;
pub mod routing;
pub mod testing;

pub use classifier::{Classifier, ClassifierError, DisabledClassifier, LlmClassifier};
pub use config::{ConfigError, GatewayConfig};
pub use error::{FaultCode, MediationFault, RouteError, RouteResult};
pub use extract::extract_request_content;
pub use policy::{Category, DeploymentPolicy, EndpointRef, Environment, PolicyError, RoutingPolicy};
pub use routing::{Classification, PolicyRouter, RoutingDecision, SkipReason};
