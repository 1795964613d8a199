//! Request routing
//!
//! - [`router`]: [`PolicyRouter`] orchestrates classification and endpoint selection
//! - [`decision`]: the [`RoutingDecision`] handed to the gateway
//! - [`prompt`]: classification prompt construction
//! - [`normalize`]: mapping raw classifier answers onto category names

pub mod decision;
pub mod normalize;
pub mod prompt;
pub mod router;

pub use decision::{
    RoutingDecision, LLM_ROUTE_CONFIGS, REJECT_ENDPOINT, SUSPEND_DURATION, TARGET_ENDPOINT,
    TARGET_MODEL_ENDPOINT,
};
pub use normalize::{normalize_response, NONE_LABEL};
pub use prompt::build_classification_prompt;
pub use router::{Classification, PolicyRouter, SkipReason};
