//! Observability: structured logging and routing metrics

pub mod logging;
pub mod metrics;

// Re-export for convenience
pub use logging::{init_default_logging, init_logging, LogFormat};
pub use metrics::{metrics, MetricsCollector, MetricsSnapshot};

// Span macros for structured logging
pub use logging::{classify_span, route_span};
