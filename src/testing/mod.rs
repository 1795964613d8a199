//! Testing utilities and mock implementations
//!
//! Mock classifiers and LLM providers for exercising the router without a
//! live model endpoint.

pub mod mocks;

pub use mocks::*;
