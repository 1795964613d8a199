//! LLM provider abstraction layer
//!
//! Provides the chat-completion interface the classifier is built on, with an
//! OpenAI-compatible HTTP implementation.

pub mod provider;
pub mod providers;

pub use provider::*;
pub use providers::*;
