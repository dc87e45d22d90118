//! Prompt construction and completion backend for chatrelay.
//!
//! The pipeline for one inbound message is:
//! [`normalize`] the raw text → [`prompt::PromptBuilder::build_turns`] →
//! [`runtime::AgentRuntime::complete`] → [`prompt::PromptBuilder::remember`]
//! → [`reply`] formatting.

pub mod normalize;
pub mod openai;
pub mod prompt;
pub mod provider;
pub mod reply;
pub mod runtime;

pub use normalize::normalize;
pub use prompt::PromptBuilder;
pub use provider::{LlmProvider, ProviderError};
pub use runtime::AgentRuntime;
