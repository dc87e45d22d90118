use std::time::Instant;

use tracing::{info, warn};

use chatrelay_core::config::RelayConfig;
use chatrelay_core::types::Turn;

use crate::provider::{ChatRequest, LlmProvider};
use crate::reply::FALLBACK_REPLY;

/// Holds the completion backend and the request parameters.
/// Shared across all event tasks via Arc in the dispatch context.
pub struct AgentRuntime {
    provider: Box<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AgentRuntime {
    pub fn new(provider: Box<dyn LlmProvider>, model: String, max_tokens: u32, temperature: f32) -> Self {
        Self {
            provider,
            model,
            max_tokens,
            temperature,
        }
    }

    /// Runtime with request parameters taken from `config`.
    pub fn from_config(provider: Box<dyn LlmProvider>, config: &RelayConfig) -> Self {
        Self::new(
            provider,
            config.model.clone(),
            config.max_tokens,
            config.temperature,
        )
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask the backend for the next assistant turn.
    ///
    /// Never fails: a backend error becomes an `assistant` turn carrying the
    /// error text, and a response without choices becomes the fallback reply.
    pub async fn complete(&self, turns: &[Turn]) -> Turn {
        let req = ChatRequest {
            model: self.model.clone(),
            messages: turns.to_vec(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        info!(
            model = %req.model, provider = %self.provider.name(),
            turns = req.messages.len(), "processing chat request"
        );

        let started = Instant::now();
        let result = self.provider.send(&req).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(resp) => {
                info!(
                    latency_ms,
                    tokens_in = resp.tokens_in,
                    tokens_out = resp.tokens_out,
                    stop_reason = %resp.stop_reason,
                    "completion received"
                );
                match resp.content {
                    Some(content) => Turn::assistant(content),
                    None => {
                        warn!("completion returned no choices");
                        Turn::assistant(FALLBACK_REPLY)
                    }
                }
            }
            Err(e) => {
                warn!(latency_ms, error = %e, provider = %self.provider.name(), "completion failed");
                Turn::assistant(e.to_string())
            }
        }
    }
}
