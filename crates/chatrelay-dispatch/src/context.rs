//! Shared context interface for the event handlers.
//!
//! Handlers only see [`RelayContext`]; the gateway builds a
//! [`DispatchContext`] at startup and tests can build one around a
//! recording transport.

use std::sync::Arc;

use chatrelay_agent::{AgentRuntime, PromptBuilder};
use chatrelay_channels::Transport;
use chatrelay_core::config::RelayConfig;
use chatrelay_sessions::SessionStore;

/// Everything a handler needs to answer one event.
pub trait RelayContext: Send + Sync {
    fn agent(&self) -> &AgentRuntime;
    fn sessions(&self) -> &SessionStore;
    fn prompt(&self) -> &PromptBuilder;
    fn config(&self) -> &RelayConfig;
    fn transport(&self) -> &dyn Transport;
}

/// Default [`RelayContext`] assembled in `main`.
pub struct DispatchContext {
    agent: AgentRuntime,
    sessions: Arc<SessionStore>,
    prompt: PromptBuilder,
    config: RelayConfig,
    transport: Arc<dyn Transport>,
}

impl DispatchContext {
    /// The prompt builder is derived from `config.persona`.
    pub fn new(
        agent: AgentRuntime,
        sessions: Arc<SessionStore>,
        config: RelayConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            agent,
            sessions,
            prompt: PromptBuilder::new(config.persona.as_str()),
            config,
            transport,
        }
    }
}

impl RelayContext for DispatchContext {
    fn agent(&self) -> &AgentRuntime {
        &self.agent
    }

    fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    fn prompt(&self) -> &PromptBuilder {
        &self.prompt
    }

    fn config(&self) -> &RelayConfig {
        &self.config
    }

    fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }
}
