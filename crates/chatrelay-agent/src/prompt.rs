use tracing::debug;

use chatrelay_core::config::DEFAULT_PERSONA;
use chatrelay_core::types::{Turn, UserId};
use chatrelay_sessions::SessionStore;

/// Assembles the turn sequence sent to the completion backend.
///
/// A fresh conversation opens with a single `system` turn carrying the
/// persona. Subsequent messages extend whatever the session store holds.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    persona: String,
}

impl PromptBuilder {
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
        }
    }

    /// Build the request turns for `normalized`, the cleaned user text.
    ///
    /// Reads the store but never writes it; see [`PromptBuilder::remember`].
    pub fn build_turns(&self, store: &SessionStore, user_id: &UserId, normalized: &str) -> Vec<Turn> {
        let mut turns = match store.get(user_id) {
            Some(history) => history,
            None => {
                debug!(user = %user_id, "starting new conversation");
                vec![Turn::system(self.persona.as_str())]
            }
        };
        turns.push(Turn::user(normalized));
        turns
    }

    /// Persist `turns` (as returned by [`build_turns`](Self::build_turns))
    /// plus the backend's `reply`, restarting the session's expiry window.
    pub fn remember(&self, store: &SessionStore, user_id: &UserId, mut turns: Vec<Turn>, reply: Turn) {
        turns.push(reply);
        store.set(user_id, turns);
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PERSONA)
    }
}
