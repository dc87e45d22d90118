use async_trait::async_trait;

use chatrelay_core::types::Turn;

/// Request to a completion backend.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    /// Full conversation, persona `system` turn first.
    pub messages: Vec<Turn>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Response from a completion backend.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Text of the first choice. `None` when the backend returned no choices.
    pub content: Option<String>,
    pub model: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub stop_reason: String,
}

/// Common interface for completion backends.
///
/// Given the ordered turns of a conversation, produce the next assistant
/// reply or fail. Implementations must be cheap to share across tasks.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging and error messages.
    fn name(&self) -> &str;

    /// Send a chat request and wait for the full response.
    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// Placeholder provider when no API key is configured.
///
/// Every request fails, which the runtime turns into a visible chat reply
/// telling the operator what is missing.
pub struct NullProvider;

#[async_trait]
impl LlmProvider for NullProvider {
    fn name(&self) -> &str {
        "null"
    }

    async fn send(&self, _req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        Err(ProviderError::Unavailable(
            "no completion API key configured, set api_key in chatrelay.toml".into(),
        ))
    }
}
