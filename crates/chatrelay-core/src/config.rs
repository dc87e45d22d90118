use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Json, Toml},
    Figment, Provider,
};
use serde::{Deserialize, Serialize};

// Upper bound the completion API accepts for a single reply.
pub const MAX_TOKENS_CAP: u32 = 2048;
/// Longest accepted session timeout: 30 days.
pub const MAX_SESSION_TIMEOUT_SECS: u64 = 30 * 24 * 60 * 60;
pub const DEFAULT_PORT: u16 = 18790;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_CONFIG_PATH: &str = "chatrelay.toml";
pub const ENV_PREFIX: &str = "CHATRELAY_";

/// Built-in persona used as the first `system` turn of every new session.
pub const DEFAULT_PERSONA: &str = "我是一个专注于不标准普通话的小学课本小明";

/// Top-level config (chatrelay.toml or config.json + CHATRELAY_* env overrides).
///
/// The relay options are flat, so a legacy single-file bot config
/// (`api_key`, `session_timeout`, `ignores`, ...) loads unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Completion API key. `None` starts the relay with a provider that
    /// answers every question with a configuration error.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// HTTP(S) or SOCKS5 proxy for completion requests.
    #[serde(default)]
    pub proxy: Option<String>,
    /// Accept friend requests automatically.
    #[serde(default = "bool_true")]
    pub auto_pass: bool,
    /// Inactivity window after which a conversation is forgotten.
    #[serde(default = "default_session_timeout", alias = "session_timeout")]
    pub session_timeout_secs: u64,
    /// How often expired sessions are swept from memory.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Prepended to every private reply.
    #[serde(default)]
    pub reply_prefix: String,
    /// Phrase that wipes the sender's conversation.
    #[serde(default = "default_session_clear")]
    pub session_clear: String,
    /// Senders or groups whose names contain any of these are ignored.
    #[serde(default)]
    pub ignores: Vec<String>,
    #[serde(default = "default_persona")]
    pub persona: String,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

/// HTTP surface shared with the chat-account bridge process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Bearer token the bridge must present on `POST /events`.
    /// `None` disables authentication (loopback deployments only).
    #[serde(default)]
    pub token: Option<String>,
    /// Where outbound actions (send text, accept friend) are posted.
    #[serde(default)]
    pub callback_url: Option<String>,
    /// Bearer token sent along with outbound actions.
    #[serde(default)]
    pub callback_token: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            token: None,
            callback_url: None,
            callback_token: None,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            proxy: None,
            auto_pass: true,
            session_timeout_secs: default_session_timeout(),
            sweep_interval_secs: default_sweep_interval(),
            max_tokens: default_max_tokens(),
            model: default_model(),
            temperature: default_temperature(),
            reply_prefix: String::new(),
            session_clear: default_session_clear(),
            ignores: Vec::new(),
            persona: default_persona(),
            bridge: BridgeConfig::default(),
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_session_timeout() -> u64 {
    900
}
fn default_sweep_interval() -> u64 {
    300
}
fn default_max_tokens() -> u32 {
    512
}
fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_temperature() -> f32 {
    1.0
}
fn default_session_clear() -> String {
    "下一个问题".to_string()
}
fn default_persona() -> String {
    DEFAULT_PERSONA.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

impl RelayConfig {
    /// Load config from a TOML or JSON file with CHATRELAY_* env var overrides.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        Self::load_with(config_path, Figment::new())
    }

    /// Same as [`RelayConfig::load`], then merges `overrides` on top
    /// (the gateway passes its command-line flags here).
    ///
    /// Precedence, lowest first:
    ///   1. built-in defaults
    ///   2. config file (`.json` parsed as JSON, anything else as TOML)
    ///   3. `CHATRELAY_*` env vars, `__` separating nested keys
    ///   4. `overrides`
    ///
    /// An explicitly named file that does not exist is an error; the
    /// default `chatrelay.toml` is optional.
    pub fn load_with<P: Provider>(
        config_path: Option<&str>,
        overrides: P,
    ) -> crate::error::Result<Self> {
        let path = match config_path {
            Some(p) => {
                if !Path::new(p).exists() {
                    return Err(crate::error::RelayError::Config(format!(
                        "config file not found: {p}"
                    )));
                }
                p.to_string()
            }
            None => DEFAULT_CONFIG_PATH.to_string(),
        };

        let figment = if is_json(&path) {
            Figment::new().merge(Json::file(&path))
        } else {
            Figment::new().merge(Toml::file(&path))
        };

        let config: RelayConfig = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(overrides)
            .extract()
            .map_err(|e| crate::error::RelayError::Config(e.to_string()))?;

        tracing::debug!(path = %path, "configuration loaded");
        config.validated()
    }

    /// Clamp `max_tokens` to [`MAX_TOKENS_CAP`] and reject nonsensical values.
    pub fn validated(mut self) -> crate::error::Result<Self> {
        if self.max_tokens > MAX_TOKENS_CAP {
            tracing::warn!(
                requested = self.max_tokens,
                cap = MAX_TOKENS_CAP,
                "max_tokens above cap, clamping"
            );
            self.max_tokens = MAX_TOKENS_CAP;
        }
        if self.max_tokens == 0 {
            return Err(crate::error::RelayError::Config(
                "max_tokens must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(crate::error::RelayError::Config(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        if self.session_timeout_secs == 0 {
            return Err(crate::error::RelayError::Config(
                "session_timeout must be at least 1 second".to_string(),
            ));
        }
        if self.session_timeout_secs > MAX_SESSION_TIMEOUT_SECS {
            return Err(crate::error::RelayError::Config(format!(
                "session_timeout must be at most {MAX_SESSION_TIMEOUT_SECS} seconds, got {}",
                self.session_timeout_secs
            )));
        }
        Ok(self)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

fn is_json(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
