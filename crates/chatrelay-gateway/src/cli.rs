use clap::Parser;
use figment::providers::Serialized;
use serde::Serialize;

/// Command-line surface. Every option is optional and, when given, wins
/// over the config file and `CHATRELAY_*` env vars.
#[derive(Debug, Parser)]
#[command(name = "chatrelay", version, about = "Chat-event relay to a completion API")]
pub struct Cli {
    /// Config file (`.toml` or `.json`). Defaults to ./chatrelay.toml when present.
    #[arg(long = "conf", short = 'c', env = "CHATRELAY_CONFIG")]
    pub conf: Option<String>,

    /// Completion API key.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Accept friend requests automatically.
    #[arg(long)]
    pub auto_pass: Option<bool>,

    /// Seconds of inactivity before a conversation is forgotten.
    #[arg(long, value_name = "SECS")]
    pub session_timeout: Option<u64>,

    /// Reply length limit in tokens (capped at 2048).
    #[arg(long)]
    pub max_tokens: Option<u32>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub temperature: Option<f32>,

    /// Prepended to every private reply.
    #[arg(long)]
    pub reply_prefix: Option<String>,

    /// Phrase that wipes the sender's conversation.
    #[arg(long)]
    pub session_clear: Option<String>,

    /// Comma-separated name fragments of senders or groups to ignore.
    #[arg(long, value_delimiter = ',')]
    pub ignores: Option<Vec<String>>,

    /// Proxy for completion requests (http://, https:// or socks5://).
    #[arg(long)]
    pub proxy: Option<String>,

    /// Address the bridge endpoint binds to.
    #[arg(long)]
    pub bind: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Serialize)]
struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    auto_pass: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_clear: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ignores: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxy: Option<String>,
    bridge: BridgeOverrides,
}

#[derive(Debug, Default, Serialize)]
struct BridgeOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    bind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
}

impl Cli {
    /// Flags given on the command line as a figment layer.
    pub fn overrides(&self) -> Serialized<impl Serialize> {
        Serialized::defaults(Overrides {
            api_key: self.api_key.clone(),
            auto_pass: self.auto_pass,
            session_timeout_secs: self.session_timeout,
            max_tokens: self.max_tokens,
            model: self.model.clone(),
            temperature: self.temperature,
            reply_prefix: self.reply_prefix.clone(),
            session_clear: self.session_clear.clone(),
            ignores: self.ignores.clone(),
            proxy: self.proxy.clone(),
            bridge: BridgeOverrides {
                bind: self.bind.clone(),
                port: self.port,
            },
        })
    }
}
