//! Outbound actions to the chat-account bridge: POST {callback_url}.
//!
//! The bridge owns the chat session; the relay only tells it what to send
//! and which friend requests to accept.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use chatrelay_channels::{ChannelError, ChatEvent, Target, Transport};
use chatrelay_core::config::BridgeConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct SendText<'a> {
    action: &'static str,
    #[serde(flatten)]
    target: &'a Target,
    text: &'a str,
}

#[derive(Serialize)]
struct AcceptFriend<'a> {
    action: &'static str,
    event_id: &'a str,
}

/// [`Transport`] that posts JSON actions to the bridge's callback URL.
pub struct HttpTransport {
    client: reqwest::Client,
    callback_url: Option<String>,
    callback_token: Option<String>,
}

impl HttpTransport {
    pub fn new(bridge: &BridgeConfig) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChannelError::ConfigError(e.to_string()))?;
        if bridge.callback_url.is_none() {
            warn!("bridge.callback_url is not set, replies will be dropped");
        }
        Ok(Self {
            client,
            callback_url: bridge.callback_url.clone(),
            callback_token: bridge.callback_token.clone(),
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, body: &T) -> Result<(), ChannelError> {
        let url = self
            .callback_url
            .as_deref()
            .ok_or_else(|| ChannelError::ConfigError("bridge.callback_url is not set".into()))?;

        let mut req = self.client.post(url).json(body);
        if let Some(token) = &self.callback_token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ChannelError::Timeout {
                    ms: REQUEST_TIMEOUT.as_millis() as u64,
                }
            } else {
                ChannelError::SendFailed(e.to_string())
            }
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ChannelError::AuthFailed(format!("bridge answered {status}")));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed(format!("bridge answered {status}: {text}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http-bridge"
    }

    async fn send_text(&self, target: &Target, text: &str) -> Result<(), ChannelError> {
        self.post(&SendText {
            action: "send_text",
            target,
            text,
        })
        .await?;
        debug!(?target, chars = text.chars().count(), "text delivered to bridge");
        Ok(())
    }

    async fn accept_friend_request(&self, event: &ChatEvent) -> Result<(), ChannelError> {
        self.post(&AcceptFriend {
            action: "accept_friend",
            event_id: &event.id,
        })
        .await
    }
}
