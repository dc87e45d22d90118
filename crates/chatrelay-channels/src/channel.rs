use async_trait::async_trait;

use crate::{
    error::ChannelError,
    types::{ChatEvent, Target},
};

/// Outbound side of the chat network.
///
/// Implementations must be `Send + Sync` so one instance can be shared by
/// every event task.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Stable lowercase identifier for logging (e.g. `"http-bridge"`).
    fn name(&self) -> &str;

    /// Deliver `text` to `target`.
    async fn send_text(&self, target: &Target, text: &str) -> Result<(), ChannelError>;

    /// Accept the friend request carried by `event`.
    async fn accept_friend_request(&self, event: &ChatEvent) -> Result<(), ChannelError>;
}
