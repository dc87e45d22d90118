use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use chatrelay_channels::ChatEvent;

use crate::context::RelayContext;
use crate::handlers;

/// Routing rules in precedence order. The first rule whose predicate holds
/// wins; later rules are not consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Text contains the session-reset phrase.
    Reset,
    /// Event was posted in a group.
    Group,
    /// Event is a friend request.
    FriendRequest,
    /// Anything else: a one-to-one message.
    Private,
}

impl Rule {
    pub const ORDER: [Rule; 4] = [Rule::Reset, Rule::Group, Rule::FriendRequest, Rule::Private];

    /// Whether this rule's predicate holds for `event`, taken on its own.
    pub fn matches(self, event: &ChatEvent, reset_phrase: &str) -> bool {
        let is_reset = !reset_phrase.is_empty() && event.content.contains(reset_phrase);
        match self {
            Rule::Reset => is_reset,
            Rule::Group => event.is_group(),
            Rule::FriendRequest => event.is_friend_request(),
            Rule::Private => !(is_reset || event.is_group() || event.is_friend_request()),
        }
    }

    /// First rule in [`Rule::ORDER`] matching `event`.
    pub fn select(event: &ChatEvent, reset_phrase: &str) -> Option<Rule> {
        Self::ORDER
            .into_iter()
            .find(|rule| rule.matches(event, reset_phrase))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rule::Reset => "reset",
            Rule::Group => "group",
            Rule::FriendRequest => "friend_request",
            Rule::Private => "private",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routes each inbound event to exactly one handler.
pub struct Dispatcher<C: RelayContext> {
    ctx: Arc<C>,
}

impl<C: RelayContext + 'static> Dispatcher<C> {
    pub fn new(ctx: Arc<C>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &C {
        &self.ctx
    }

    /// Run the handler of the first matching rule and report which one fired.
    ///
    /// Handler errors are logged, never returned: one bad event must not
    /// affect the caller.
    #[instrument(skip_all, fields(event = %event.id))]
    pub async fn route(&self, event: &ChatEvent) -> Option<Rule> {
        let Some(rule) = Rule::select(event, &self.ctx.config().session_clear) else {
            debug!("no rule matched, dropping event");
            return None;
        };
        debug!(%rule, "rule matched");

        let ctx = self.ctx.as_ref();
        let result = match rule {
            Rule::Reset => handlers::reset(ctx, event).await,
            Rule::Group => handlers::group(ctx, event).await,
            Rule::FriendRequest => handlers::friend_request(ctx, event).await,
            Rule::Private => handlers::private(ctx, event).await,
        };
        if let Err(e) = result {
            warn!(%rule, error = %e, "handler failed");
        }
        Some(rule)
    }

    /// Route `event` on its own Tokio task.
    pub fn spawn_route(self: &Arc<Self>, event: ChatEvent) -> tokio::task::JoinHandle<Option<Rule>> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.route(&event).await })
    }
}
