//! One handler per [`Rule`](crate::Rule).
//!
//! Handlers never fail the dispatcher. Lookup and transport problems come
//! back as [`DispatchError`] and are logged by the caller. A backend failure
//! is not an error here: it arrives as an assistant turn carrying the error
//! text and is answered like any other reply.

use tracing::{debug, info};

use chatrelay_agent::normalize;
use chatrelay_agent::reply::{format_group_reply, format_private_reply};
use chatrelay_channels::{ChatEvent, Contact, Target, FILE_HELPER};

use crate::context::RelayContext;
use crate::error::DispatchError;
use crate::ignore::is_ignored;

/// Sent after a conversation has been forgotten.
pub const RESET_CONFIRMATION: &str = "上下文已清空，请开始下一个问题吧";

/// Clear the author's session and confirm.
pub async fn reset<C: RelayContext>(ctx: &C, event: &ChatEvent) -> Result<(), DispatchError> {
    let author = event.author().ok_or(lookup_target(event))?;
    if is_ignored(&ctx.config().ignores, author) || group_ignored(ctx, event) {
        debug!(user = %author.id, "reset from ignored contact");
        return Ok(());
    }

    let cleared = ctx.sessions().clear(&author.user_id());
    info!(user = %author.id, nick = %author.nick_name, cleared, "session reset");

    let Some(target) = reply_target(event, author) else {
        return Ok(());
    };
    ctx.transport().send_text(&target, RESET_CONFIRMATION).await?;
    Ok(())
}

/// Answer a group message that @-mentions the bot.
pub async fn group<C: RelayContext>(ctx: &C, event: &ChatEvent) -> Result<(), DispatchError> {
    if !event.is_text() {
        return Ok(());
    }
    let group = event.group.as_ref().ok_or(DispatchError::Lookup("group"))?;
    let member = event
        .group_sender
        .as_ref()
        .ok_or(DispatchError::Lookup("group sender"))?;

    info!(
        user = %member.nick_name, group = %group.nick_name,
        content = %event.content, "received group text"
    );

    let ignores = &ctx.config().ignores;
    if is_ignored(ignores, group) || is_ignored(ignores, member) {
        return Ok(());
    }
    if !event.is_at || member.is_self {
        return Ok(());
    }

    let mention = event.self_mention();
    let Some(question) = normalize(&event.content, mention.as_deref()) else {
        info!("group message is empty after normalization");
        return Ok(());
    };

    let user_id = member.user_id();
    let turns = ctx.prompt().build_turns(ctx.sessions(), &user_id, &question);
    let reply = ctx.agent().complete(&turns).await;
    info!(
        user = %member.nick_name, group = %group.nick_name,
        reply = %reply.content, "replying to group"
    );
    ctx.prompt()
        .remember(ctx.sessions(), &user_id, turns, reply.clone());

    let quoted = strip_mention(&event.content, mention.as_deref());
    let text = format_group_reply(&member.nick_name, quoted.trim(), &reply.content);
    ctx.transport()
        .send_text(&Target::reply_to(event), &text)
        .await?;
    Ok(())
}

/// Accept a friend request when `auto_pass` is on.
pub async fn friend_request<C: RelayContext>(
    ctx: &C,
    event: &ChatEvent,
) -> Result<(), DispatchError> {
    if !ctx.config().auto_pass {
        info!("friend request ignored, auto_pass is off");
        return Ok(());
    }
    ctx.transport().accept_friend_request(event).await?;
    info!(from = ?event.sender.as_ref().map(|c| c.nick_name.as_str()), "friend request accepted");
    Ok(())
}

/// Answer a one-to-one message.
pub async fn private<C: RelayContext>(ctx: &C, event: &ChatEvent) -> Result<(), DispatchError> {
    if !event.is_text() {
        return Ok(());
    }
    let sender = event.sender.as_ref().ok_or(DispatchError::Lookup("sender"))?;
    info!(user = %sender.nick_name, content = %event.content, "received private text");

    if is_ignored(&ctx.config().ignores, sender) {
        return Ok(());
    }

    let Some(question) = normalize(&event.content, None) else {
        info!("private message is empty after normalization");
        return Ok(());
    };

    let user_id = sender.user_id();
    let turns = ctx.prompt().build_turns(ctx.sessions(), &user_id, &question);
    let reply = ctx.agent().complete(&turns).await;
    ctx.prompt()
        .remember(ctx.sessions(), &user_id, turns, reply.clone());

    let Some(target) = reply_target(event, sender) else {
        debug!(to = %event.to_user, "self-sent message, not answering");
        return Ok(());
    };
    let text = format_private_reply(&ctx.config().reply_prefix, &reply.content);
    ctx.transport().send_text(&target, &text).await?;
    Ok(())
}

/// Where a reply to `author` should go, or `None` when it must not be sent.
///
/// The bot account only talks to itself through the file helper chat.
fn reply_target(event: &ChatEvent, author: &Contact) -> Option<Target> {
    if !author.is_self {
        return Some(Target::reply_to(event));
    }
    if event.to_user == FILE_HELPER {
        Some(Target::FileHelper)
    } else {
        None
    }
}

fn group_ignored<C: RelayContext>(ctx: &C, event: &ChatEvent) -> bool {
    event
        .group
        .as_ref()
        .is_some_and(|g| event.is_group() && is_ignored(&ctx.config().ignores, g))
}

fn lookup_target(event: &ChatEvent) -> DispatchError {
    if event.is_group() {
        DispatchError::Lookup("group sender")
    } else {
        DispatchError::Lookup("sender")
    }
}

fn strip_mention(content: &str, mention: Option<&str>) -> String {
    match mention {
        Some(m) => content.replace(m, ""),
        None => content.to_string(),
    }
}
