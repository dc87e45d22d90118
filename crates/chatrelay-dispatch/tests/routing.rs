// End-to-end routing: event in, transport actions and session state out.
// The completion backend is scripted and the transport only records.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use chatrelay_agent::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError};
use chatrelay_agent::reply::FALLBACK_REPLY;
use chatrelay_agent::AgentRuntime;
use chatrelay_channels::{
    ChannelError, ChatEvent, ChatKind, Contact, EventKind, Target, Transport, FILE_HELPER,
};
use chatrelay_core::config::RelayConfig;
use chatrelay_core::types::{Turn, UserId};
use chatrelay_dispatch::handlers::RESET_CONFIRMATION;
use chatrelay_dispatch::{DispatchContext, Dispatcher, RelayContext, Rule};
use chatrelay_sessions::SessionStore;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<(Target, String)>>,
    accepted: Mutex<Vec<String>>,
    fail_sends: bool,
}

impl RecordingTransport {
    fn failing() -> Self {
        Self {
            fail_sends: true,
            ..Default::default()
        }
    }

    fn sent(&self) -> Vec<(Target, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send_text(&self, target: &Target, text: &str) -> Result<(), ChannelError> {
        if self.fail_sends {
            return Err(ChannelError::SendFailed("bridge down".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((target.clone(), text.to_string()));
        Ok(())
    }

    async fn accept_friend_request(&self, event: &ChatEvent) -> Result<(), ChannelError> {
        self.accepted.lock().unwrap().push(event.id.clone());
        Ok(())
    }
}

/// Replays canned outcomes in order; `Ok("")`-style defaults once exhausted.
#[derive(Default)]
struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Option<String>, ProviderError>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedProvider {
    fn new(script: Vec<Result<Option<String>, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Arc::default(),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.requests.lock().unwrap().push(req.clone());
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Some(String::new())));
        next.map(|content| ChatResponse {
            content,
            model: req.model.clone(),
            tokens_in: 1,
            tokens_out: 1,
            stop_reason: "stop".into(),
        })
    }
}

struct Harness {
    dispatcher: Dispatcher<DispatchContext>,
    transport: Arc<RecordingTransport>,
    sessions: Arc<SessionStore>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

fn harness_with(
    config: RelayConfig,
    script: Vec<Result<Option<String>, ProviderError>>,
    transport: RecordingTransport,
) -> Harness {
    let provider = ScriptedProvider::new(script);
    let requests = Arc::clone(&provider.requests);
    let transport = Arc::new(transport);
    let sessions = Arc::new(SessionStore::new(Duration::from_secs(900)));
    let agent = AgentRuntime::from_config(Box::new(provider), &config);
    let ctx = DispatchContext::new(
        agent,
        Arc::clone(&sessions),
        config,
        Arc::clone(&transport) as Arc<dyn Transport>,
    );
    Harness {
        dispatcher: Dispatcher::new(Arc::new(ctx)),
        transport,
        sessions,
        requests,
    }
}

fn harness(script: Vec<Result<Option<String>, ProviderError>>) -> Harness {
    harness_with(
        RelayConfig::default(),
        script,
        RecordingTransport::default(),
    )
}

fn person(id: &str, nick: &str) -> Contact {
    Contact {
        id: id.into(),
        nick_name: nick.into(),
        ..Default::default()
    }
}

fn private_text(content: &str) -> ChatEvent {
    ChatEvent {
        id: "m-private".into(),
        kind: EventKind::Text,
        chat: ChatKind::Private,
        sender: Some(person("u-alice", "alice")),
        content: content.into(),
        to_user: "bot".into(),
        self_name: "RelayBot".into(),
        ..Default::default()
    }
}

fn group_text(content: &str, is_at: bool) -> ChatEvent {
    ChatEvent {
        id: "m-group".into(),
        kind: EventKind::Text,
        chat: ChatKind::Group,
        group: Some(person("g-rust", "rustaceans")),
        group_sender: Some(person("u-bob", "bob")),
        content: content.into(),
        is_at,
        self_name: "RelayBot".into(),
        ..Default::default()
    }
}

fn reply_to(id: &str) -> Target {
    Target::Reply {
        event_id: id.into(),
    }
}

// ---------------------------------------------------------------------------
// Private chats
// ---------------------------------------------------------------------------

#[tokio::test]
async fn private_message_is_answered_and_remembered() {
    let h = harness(vec![Ok(Some("Hello alice!".into()))]);

    let rule = h.dispatcher.route(&private_text("  hi \n")).await;
    assert_eq!(rule, Some(Rule::Private));

    assert_eq!(
        h.transport.sent(),
        vec![(reply_to("m-private"), "Hello alice!".to_string())]
    );

    let stored = h.sessions.get(&UserId::from("u-alice")).unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[1], Turn::user("hi？"));
    assert_eq!(stored[2], Turn::assistant("Hello alice!"));
}

#[tokio::test]
async fn follow_up_extends_the_same_conversation() {
    let h = harness(vec![Ok(Some("first".into())), Ok(Some("second".into()))]);

    h.dispatcher.route(&private_text("one")).await;
    h.dispatcher.route(&private_text("two.")).await;

    let requests = h.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].messages.len(), 2);
    assert_eq!(
        &requests[1].messages[1..],
        &[
            Turn::user("one？"),
            Turn::assistant("first"),
            Turn::user("two."),
        ]
    );
    assert_eq!(
        h.sessions.get(&UserId::from("u-alice")).unwrap().len(),
        5
    );
}

#[tokio::test]
async fn reply_prefix_is_prepended() {
    let config = RelayConfig {
        reply_prefix: "[bot]".into(),
        ..RelayConfig::default()
    };
    let h = harness_with(
        config,
        vec![Ok(Some("\n\nanswer".into()))],
        RecordingTransport::default(),
    );

    h.dispatcher.route(&private_text("q")).await;
    assert_eq!(h.transport.sent()[0].1, "[bot]\nanswer");
}

#[tokio::test]
async fn empty_backend_reply_sends_fallback() {
    let h = harness(vec![Ok(None)]);
    h.dispatcher.route(&private_text("anyone there")).await;
    assert_eq!(h.transport.sent()[0].1, FALLBACK_REPLY);
}

#[tokio::test]
async fn backend_error_is_sent_and_stored() {
    let h = harness(vec![Err(ProviderError::Api {
        status: 503,
        message: "overloaded".into(),
    })]);

    h.dispatcher.route(&private_text("hi")).await;

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.contains("overloaded"), "got {:?}", sent[0].1);

    let stored = h.sessions.get(&UserId::from("u-alice")).unwrap();
    assert!(stored[2].content.contains("overloaded"));
}

#[tokio::test]
async fn self_message_to_file_helper_is_answered_there() {
    let h = harness(vec![Ok(Some("noted".into()))]);
    let mut ev = private_text("remind me");
    ev.sender = Some(Contact {
        is_self: true,
        ..person("u-me", "me")
    });
    ev.to_user = FILE_HELPER.into();

    h.dispatcher.route(&ev).await;
    assert_eq!(h.transport.sent(), vec![(Target::FileHelper, "noted".into())]);
}

#[tokio::test]
async fn self_message_elsewhere_is_not_answered_but_remembered() {
    let h = harness(vec![Ok(Some("ignored".into()))]);
    let mut ev = private_text("talking to a friend");
    ev.sender = Some(Contact {
        is_self: true,
        ..person("u-me", "me")
    });
    ev.to_user = "u-friend".into();

    assert_eq!(h.dispatcher.route(&ev).await, Some(Rule::Private));
    assert!(h.transport.sent().is_empty());
    assert!(h.sessions.get(&UserId::from("u-me")).is_some());
}

#[tokio::test]
async fn ignored_sender_gets_nothing() {
    let config = RelayConfig {
        ignores: vec!["ali".into()],
        ..RelayConfig::default()
    };
    let h = harness_with(config, vec![], RecordingTransport::default());

    assert_eq!(h.dispatcher.route(&private_text("hi")).await, Some(Rule::Private));
    assert!(h.transport.sent().is_empty());
    assert!(h.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn non_text_and_blank_messages_skip_the_backend() {
    let h = harness(vec![]);

    let mut image = private_text("");
    image.kind = EventKind::Other;
    h.dispatcher.route(&image).await;
    h.dispatcher.route(&private_text(" \n ")).await;

    assert!(h.requests.lock().unwrap().is_empty());
    assert!(h.transport.sent().is_empty());
}

#[tokio::test]
async fn missing_sender_is_dropped_without_panicking() {
    let h = harness(vec![]);
    let mut ev = private_text("hi");
    ev.sender = None;

    assert_eq!(h.dispatcher.route(&ev).await, Some(Rule::Private));
    assert!(h.transport.sent().is_empty());
    assert!(h.sessions.is_empty());
}

#[tokio::test]
async fn send_failure_keeps_session_write() {
    let h = harness_with(
        RelayConfig::default(),
        vec![Ok(Some("lost in transit".into()))],
        RecordingTransport::failing(),
    );

    assert_eq!(h.dispatcher.route(&private_text("hi")).await, Some(Rule::Private));
    let stored = h.sessions.get(&UserId::from("u-alice")).unwrap();
    assert_eq!(stored[2], Turn::assistant("lost in transit"));
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

#[tokio::test]
async fn group_mention_is_answered_with_quote() {
    let h = harness(vec![Ok(Some("a systems language".into()))]);

    let rule = h
        .dispatcher
        .route(&group_text("@RelayBot what is rust", true))
        .await;
    assert_eq!(rule, Some(Rule::Group));

    assert_eq!(
        h.transport.sent(),
        vec![(
            reply_to("m-group"),
            "@bob\nwhat is rust\n --------------------------------\na systems language".into()
        )]
    );

    // Session is keyed by the member, not the group.
    assert!(h.sessions.get(&UserId::from("u-bob")).is_some());
    assert!(h.sessions.get(&UserId::from("g-rust")).is_none());

    let requests = h.requests.lock().unwrap();
    assert_eq!(requests[0].messages[1], Turn::user("what is rust？"));
}

#[tokio::test]
async fn group_message_without_mention_is_ignored() {
    let h = harness(vec![]);
    let rule = h.dispatcher.route(&group_text("just chatting", false)).await;

    assert_eq!(rule, Some(Rule::Group));
    assert!(h.transport.sent().is_empty());
    assert!(h.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn group_message_from_self_is_ignored() {
    let h = harness(vec![]);
    let mut ev = group_text("@RelayBot echo", true);
    ev.group_sender = Some(Contact {
        is_self: true,
        ..person("u-me", "RelayBot")
    });

    h.dispatcher.route(&ev).await;
    assert!(h.transport.sent().is_empty());
}

#[tokio::test]
async fn ignored_group_is_silent() {
    let config = RelayConfig {
        ignores: vec!["rust".into()],
        ..RelayConfig::default()
    };
    let h = harness_with(config, vec![], RecordingTransport::default());

    h.dispatcher.route(&group_text("@RelayBot hi", true)).await;
    assert!(h.transport.sent().is_empty());
}

#[tokio::test]
async fn group_empty_reply_uses_short_form() {
    let h = harness(vec![Ok(Some("   ".into()))]);
    h.dispatcher.route(&group_text("@RelayBot hm", true)).await;
    assert_eq!(h.transport.sent()[0].1, format!("@bob {FALLBACK_REPLY}"));
}

#[tokio::test]
async fn bare_mention_is_nothing_to_answer() {
    let h = harness(vec![]);
    h.dispatcher.route(&group_text("@RelayBot", true)).await;
    assert!(h.requests.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Reset
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reset_phrase_in_group_clears_member_session() {
    let h = harness(vec![Ok(Some("ok".into()))]);
    h.dispatcher.route(&group_text("@RelayBot hi", true)).await;
    assert!(h.sessions.get(&UserId::from("u-bob")).is_some());

    let rule = h
        .dispatcher
        .route(&group_text("@RelayBot 下一个问题", true))
        .await;

    assert_eq!(rule, Some(Rule::Reset));
    assert!(h.sessions.get(&UserId::from("u-bob")).is_none());
    assert_eq!(
        h.transport.sent().last().unwrap(),
        &(reply_to("m-group"), RESET_CONFIRMATION.to_string())
    );
    // Only the first message reached the backend.
    assert_eq!(h.requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn reset_in_private_starts_fresh_conversation() {
    let h = harness(vec![Ok(Some("one".into())), Ok(Some("two".into()))]);
    h.dispatcher.route(&private_text("first")).await;
    h.dispatcher.route(&private_text("下一个问题")).await;
    h.dispatcher.route(&private_text("again")).await;

    let requests = h.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].messages.len(), 2, "history was cleared");
}

#[tokio::test]
async fn custom_reset_phrase_is_honoured() {
    let config = RelayConfig {
        session_clear: "/forget".into(),
        ..RelayConfig::default()
    };
    let h = harness_with(config, vec![], RecordingTransport::default());

    assert_eq!(
        h.dispatcher.route(&private_text("/forget")).await,
        Some(Rule::Reset)
    );
    assert_eq!(
        h.dispatcher.route(&private_text("下一个问题")).await,
        Some(Rule::Private)
    );
}

// ---------------------------------------------------------------------------
// Friend requests
// ---------------------------------------------------------------------------

fn friend_request() -> ChatEvent {
    ChatEvent {
        id: "fr-1".into(),
        kind: EventKind::FriendRequest,
        sender: Some(person("u-new", "newbie")),
        content: "please add me".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn friend_request_accepted_when_auto_pass() {
    let h = harness(vec![]);
    assert_eq!(
        h.dispatcher.route(&friend_request()).await,
        Some(Rule::FriendRequest)
    );
    assert_eq!(*h.transport.accepted.lock().unwrap(), vec!["fr-1".to_string()]);
}

#[tokio::test]
async fn friend_request_left_alone_without_auto_pass() {
    let config = RelayConfig {
        auto_pass: false,
        ..RelayConfig::default()
    };
    let h = harness_with(config, vec![], RecordingTransport::default());

    h.dispatcher.route(&friend_request()).await;
    assert!(h.transport.accepted.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn spawned_routes_for_many_users_all_complete() {
    let h = harness(vec![]);
    let dispatcher = Arc::new(h.dispatcher);

    let mut handles = Vec::new();
    for i in 0..16 {
        let mut ev = private_text(&format!("question {i}"));
        ev.sender = Some(person(&format!("u-{i}"), &format!("user{i}")));
        handles.push(dispatcher.spawn_route(ev));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), Some(Rule::Private));
    }

    assert_eq!(h.sessions.len(), 16);
    assert_eq!(h.transport.sent().len(), 16);
    assert_eq!(dispatcher.context().sessions().len(), 16);
}
