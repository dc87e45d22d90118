use serde::{Deserialize, Serialize};

use chatrelay_core::types::UserId;

/// Receiver name of the account's own "file transfer" chat.
///
/// Messages the bot account sends to itself land here; they are the only
/// self-sent messages the relay answers.
pub const FILE_HELPER: &str = "filehelper";

/// What an inbound event carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    #[default]
    Text,
    FriendRequest,
    /// Images, voice, system notices… never answered.
    Other,
}

/// Where an inbound event was posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    #[default]
    Private,
    Group,
}

/// A user or group as reported by the chat network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Network-assigned identity; used as the session key.
    pub id: String,
    #[serde(default)]
    pub nick_name: String,
    /// Name the bot account saved for this contact.
    #[serde(default)]
    pub remark_name: String,
    /// In-group display name, when the contact is a group member.
    #[serde(default)]
    pub display_name: String,
    /// True when this contact is the bot account itself.
    #[serde(default)]
    pub is_self: bool,
}

impl Contact {
    pub fn user_id(&self) -> UserId {
        UserId::new(self.id.as_str())
    }

    /// The names an operator's ignore list is matched against.
    pub fn names(&self) -> [&str; 3] {
        [&self.remark_name, &self.nick_name, &self.display_name]
    }
}

/// One inbound event from the chat network.
///
/// For private chats `sender` is the other party. For group chats `group`
/// is the group and `group_sender` the member who posted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatEvent {
    /// Bridge-assigned message id, echoed back in replies.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub kind: EventKind,
    #[serde(default)]
    pub chat: ChatKind,
    #[serde(default)]
    pub sender: Option<Contact>,
    #[serde(default)]
    pub group: Option<Contact>,
    #[serde(default)]
    pub group_sender: Option<Contact>,
    #[serde(default)]
    pub content: String,
    /// The bot was @-mentioned in this message.
    #[serde(default)]
    pub is_at: bool,
    /// Receiver name; [`FILE_HELPER`] for notes-to-self.
    #[serde(default)]
    pub to_user: String,
    /// The bot account's own nickname, used to strip `@<self_name>`.
    #[serde(default)]
    pub self_name: String,
}

impl ChatEvent {
    pub fn is_group(&self) -> bool {
        self.chat == ChatKind::Group
    }

    pub fn is_text(&self) -> bool {
        self.kind == EventKind::Text
    }

    pub fn is_friend_request(&self) -> bool {
        self.kind == EventKind::FriendRequest
    }

    /// The person behind the message: the in-group sender for group
    /// events, the direct sender otherwise.
    pub fn author(&self) -> Option<&Contact> {
        match self.chat {
            ChatKind::Group => self.group_sender.as_ref(),
            ChatKind::Private => self.sender.as_ref(),
        }
    }

    /// `@<self_name>`, or `None` when the bot's name is unknown.
    pub fn self_mention(&self) -> Option<String> {
        if self.self_name.is_empty() {
            None
        } else {
            Some(format!("@{}", self.self_name))
        }
    }
}

/// Destination of an outbound text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum Target {
    /// Reply into the chat the event `event_id` came from.
    Reply { event_id: String },
    /// The bot account's own file-helper chat.
    FileHelper,
}

impl Target {
    pub fn reply_to(event: &ChatEvent) -> Self {
        Target::Reply {
            event_id: event.id.clone(),
        }
    }
}
