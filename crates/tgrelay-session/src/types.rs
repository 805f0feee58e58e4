//! Platform object types returned by session operations.
//!
//! These deserialize from the platform's wire format and map themselves onto
//! [`tgrelay_core::Value`] records through [`Encode`]. Unknown wire fields
//! are ignored.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tgrelay_core::{Encode, Record, Value};

/// An account on the platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: i64,
    /// Whether the account is a bot.
    #[serde(default)]
    pub is_bot: bool,
    /// First name.
    pub first_name: String,
    /// Last name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Public username, without `@`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// IETF language tag of the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

impl Encode for User {
    fn to_value(&self) -> Value {
        Record::new("User")
            .field("id", self.id)
            .field("bot", self.is_bot)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("username", &self.username)
            .field("lang_code", &self.language_code)
            .to_value()
    }
}

/// A private chat, group, supergroup, or channel.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Chat {
    /// Unique identifier.
    pub id: i64,
    /// `private`, `group`, `supergroup`, or `channel`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Title for groups and channels.
    #[serde(default)]
    pub title: Option<String>,
    /// Public username, without `@`.
    #[serde(default)]
    pub username: Option<String>,
    /// First name of the other party in a private chat.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Last name of the other party in a private chat.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Description, for groups and channels (full chat info only).
    #[serde(default)]
    pub description: Option<String>,
    /// Bio of the other party (full chat info only).
    #[serde(default)]
    pub bio: Option<String>,
}

impl Encode for Chat {
    fn to_value(&self) -> Value {
        Record::new("Chat")
            .field("id", self.id)
            .field("type", &self.kind)
            .field("title", &self.title)
            .field("username", &self.username)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("about", self.description.as_ref().or(self.bio.as_ref()))
            .to_value()
    }
}

/// A message.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Message {
    /// Identifier, unique within the chat.
    pub message_id: i64,
    /// When the message was sent.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub date: DateTime<Utc>,
    /// Chat the message belongs to.
    pub chat: Chat,
    /// Sender, absent for channel posts.
    #[serde(default)]
    pub from: Option<User>,
    /// Text body.
    #[serde(default)]
    pub text: Option<String>,
    /// Caption for media messages.
    #[serde(default)]
    pub caption: Option<String>,
    /// When the message was last edited.
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub edit_date: Option<DateTime<Utc>>,
    /// The message this one replies to.
    #[serde(default)]
    pub reply_to_message: Option<Box<Message>>,
}

impl Encode for Message {
    fn to_value(&self) -> Value {
        Record::new("Message")
            .field("id", self.message_id)
            .field("date", self.date)
            .field("chat", &self.chat)
            .field("sender", &self.from)
            .field("message", self.text.as_ref().or(self.caption.as_ref()))
            .field("edit_date", self.edit_date)
            .field(
                "reply_to_msg_id",
                self.reply_to_message.as_ref().map(|m| m.message_id),
            )
            .to_value()
    }
}

/// Identifier of a message produced by a copy or forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct MessageId {
    /// Identifier, unique within the destination chat.
    pub message_id: i64,
}

impl Encode for MessageId {
    fn to_value(&self) -> Value {
        Record::new("MessageId").field("id", self.message_id).to_value()
    }
}

/// Target chat: numeric id or public username.
///
/// Deserializes from an integer or a string. Numeric strings (`"123"`,
/// `"-100123"`) become ids; other strings are usernames with a leading `@`
/// added when missing and any `t.me/` link prefix stripped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entity {
    /// Numeric chat id.
    Id(i64),
    /// `@username`.
    Username(String),
}

impl Entity {
    /// Parse a textual target.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
        // `i64::from_str` also takes a leading `+`, which marks a phone number here.
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = trimmed.parse::<i64>() {
                return Self::Id(id);
            }
        }
        let name = ["https://t.me/", "http://t.me/", "t.me/"]
            .iter()
            .find_map(|prefix| trimmed.strip_prefix(prefix))
            .unwrap_or(trimmed);
        if name.starts_with('@') || name.starts_with('+') {
            Self::Username(name.to_owned())
        } else {
            Self::Username(format!("@{name}"))
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Username(name) => f.write_str(name),
        }
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Id(id) => serializer.serialize_i64(*id),
            Self::Username(name) => serializer.serialize_str(name),
        }
    }
}

impl<'de> Deserialize<'de> for Entity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Id(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Id(id) => Ok(Self::Id(id)),
            Raw::Text(text) if text.trim().is_empty() => {
                Err(serde::de::Error::custom("entity must not be empty"))
            }
            Raw::Text(text) => Ok(Self::parse(&text)),
        }
    }
}

/// Chat action shown to the other party (`typing`, `upload_photo`, ...).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatAction {
    /// Typing text.
    #[default]
    Typing,
    /// Uploading a photo.
    UploadPhoto,
    /// Recording a video.
    RecordVideo,
    /// Uploading a video.
    UploadVideo,
    /// Recording a voice note.
    RecordVoice,
    /// Uploading a voice note.
    UploadVoice,
    /// Uploading a document.
    UploadDocument,
    /// Choosing a sticker.
    ChooseSticker,
    /// Looking up a location.
    FindLocation,
}

/// Message text markup mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    /// Markdown V2.
    #[serde(rename = "MarkdownV2", alias = "markdown", alias = "md")]
    Markdown,
    /// HTML subset.
    #[serde(rename = "HTML", alias = "html")]
    Html,
}
