use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entities::{Entity, Peer};
use super::media::Media;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageEntityKind {
    #[serde(rename = "MessageEntityHashtag")]
    Hashtag,
    #[serde(rename = "MessageEntityCashtag")]
    Cashtag,
    #[serde(rename = "MessageEntityMention")]
    Mention,
    #[serde(rename = "MessageEntityUrl")]
    Url,
    #[serde(rename = "MessageEntityTextUrl")]
    TextUrl,
    #[serde(rename = "MessageEntityBotCommand")]
    BotCommand,
    #[serde(rename = "MessageEntityBold")]
    Bold,
    #[serde(rename = "MessageEntityItalic")]
    Italic,
    #[serde(rename = "MessageEntityCode")]
    Code,
    #[serde(rename = "MessageEntityPre")]
    Pre,
    #[serde(rename = "MessageEntityUnknown")]
    Unknown,
}

/// A formatting span inside a message. `offset` and `length` count UTF-16
/// code units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "_")]
    pub kind: MessageEntityKind,
    pub offset: i32,
    pub length: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReplies {
    pub replies: i32,
    #[serde(default)]
    pub replies_pts: i32,
    pub max_id: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCount {
    pub reaction: String,
    pub count: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReactions {
    #[serde(default)]
    pub results: Vec<ReactionCount>,
}

impl MessageReactions {
    pub fn total(&self) -> i64 {
        self.results.iter().map(|r| i64::from(r.count)).sum()
    }
}

/// A message fetched from a conversation.
///
/// `sender` and `chat` are the entities the client already resolved for the
/// message; they are not part of its JSON form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_", rename = "Message")]
pub struct Message {
    pub id: i32,
    pub peer_id: Peer,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
    pub media: Option<Media>,
    pub replies: Option<MessageReplies>,
    pub reply_to_msg_id: Option<i32>,
    pub views: Option<i32>,
    pub forwards: Option<i32>,
    pub reactions: Option<MessageReactions>,
    pub grouped_id: Option<i64>,
    #[serde(skip)]
    pub sender: Option<Entity>,
    #[serde(skip)]
    pub chat: Option<Entity>,
}

impl Message {
    pub fn new(peer_id: Peer, id: i32, date: DateTime<Utc>) -> Self {
        Message {
            id,
            peer_id,
            date,
            message: String::new(),
            entities: Vec::new(),
            media: None,
            replies: None,
            reply_to_msg_id: None,
            views: None,
            forwards: None,
            reactions: None,
            grouped_id: None,
            sender: None,
            chat: None,
        }
    }

    /// The attached media, only when it carries a downloadable file.
    pub fn file(&self) -> Option<&Media> {
        self.media.as_ref().filter(|media| media.has_file())
    }

    /// Number of replies in this message's thread.
    pub fn reply_count(&self) -> i32 {
        self.replies.as_ref().map_or(0, |r| r.replies)
    }

    /// Text covered by `entity`, sliced by UTF-16 offsets.
    pub fn inner_text(&self, entity: &MessageEntity) -> String {
        let units: Vec<u16> = self.message.encode_utf16().collect();
        let start = usize::try_from(entity.offset).unwrap_or(0).min(units.len());
        let end = start
            .saturating_add(usize::try_from(entity.length).unwrap_or(0))
            .min(units.len());
        String::from_utf16_lossy(&units[start..end])
    }
}
