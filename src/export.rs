use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::tg::{parse_entity, parse_hashtags, DocumentAttribute, Entity, Media, Message, PhotoSize};
use crate::util;

/// A message flattened into one `_all_chats_` row.
#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct MessageExport {
    pub date: NaiveDateTime,
    pub chat_id: i64,
    pub chat_name: Option<String>,
    pub chat_username: Option<String>,
    pub message_id: i32,
    pub text: Option<String>,
    pub clean_text: Option<String>,
    pub has_photo: bool,
    pub has_video: bool,
    pub size: Option<i64>,
    pub human_readable_size: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub resolution: Option<String>,
    pub duration: Option<String>,
    pub duration_sec: Option<f64>,
    pub views: Option<i32>,
    pub forwards: Option<i32>,
    pub reactions: Option<i64>,
    pub file_name: Option<String>,
    pub file_id: Option<i64>,
    pub file_uid: Option<i64>,
    pub grouped_id: Option<i64>,
    pub sender_id: Option<i64>,
    pub sender_name: Option<String>,
    pub sender_username: Option<String>,
    pub hashtags: Option<String>,
    pub fetch_date: NaiveDateTime,
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

impl MessageExport {
    pub fn from_message(message: &Message) -> Self {
        let (chat_name, chat_username) = match &message.chat {
            Some(chat) => {
                let parsed = parse_entity(chat);
                (Some(parsed.title), Some(parsed.username))
            }
            None => (None, None),
        };
        let (sender_id, sender_name, sender_username) = match &message.sender {
            Some(sender) => {
                let parsed = parse_entity(sender);
                (Some(parsed.id), Some(parsed.title), Some(parsed.username))
            }
            None => (None, None, None),
        };

        let mut row = MessageExport {
            date: message.date.naive_utc(),
            chat_id: message.peer_id.id(),
            chat_name,
            chat_username,
            message_id: message.id,
            text: Some(message.message.clone()),
            clean_text: Some(util::clean_text(&message.message)),
            has_photo: false,
            has_video: false,
            size: None,
            human_readable_size: None,
            width: None,
            height: None,
            resolution: None,
            duration: None,
            duration_sec: None,
            views: message.views,
            forwards: message.forwards,
            reactions: message.reactions.as_ref().map(|r| r.total()),
            file_name: None,
            file_id: None,
            file_uid: None,
            grouped_id: message.grouped_id,
            sender_id,
            sender_name,
            sender_username,
            hashtags: non_empty(parse_hashtags(message).join(", ")),
            fetch_date: util::now(),
        };

        match &message.media {
            Some(Media::Document { document }) => {
                row.size = Some(document.size);
                row.human_readable_size = Some(util::round_size(document.size));
                row.file_id = Some(document.id);
                row.file_uid = Some(document.access_hash);
                for attribute in &document.attributes {
                    match attribute {
                        DocumentAttribute::Video { w, h, duration } => {
                            row.has_video = true;
                            row.duration_sec = Some(*duration);
                            row.duration = Some(util::format_duration(*duration));
                            row.set_resolution(*w, *h);
                        }
                        DocumentAttribute::Filename { file_name } => {
                            row.file_name = Some(file_name.clone());
                        }
                        DocumentAttribute::ImageSize { w, h } if row.resolution.is_none() => {
                            row.set_resolution(*w, *h);
                        }
                        _ => {}
                    }
                }
            }
            Some(Media::Photo { photo }) => {
                row.has_photo = true;
                row.file_id = Some(photo.id);
                row.file_uid = Some(photo.access_hash);
                for size in &photo.sizes {
                    if let PhotoSize::Progressive { w, h, sizes, .. } = size {
                        row.set_resolution(*w, *h);
                        if let Some(largest) = sizes.iter().max() {
                            row.size = Some(i64::from(*largest));
                            row.human_readable_size = Some(util::round_size(i64::from(*largest)));
                        }
                    }
                }
            }
            Some(Media::Unsupported) | None => {}
        }

        row
    }

    fn set_resolution(&mut self, w: i32, h: i32) {
        self.resolution = Some(format!("{}x{}", w, h));
        self.width = Some(w);
        self.height = Some(h);
    }
}

/// JSON form of `message` as written to chat exports: the message itself,
/// its hashtags under `_hashtags` and the chat entity under
/// `peer_id._entity`.
pub fn message_document(message: &Message, entity: &Entity) -> Result<Value> {
    let mut document = serde_json::to_value(message)?;
    if let Value::Object(fields) = &mut document {
        fields.insert(
            "_hashtags".to_string(),
            serde_json::to_value(parse_hashtags(message))?,
        );
        if let Some(Value::Object(peer)) = fields.get_mut("peer_id") {
            peer.insert("_entity".to_string(), serde_json::to_value(entity)?);
        }
    }
    Ok(document)
}
