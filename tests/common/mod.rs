#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures_util::StreamExt;

use tg_util::tg::{
    Channel, Document, DocumentAttribute, Entity, EntityRef, FileHash, HistoryRequest, InputFileLocation, Media,
    Message, MessageFilter, MessageReplies, MessageStream, Peer, Photo, PhotoSize, TelegramClient, User,
};
use tg_util::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FakeSender {
    pub dc_id: i32,
}

#[derive(Debug, Default)]
pub struct State {
    pub home_dc: i32,
    pub entities: Vec<Entity>,
    pub dialogs: Vec<Entity>,
    /// Oldest first, per peer id.
    pub history: HashMap<i64, Vec<Message>>,
    pub replies: HashMap<(i64, i32), Vec<Message>>,
    /// Served by `get_message` instead of the history copy.
    pub refetched: HashMap<(i64, i32), Message>,
    pub hashes: HashMap<i64, Vec<FileHash>>,
    pub invalid_locations: HashSet<i64>,
    pub stale_references: HashSet<Vec<u8>>,
    pub private: HashSet<i64>,
    pub failing_downloads: HashSet<i32>,
    /// Peers whose history listing fails after the last message.
    pub broken_history: HashSet<i64>,

    pub get_entity_calls: Vec<EntityRef>,
    pub history_requests: Vec<HistoryRequest>,
    pub exported_senders: Vec<i32>,
    pub hash_requests: Vec<(Option<i32>, i64)>,
    pub get_message_calls: usize,
    pub downloads: Vec<(i32, PathBuf, bool)>,
}

/// In-memory stand-in for a logged in client. Clones share state.
#[derive(Clone, Debug, Default)]
pub struct FakeClient {
    state: Arc<Mutex<State>>,
}

impl FakeClient {
    pub fn new(home_dc: i32) -> Self {
        let client = FakeClient::default();
        client.state().home_dc = home_dc;
        client
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_entity(&self, entity: Entity) {
        self.state().entities.push(entity);
    }

    pub fn add_dialog(&self, entity: Entity) {
        let mut state = self.state();
        state.entities.push(entity.clone());
        state.dialogs.push(entity);
    }

    pub fn add_message(&self, message: Message) {
        let mut state = self.state();
        let history = state.history.entry(message.peer_id.id()).or_default();
        history.push(message);
        history.sort_by_key(|m| m.id);
    }

    pub fn add_reply(&self, message: &mut Message, reply: Message) {
        let mut state = self.state();
        let thread = state
            .replies
            .entry((message.peer_id.id(), message.id))
            .or_default();
        thread.push(reply);
        message.replies = Some(MessageReplies {
            replies: thread.len() as i32,
            replies_pts: 0,
            max_id: None,
        });
    }
}

fn matches_username(entity: &Entity, name: &str) -> bool {
    let name = name
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("t.me/");
    let username = match entity {
        Entity::User(user) => user.username.as_deref(),
        Entity::Channel(channel) => channel.username.as_deref(),
        _ => None,
    };
    username == Some(name)
}

fn is_video(message: &Message) -> bool {
    matches!(&message.media, Some(Media::Document { document })
        if document.attributes.iter().any(|a| matches!(a, DocumentAttribute::Video { .. })))
}

#[async_trait]
impl TelegramClient for FakeClient {
    type Sender = FakeSender;

    fn home_dc_id(&self) -> i32 {
        self.state().home_dc
    }

    async fn get_entity(&self, entity: &EntityRef) -> Result<Entity> {
        let mut state = self.state();
        state.get_entity_calls.push(entity.clone());
        let found = state.entities.iter().find(|candidate| match entity {
            EntityRef::Id(id) => candidate.id() == *id,
            EntityRef::Username(name) => matches_username(candidate, name),
            EntityRef::Peer(peer) => candidate.peer() == *peer,
        });
        found
            .cloned()
            .ok_or_else(|| Error::EntityNotFound(entity.to_string()))
    }

    fn iter_messages<'a>(&'a self, entity: &'a Entity, request: HistoryRequest) -> MessageStream<'a> {
        let mut state = self.state();
        state.history_requests.push(request.clone());
        let peer_id = entity.id();

        let items: Vec<Option<Message>> = if let Some(reply_to) = request.reply_to {
            state
                .replies
                .get(&(peer_id, reply_to))
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(Some)
                .collect()
        } else {
            let history = state.history.get(&peer_id).cloned().unwrap_or_default();
            match request.ids {
                Some(id) => vec![history.into_iter().find(|m| m.id == id)],
                None => {
                    let mut selected: Vec<Message> = history
                        .into_iter()
                        .filter(|m| request.min_id == 0 || m.id > request.min_id)
                        .filter(|m| request.max_id == 0 || m.id < request.max_id)
                        .collect();
                    if !request.reverse {
                        selected.reverse();
                    }
                    if let Some(limit) = request.limit {
                        selected.truncate(limit);
                    }
                    selected.into_iter().map(Some).collect()
                }
            }
        };

        let broken = request.reply_to.is_none() && request.ids.is_none() && state.broken_history.contains(&peer_id);
        let mut items: Vec<Result<Option<Message>>> = items.into_iter().map(Ok).collect();
        if broken {
            items.push(Err(Error::Rpc {
                code: 420,
                message: "FLOOD_WAIT_30".to_string(),
            }));
        }
        futures_util::stream::iter(items).boxed()
    }

    async fn count_messages(&self, entity: &Entity, filter: Option<MessageFilter>) -> Result<Option<i64>> {
        let state = self.state();
        if state.private.contains(&entity.id()) {
            return Err(Error::ChannelPrivate);
        }
        let Some(history) = state.history.get(&entity.id()) else {
            return Ok(None);
        };
        let count = history
            .iter()
            .filter(|m| match filter {
                None => true,
                Some(MessageFilter::PhotoVideo) => {
                    matches!(m.media, Some(Media::Photo { .. })) || is_video(m)
                }
                Some(MessageFilter::Document) => {
                    matches!(m.media, Some(Media::Document { .. })) && !is_video(m)
                }
            })
            .count();
        Ok(Some(count as i64))
    }

    async fn get_message(&self, peer: &Peer, id: i32) -> Result<Option<Message>> {
        let mut state = self.state();
        state.get_message_calls += 1;
        if let Some(message) = state.refetched.get(&(peer.id(), id)) {
            return Ok(Some(message.clone()));
        }
        Ok(state
            .history
            .get(&peer.id())
            .and_then(|history| history.iter().find(|m| m.id == id))
            .cloned())
    }

    async fn export_sender(&self, dc_id: i32) -> Result<FakeSender> {
        tokio::task::yield_now().await;
        self.state().exported_senders.push(dc_id);
        Ok(FakeSender { dc_id })
    }

    async fn get_file_hashes(
        &self,
        sender: Option<&FakeSender>,
        location: &InputFileLocation,
        offset: i64,
    ) -> Result<Vec<FileHash>> {
        let mut state = self.state();
        state.hash_requests.push((sender.map(|s| s.dc_id), location.id()));
        if state.invalid_locations.contains(&location.id()) {
            return Err(Error::LocationInvalid);
        }
        let reference = match location {
            InputFileLocation::Document { file_reference, .. } | InputFileLocation::Photo { file_reference, .. } => {
                file_reference
            }
        };
        if state.stale_references.contains(reference) {
            return Err(Error::FileReferenceExpired);
        }
        Ok(state.hashes.get(&location.id()).cloned().unwrap_or_else(|| {
            vec![FileHash {
                offset,
                limit: 131072,
                hash: location.id().to_be_bytes().to_vec(),
            }]
        }))
    }

    async fn iter_dialogs(&self) -> Result<Vec<Entity>> {
        Ok(self.state().dialogs.clone())
    }

    async fn download_media(&self, message: &Message, path: &Path, thumb: bool) -> Result<()> {
        let failing = {
            let mut state = self.state();
            state.downloads.push((message.id, path.to_path_buf(), thumb));
            state.failing_downloads.contains(&message.id)
        };
        tokio::fs::write(path, format!("{}:{}", message.id, thumb)).await?;
        if failing {
            return Err(Error::Rpc {
                code: 500,
                message: "CONNECTION_DROPPED".to_string(),
            });
        }
        Ok(())
    }
}

pub fn channel(id: i64, username: Option<&str>) -> Entity {
    Entity::Channel(Channel {
        id,
        access_hash: Some(id * 10),
        title: format!("Channel {}", id),
        username: username.map(str::to_string),
        broadcast: true,
        ..Default::default()
    })
}

pub fn user(id: i64, first_name: &str) -> Entity {
    Entity::User(User {
        id,
        first_name: Some(first_name.to_string()),
        ..Default::default()
    })
}

pub fn text_message(channel_id: i64, id: i32, text: &str) -> Message {
    let date = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() + chrono::Duration::minutes(id as i64);
    let mut message = Message::new(Peer::Channel { channel_id }, id, date);
    message.message = text.to_string();
    message
}

pub fn video_message(channel_id: i64, id: i32, file_id: i64, dc_id: i32) -> Message {
    let mut message = text_message(channel_id, id, "");
    message.media = Some(Media::Document {
        document: Document {
            id: file_id,
            access_hash: file_id + 1,
            file_reference: vec![1, 2, 3],
            dc_id,
            size: 4096,
            mime_type: "video/mp4".to_string(),
            attributes: vec![DocumentAttribute::Video {
                w: 1280,
                h: 720,
                duration: 30.0 + file_id as f64,
            }],
            thumbs: vec![PhotoSize::Size {
                kind: "m".to_string(),
                w: 320,
                h: 180,
                size: 900,
            }],
        },
    });
    message
}

pub fn photo_message(channel_id: i64, id: i32, file_id: i64) -> Message {
    let mut message = text_message(channel_id, id, "");
    message.media = Some(Media::Photo {
        photo: Photo {
            id: file_id,
            access_hash: file_id + 1,
            file_reference: vec![4, 5, 6],
            dc_id: 2,
            sizes: vec![PhotoSize::Progressive {
                kind: "y".to_string(),
                w: 800,
                h: 600,
                sizes: vec![1000, 2000 + file_id as i32],
            }],
        },
    });
    message
}

pub fn file_message(channel_id: i64, id: i32, file_id: i64, file_name: &str) -> Message {
    let mut message = text_message(channel_id, id, "");
    message.media = Some(Media::Document {
        document: Document {
            id: file_id,
            access_hash: file_id + 1,
            file_reference: vec![7],
            dc_id: 2,
            size: 100 + file_id,
            mime_type: "application/pdf".to_string(),
            attributes: vec![DocumentAttribute::Filename {
                file_name: file_name.to_string(),
            }],
            thumbs: vec![],
        },
    });
    message
}
