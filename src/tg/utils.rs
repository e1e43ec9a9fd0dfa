use std::collections::BTreeSet;
use std::time::Duration;

use async_stream::try_stream;
use futures_util::{Stream, StreamExt};

use super::cache::{EntityCache, SenderRegistry};
use super::client::{HistoryRequest, MessageFilter, TelegramClient};
use super::entities::{Entity, EntityRef, Peer};
use super::media::{DocumentAttribute, InputFileLocation, Media, PhotoSize};
use super::messages::{Message, MessageEntityKind};
use crate::error::Result;
use crate::types::{EntityStats, FileAttribute, FileType};

/// An entity together with the statistics taken while resolving it.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedEntity {
    pub entity: Entity,
    pub stats: EntityStats,
}

/// Class name, title, username and id of an entity.
///
/// `title` and `username` are empty strings when the entity has none.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedEntity {
    pub class: &'static str,
    pub title: String,
    pub username: String,
    pub id: i64,
}

impl From<ParsedEntity> for (&'static str, String, String, i64) {
    fn from(parsed: ParsedEntity) -> Self {
        (parsed.class, parsed.title, parsed.username, parsed.id)
    }
}

/// Options for [`iter_messages`].
#[derive(Clone, Debug, PartialEq)]
pub struct IterMessages {
    /// Fetch only this message id.
    pub ids: Option<i32>,
    /// Exclusive upper bound, `0` for none.
    pub max_id: i32,
    /// Exclusive lower bound, `0` for none.
    pub min_id: i32,
    /// Delay between page requests.
    pub wait_time: Option<Duration>,
    /// Oldest first instead of newest first.
    pub reverse: bool,
    /// Follow reply threads.
    pub with_reply: bool,
}

impl Default for IterMessages {
    fn default() -> Self {
        IterMessages {
            ids: None,
            max_id: 0,
            min_id: 0,
            wait_time: None,
            reverse: false,
            with_reply: true,
        }
    }
}

pub async fn resolve_entity<C: TelegramClient>(
    client: &C,
    cache: &EntityCache,
    entity: impl Into<EntityRef>,
) -> Result<Entity> {
    let entity = entity.into();
    let key = entity.cache_key();
    if let Some(cached) = cache.get(&key).await {
        return Ok(cached);
    }

    log::debug!("resolving entity {:?}", key);
    let resolved = match &entity {
        EntityRef::Id(id) => get_entity_by_id(client, *id).await?,
        other => client.get_entity(other).await?,
    };
    cache.insert(key, resolved.clone()).await;
    Ok(resolved)
}

pub async fn resolve_entity_with_stats<C: TelegramClient>(
    client: &C,
    cache: &EntityCache,
    entity: impl Into<EntityRef>,
) -> Result<ResolvedEntity> {
    let entity = resolve_entity(client, cache, entity).await?;
    let stats = get_entity_stats(client, &entity).await?;
    Ok(ResolvedEntity { entity, stats })
}

// A bare id could be any of the three peer kinds; channels are the most
// common input so they go first.
async fn get_entity_by_id<C: TelegramClient>(client: &C, id: i64) -> Result<Entity> {
    for peer in [Peer::Channel { channel_id: id }, Peer::Chat { chat_id: id }] {
        match client.get_entity(&EntityRef::Peer(peer.clone())).await {
            Ok(entity) => return Ok(entity),
            Err(err) => log::debug!("{} did not resolve: {}", peer, err),
        }
    }
    client
        .get_entity(&EntityRef::Peer(Peer::User { user_id: id }))
        .await
}

/// BLAKE3 digest over the part hashes of a stored file.
///
/// Files living on a foreign data center are queried through that data
/// center's exported sender, created on first use and kept in `senders`.
pub async fn get_file_hash<C: TelegramClient>(
    client: &C,
    senders: &SenderRegistry<C::Sender>,
    dc_id: Option<i32>,
    location: &InputFileLocation,
) -> Result<[u8; 32]> {
    let hashes = match dc_id {
        Some(dc_id) if dc_id != 0 && dc_id != client.home_dc_id() => {
            let sender = senders
                .get_or_try_insert_with(dc_id, || client.export_sender(dc_id))
                .await?;
            client.get_file_hashes(Some(&sender), location, 0).await?
        }
        _ => client.get_file_hashes(None, location, 0).await?,
    };

    let mut hasher = blake3::Hasher::new();
    for part in &hashes {
        hasher.update(&part.hash);
    }
    Ok(*hasher.finalize().as_bytes())
}

/// Distinct hashtags of a message, ordered case-insensitively.
pub fn parse_hashtags(message: &Message) -> Vec<String> {
    let tags: BTreeSet<String> = message
        .entities
        .iter()
        .filter(|entity| entity.kind == MessageEntityKind::Hashtag)
        .map(|entity| message.inner_text(entity))
        .collect();
    let mut tags: Vec<String> = tags.into_iter().collect();
    tags.sort_by_cached_key(|tag| tag.to_lowercase());
    tags
}

pub fn parse_entity(entity: &Entity) -> ParsedEntity {
    let (title, username) = match entity {
        Entity::User(user) => {
            let title = [&user.first_name, &user.last_name]
                .into_iter()
                .flatten()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" ");
            let username = user
                .username
                .clone()
                .or_else(|| user.usernames.first().map(|u| u.username.clone()));
            (title, username)
        }
        Entity::Channel(channel) => {
            let username = channel
                .username
                .clone()
                .or_else(|| channel.usernames.first().map(|u| u.username.clone()));
            (channel.title.clone(), username)
        }
        Entity::Chat(chat) => (chat.title.clone(), None),
        Entity::ChatForbidden { title, .. } | Entity::ChannelForbidden { title, .. } => {
            (title.clone(), None)
        }
        Entity::UserEmpty { .. } | Entity::ChatEmpty { .. } => (String::new(), None),
    };

    ParsedEntity {
        class: entity.class_name(),
        title,
        username: username.unwrap_or_default(),
        id: entity.id(),
    }
}

/// Dimensions, duration, size and type of a file-bearing media.
///
/// Returns `None` for media without a file.
pub fn get_file_attr(media: &Media) -> Option<FileAttribute> {
    let mut attr = FileAttribute {
        width: None,
        height: None,
        duration: None,
        size: None,
        file_type: FileType::Other,
        id: media.id()?,
    };

    match media {
        Media::Document { document } => {
            attr.size = Some(document.size);
            for attribute in &document.attributes {
                if let DocumentAttribute::Video { w, h, duration } = attribute {
                    attr.file_type = FileType::Video;
                    attr.duration = Some(*duration);
                    attr.width = Some(*w);
                    attr.height = Some(*h);
                }
            }
        }
        Media::Photo { photo } => {
            attr.file_type = FileType::Image;
            for size in &photo.sizes {
                if let PhotoSize::Progressive { w, h, sizes, .. } = size {
                    attr.width = Some(*w);
                    attr.height = Some(*h);
                    attr.size = sizes.last().map(|s| i64::from(*s));
                }
            }
        }
        Media::Unsupported => return None,
    }
    Some(attr)
}

pub async fn get_entity_stats<C: TelegramClient>(client: &C, entity: &Entity) -> Result<EntityStats> {
    let parsed = parse_entity(entity);
    let medias = client
        .count_messages(entity, Some(MessageFilter::PhotoVideo))
        .await?
        .unwrap_or(0);
    let files = client
        .count_messages(entity, Some(MessageFilter::Document))
        .await?
        .unwrap_or(0);
    let messages = client.count_messages(entity, None).await?.unwrap_or(-1);

    Ok(EntityStats {
        class: parsed.class.to_string(),
        title: parsed.title,
        username: parsed.username,
        id: parsed.id,
        medias,
        files,
        messages,
    })
}

/// Messages of a conversation paired with their position in a reply thread.
///
/// Top-level messages come with `None`. With `with_reply` set, a message
/// that has replies is followed by its whole thread, numbered from `0`.
pub fn iter_messages<'a, C: TelegramClient>(
    client: &'a C,
    entity: &'a Entity,
    params: IterMessages,
) -> impl Stream<Item = Result<(Message, Option<u32>)>> + Send + 'a {
    try_stream! {
        let mut history = client.iter_messages(
            entity,
            HistoryRequest {
                ids: params.ids,
                max_id: params.max_id,
                min_id: params.min_id,
                wait_time: params.wait_time,
                reverse: params.reverse,
                ..Default::default()
            },
        );

        while let Some(message) = history.next().await {
            let message = match message? {
                Some(message) => message,
                None => continue,
            };
            let message_id = message.id;
            let follow_thread = params.with_reply && message.reply_count() > 0;
            yield (message, None);

            if !follow_thread {
                continue;
            }
            let mut thread = client.iter_messages(
                entity,
                HistoryRequest {
                    wait_time: params.wait_time,
                    reply_to: Some(message_id),
                    ..Default::default()
                },
            );
            let mut reply_id: u32 = 0;
            while let Some(reply) = thread.next().await {
                let reply = match reply? {
                    Some(reply) => reply,
                    None => continue,
                };
                yield (reply, Some(reply_id));
                reply_id += 1;
            }
        }
    }
}
