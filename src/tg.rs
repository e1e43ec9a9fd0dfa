//! Client seam, remote object model and the utilities built on them.

pub mod cache;
pub mod client;
pub mod entities;
pub mod media;
pub mod messages;
pub mod utils;

pub use cache::{EntityCache, SenderRegistry, SessionCache};
pub use client::{HistoryRequest, MessageFilter, MessageStream, TelegramClient};
pub use entities::{Channel, Chat, Entity, EntityRef, Peer, User, Username};
pub use media::{Document, DocumentAttribute, FileHash, InputFileLocation, Media, Photo, PhotoSize};
pub use messages::{
    Message, MessageEntity, MessageEntityKind, MessageReactions, MessageReplies, ReactionCount,
};
pub use utils::{
    get_entity_stats, get_file_attr, get_file_hash, iter_messages, parse_entity, parse_hashtags,
    resolve_entity, resolve_entity_with_stats, IterMessages, ParsedEntity, ResolvedEntity,
};
