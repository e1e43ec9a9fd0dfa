use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use super::entities::{Entity, EntityRef, Peer};
use super::media::{FileHash, InputFileLocation};
use super::messages::Message;
use crate::error::Result;

/// Server-side search filters used for counting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageFilter {
    PhotoVideo,
    Document,
}

/// One history request handed to the client's own paginator.
///
/// `max_id`/`min_id` are exclusive bounds where `0` means unbounded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HistoryRequest {
    pub ids: Option<i32>,
    pub max_id: i32,
    pub min_id: i32,
    pub wait_time: Option<Duration>,
    pub reverse: bool,
    pub reply_to: Option<i32>,
    pub limit: Option<usize>,
}

/// Messages in request order. `None` marks an id that was asked for but does
/// not exist.
pub type MessageStream<'a> = BoxStream<'a, Result<Option<Message>>>;

/// The MTProto client the utilities are layered on.
///
/// Connection handling, flood-wait backoff and pagination cursors all live
/// behind this trait.
#[async_trait]
pub trait TelegramClient: Send + Sync {
    /// Connection to a foreign data center, as handed out by
    /// [`export_sender`](Self::export_sender).
    type Sender: Clone + Send + Sync;

    /// The data center the session is logged into.
    fn home_dc_id(&self) -> i32;

    async fn get_entity(&self, entity: &EntityRef) -> Result<Entity>;

    fn iter_messages<'a>(&'a self, entity: &'a Entity, request: HistoryRequest)
        -> MessageStream<'a>;

    /// Total number of messages matching `filter`, when the server reports one.
    async fn count_messages(
        &self,
        entity: &Entity,
        filter: Option<MessageFilter>,
    ) -> Result<Option<i64>>;

    async fn get_message(&self, peer: &Peer, id: i32) -> Result<Option<Message>>;

    async fn export_sender(&self, dc_id: i32) -> Result<Self::Sender>;

    /// Part hashes of a stored file starting at `offset`. Sent through
    /// `sender` when one is given, otherwise through the home connection.
    async fn get_file_hashes(
        &self,
        sender: Option<&Self::Sender>,
        location: &InputFileLocation,
        offset: i64,
    ) -> Result<Vec<FileHash>>;

    async fn iter_dialogs(&self) -> Result<Vec<Entity>>;

    /// Download the message's media (or its largest thumbnail) to `path`.
    async fn download_media(&self, message: &Message, path: &Path, thumb: bool) -> Result<()>;
}
