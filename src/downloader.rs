//! Media downloads with archive-backed de-duplication.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use futures_util::stream::FuturesUnordered;
use futures_util::{pin_mut, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::DownloaderOptions;
use crate::database::{self, queries, ArchiveRecord};
use crate::error::{Error, Result};
use crate::export::message_document;
use crate::input::{InputFile, LineStatus};
use crate::links::{parse_id_ranges, parse_url_group, IdRange};
use crate::tg::{
    get_file_attr, get_file_hash, iter_messages, parse_entity, resolve_entity, Entity, EntityRef,
    IterMessages, Message, ParsedEntity, SessionCache, TelegramClient,
};
use crate::types::{DbConn, FileAttribute, HandlerResult};

pub mod paths;

pub use paths::{message_repr, part_path, PathResolver, TargetPaths};

/// Why a message was not downloaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    NoFile,
    TargetExists,
    /// Already downloaded from the message named here.
    DuplicateId(String),
    DuplicateHash(String),
    DuplicateAttribute(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Downloaded,
    Skipped(SkipReason),
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadResult {
    pub message_id: i32,
    pub reply_id: Option<u32>,
    pub repr: String,
    pub target: Option<PathBuf>,
    pub outcome: Outcome,
}

impl DownloadResult {
    pub fn success(&self) -> bool {
        self.outcome == Outcome::Downloaded
    }
}

/// The message history broke off part way. `results` holds everything that
/// finished before it did.
#[derive(Debug, thiserror::Error)]
#[error("{error} (after {} messages)", .results.len())]
pub struct Interrupted {
    #[source]
    pub error: Error,
    pub results: Vec<DownloadResult>,
}

/// What to download.
#[derive(Clone, Debug, PartialEq)]
pub enum Mode {
    /// One chat and a list of id ranges.
    Ids { entity: EntityRef, ranges: Vec<IdRange> },
    /// Message links; each downloads from that message onward, or only that
    /// message with `single_url`.
    Urls(Vec<(EntityRef, i32)>),
    /// A file of message links, one per line.
    File(PathBuf),
}

/// Ask for a chat and the ids to fetch from it.
pub fn prompt_ids<R: BufRead, W: Write>(mut input: R, mut output: W) -> Result<Mode> {
    let mut read = |prompt: &str| -> Result<String> {
        write!(output, "{}", prompt)?;
        output.flush()?;
        let mut line = String::new();
        input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    };

    let entity = read("peer/entity id: ")?;
    if entity.is_empty() {
        return Err(Error::InvalidInput("not enough input".to_string()));
    }
    let ranges = parse_id_ranges(&read("message ids: ")?)?;
    Ok(Mode::Ids {
        entity: EntityRef::from(entity),
        ranges,
    })
}

enum Checked {
    Skip(SkipReason, Option<PathBuf>),
    Download(Job),
}

struct Job {
    message: Message,
    attr: FileAttribute,
    paths: TargetPaths,
}

pub struct Downloader<C: TelegramClient> {
    client: C,
    cache: SessionCache<C::Sender>,
    db: DbConn,
    options: DownloaderOptions,
    paths: PathResolver,
}

impl<C: TelegramClient> Downloader<C> {
    pub fn new(client: C, db: DbConn, options: DownloaderOptions) -> Self {
        let paths = PathResolver::new(options.download_path.clone(), options.thumbs_only);
        Downloader {
            client,
            cache: SessionCache::default(),
            db,
            options,
            paths,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn cache(&self) -> &SessionCache<C::Sender> {
        &self.cache
    }

    pub fn options(&self) -> &DownloaderOptions {
        &self.options
    }

    pub async fn run(&self, mode: Mode) -> HandlerResult<Vec<DownloadResult>> {
        database::prepare(&self.db).await?;
        log::debug!("Running downloader with {:?}", mode);

        match mode {
            Mode::Ids { entity, ranges } => self.run_ids(entity, &ranges).await,
            Mode::Urls(urls) => self.run_urls(&urls).await,
            Mode::File(path) => {
                let mut input = InputFile::open(&path).await?;
                self.run_file(&mut input).await
            }
        }
    }

    pub async fn run_ids(
        &self,
        entity: impl Into<EntityRef>,
        ranges: &[IdRange],
    ) -> HandlerResult<Vec<DownloadResult>> {
        let entity_ref = entity.into();
        let entity = resolve_entity(&self.client, &self.cache.entities, &entity_ref).await?;
        log::debug!("processing entity {} as {}", entity_ref, entity.peer());

        let mut results = Vec::new();
        for range in ranges {
            log::debug!("processing {:?}", range);
            match self.process(&entity, self.range_params(*range)).await {
                Ok(batch) => results.extend(batch),
                Err(mut interrupted) => {
                    results.append(&mut interrupted.results);
                    interrupted.results = results;
                    return Err(interrupted.into());
                }
            }
        }
        Ok(results)
    }

    pub async fn run_urls(&self, urls: &[(EntityRef, i32)]) -> HandlerResult<Vec<DownloadResult>> {
        let mut results = Vec::new();
        for (entity, message_id) in urls {
            let range = if self.options.single_url {
                IdRange::Single(*message_id)
            } else {
                IdRange::Span {
                    min_id: message_id.saturating_sub(1),
                    max_id: 0,
                }
            };
            match self.run_ids(entity, &[range]).await {
                Ok(batch) => results.extend(batch),
                Err(err) => match err.downcast::<Interrupted>() {
                    Ok(interrupted) => {
                        log::warn!("{}/{} stopped early: {}", entity, message_id, interrupted);
                        results.extend(interrupted.results);
                    }
                    Err(err) => log::warn!("skipping {}/{} due to error: {:?}", entity, message_id, err),
                },
            }
        }
        Ok(results)
    }

    /// Download every line of `input` and record the outcome on the line.
    /// The file is rewritten even when a line fails.
    pub async fn run_file(&self, input: &mut InputFile) -> HandlerResult<Vec<DownloadResult>> {
        let mut results = Vec::new();
        for (lnum, line) in input.pending() {
            let status = match self.process_line(&line).await {
                Ok(batch) => {
                    let status = line_status(&batch);
                    results.extend(batch);
                    status
                }
                Err(err) => {
                    log::warn!("line {}: {}", lnum, err);
                    Some(match err {
                        LineError::Entity(_) => LineStatus::EntityError,
                        LineError::Other(_) => LineStatus::Failed,
                        LineError::Interrupted(interrupted) => {
                            results.extend(interrupted.results);
                            LineStatus::Failed
                        }
                    })
                }
            };
            if let Some(status) = status {
                input.set_status(lnum, status);
            }
        }
        input.write().await?;
        Ok(results)
    }

    async fn process_line(&self, line: &str) -> Result<Vec<DownloadResult>, LineError> {
        let (entity, message_id) = parse_url_group(line).map_err(LineError::Other)?;
        let entity = resolve_entity(&self.client, &self.cache.entities, entity)
            .await
            .map_err(LineError::Entity)?;
        self.process(
            &entity,
            IterMessages {
                ids: Some(message_id),
                wait_time: self.options.wait_time,
                ..Default::default()
            },
        )
        .await
        .map_err(LineError::Interrupted)
    }

    fn range_params(&self, range: IdRange) -> IterMessages {
        IterMessages {
            wait_time: self.options.wait_time,
            ..range.to_params(self.options.reverse_download)
        }
    }

    /// Validate and download every message `params` selects, with at most
    /// `download_threads` of them in flight.
    ///
    /// When the history fails part way, the messages already taken from it
    /// are still finished and returned inside [`Interrupted`].
    pub async fn process(
        &self,
        entity: &Entity,
        params: IterMessages,
    ) -> Result<Vec<DownloadResult>, Interrupted> {
        let limit = self.options.download_threads.max(1);
        let messages = iter_messages(&self.client, entity, params);
        pin_mut!(messages);

        let progress = self.progress_bar(entity);
        let mut tasks = FuturesUnordered::new();
        let mut results = Vec::new();
        let mut exhausted = false;
        let mut failure = None;

        loop {
            tokio::select! {
                Some(result) = tasks.next(), if !tasks.is_empty() => {
                    let result: DownloadResult = result;
                    progress.inc(1);
                    progress.set_message(result.repr.clone());
                    results.push(result);
                }
                item = messages.next(), if !exhausted && tasks.len() < limit => match item {
                    Some(Ok((message, reply_id))) => tasks.push(self.validate(message, entity, reply_id)),
                    Some(Err(err)) => {
                        log::error!("fetching messages from {} failed: {}", entity.peer(), err);
                        failure = Some(err);
                        exhausted = true;
                    }
                    None => exhausted = true,
                },
                else => break,
            }
        }
        progress.finish_and_clear();

        match failure {
            Some(error) => {
                log::warn!(
                    "{} messages from {} were processed before the failure",
                    results.len(),
                    entity.peer()
                );
                Err(Interrupted { error, results })
            }
            None => Ok(results),
        }
    }

    fn progress_bar(&self, entity: &Entity) -> ProgressBar {
        if !self.options.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {prefix} {pos} done [{elapsed_precise}] {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_prefix(parse_entity(entity).title);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }

    async fn validate(&self, message: Message, entity: &Entity, reply_id: Option<u32>) -> DownloadResult {
        let chat = parse_entity(entity);
        let repr = message_repr(message.id, reply_id, &chat);
        let message_id = message.id;

        let (target, outcome) = match self.check(message.clone(), &chat, reply_id, &repr).await {
            Ok(Checked::Download(job)) => {
                let target = job.paths.target.clone();
                (Some(target), self.download(job, entity, &repr).await)
            }
            Ok(Checked::Skip(reason, meta)) => {
                if let Some(meta) = meta.filter(|_| self.options.always_write_meta) {
                    if let Err(err) = write_meta(&message, entity, &meta).await {
                        log::warn!("{}: unable to write meta: {}", repr, err);
                    }
                }
                (None, Outcome::Skipped(reason))
            }
            Err(err) => {
                log::warn!("{}: validation failed: {}", repr, err);
                (None, Outcome::Failed(err.to_string()))
            }
        };

        DownloadResult {
            message_id,
            reply_id,
            repr,
            target,
            outcome,
        }
    }

    async fn check(
        &self,
        message: Message,
        chat: &ParsedEntity,
        reply_id: Option<u32>,
        repr: &str,
    ) -> Result<Checked> {
        let (file_name, ext, attr) = match message.file() {
            Some(file) => match get_file_attr(file) {
                Some(attr) => (file.file_name().map(str::to_string), file.extension(), attr),
                None => return Ok(Checked::Skip(SkipReason::NoFile, None)),
            },
            None => {
                log::debug!("{}: message does not have any file", repr);
                return Ok(Checked::Skip(SkipReason::NoFile, None));
            }
        };
        let paths = self.paths.resolve(
            chat.id,
            &chat.username,
            message.id,
            reply_id,
            file_name.as_deref(),
            &ext,
            attr.file_type,
        );

        if !self.options.overwrite && paths.target.exists() {
            log::debug!("{}: target file already exists, skipping download", repr);
            if let Err(err) = queries::set_complete(&self.db, attr.id).await {
                log::debug!("{}: unable to mark complete: {}", repr, err);
            }
            return Ok(Checked::Skip(SkipReason::TargetExists, Some(paths.meta)));
        }

        if let Some(msg) = queries::check_id(&self.db, attr.id).await? {
            log::debug!("{}: duplicate file id with message {}, skipping download", repr, msg);
            return Ok(Checked::Skip(SkipReason::DuplicateId(msg), Some(paths.meta)));
        }

        let (message, hash) = match self.file_hash(message, repr).await? {
            Some(hashed) => hashed,
            None => return Ok(Checked::Skip(SkipReason::NoFile, None)),
        };

        match queries::check_attr(&self.db, &hash, attr.width, attr.height, attr.size, attr.duration).await? {
            // an earlier run recorded this very message but never finished it
            Some(found) if found.downloaded.is_none() && found.msg == repr => {}
            Some(found) if found.hash == hash => {
                log::debug!("{}: duplicate file hash with message {}, skipping download", repr, found.msg);
                return Ok(Checked::Skip(SkipReason::DuplicateHash(found.msg), Some(paths.meta)));
            }
            Some(found) => {
                log::debug!("{}: duplicate attribute with message {}, skipping download", repr, found.msg);
                return Ok(Checked::Skip(SkipReason::DuplicateAttribute(found.msg), Some(paths.meta)));
            }
            None => {
                queries::update_archive(
                    &self.db,
                    &ArchiveRecord {
                        file_id: attr.id,
                        msg: repr.to_string(),
                        msg_id: message.id,
                        chat_id: chat.id,
                        chat_username: Some(chat.username.clone()).filter(|u| !u.is_empty()),
                        hash: hash.clone(),
                        width: attr.width,
                        height: attr.height,
                        size: attr.size,
                        duration: attr.duration,
                        file_type: attr.file_type,
                    },
                )
                .await?;
            }
        }

        Ok(Checked::Download(Job { message, attr, paths }))
    }

    /// Hash of the message's file, refetching the message once when its file
    /// reference expired. Falls back to a digest of the media id when the
    /// server cannot hash the file. `None` when the refetched message lost
    /// its file.
    async fn file_hash(&self, message: Message, repr: &str) -> Result<Option<(Message, Vec<u8>)>> {
        match self.remote_hash(&message).await {
            Ok(hash) => Ok(Some((message, hash))),
            Err(Error::FileReferenceExpired) => {
                log::debug!("{}: file reference expired, refetching", repr);
                let refetched = match self.client.get_message(&message.peer_id, message.id).await? {
                    Some(refetched) if refetched.file().is_some() => Message {
                        sender: refetched.sender.clone().or(message.sender),
                        chat: refetched.chat.clone().or(message.chat),
                        ..refetched
                    },
                    _ => return Ok(None),
                };
                let hash = match self.remote_hash(&refetched).await {
                    Ok(hash) => hash,
                    Err(err) => {
                        log::warn!("{}: unable to get file hash: {}", repr, err);
                        fallback_hash(&refetched)
                    }
                };
                Ok(Some((refetched, hash)))
            }
            Err(Error::UnsupportedMedia(reason)) => {
                log::warn!("{}: unable to get file hash: {}", repr, reason);
                let hash = fallback_hash(&message);
                Ok(Some((message, hash)))
            }
            Err(err) => Err(err),
        }
    }

    async fn remote_hash(&self, message: &Message) -> Result<Vec<u8>> {
        let media = message
            .file()
            .ok_or_else(|| Error::UnsupportedMedia(format!("message {} has no file", message.id)))?;
        let (dc_id, location) = media.input_location(false)?;
        let hash = get_file_hash(&self.client, &self.cache.senders, Some(dc_id), &location).await?;
        Ok(hash.to_vec())
    }

    async fn download(&self, job: Job, entity: &Entity, repr: &str) -> Outcome {
        let part = part_path(&job.paths.target);
        log::debug!("downloading {} as {:?}", repr, job.paths.target.file_name());

        match self.fetch(&job, entity, &part).await {
            Ok(()) => {
                log::info!("{}: file downloaded", repr);
                Outcome::Downloaded
            }
            Err(err) => {
                log::error!("{}: download file error: {}", repr, err);
                match tokio::fs::remove_file(&part).await {
                    Ok(()) => log::debug!("{}: incomplete download, file deleted", repr),
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                    Err(err) => log::warn!("{}: unable to delete {:?}: {}", repr, part, err),
                }
                Outcome::Failed(err.to_string())
            }
        }
    }

    async fn fetch(&self, job: &Job, entity: &Entity, part: &Path) -> Result<()> {
        if let Some(parent) = job.paths.target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.client
            .download_media(&job.message, part, self.options.thumbs_only)
            .await?;
        tokio::fs::rename(part, &job.paths.target).await?;
        write_meta(&job.message, entity, &job.paths.meta).await?;
        queries::set_complete(&self.db, job.attr.id).await?;
        Ok(())
    }
}

enum LineError {
    Entity(Error),
    Other(Error),
    Interrupted(Interrupted),
}

impl std::fmt::Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineError::Entity(err) => write!(f, "entity error: {}", err),
            LineError::Other(err) => write!(f, "{}", err),
            LineError::Interrupted(err) => write!(f, "{}", err),
        }
    }
}

// Lines with nothing downloaded and nothing failed stay pending.
fn line_status(results: &[DownloadResult]) -> Option<LineStatus> {
    if results.iter().any(|r| matches!(r.outcome, Outcome::Failed(_))) {
        Some(LineStatus::Failed)
    } else if results.iter().any(DownloadResult::success) {
        Some(LineStatus::Done)
    } else {
        None
    }
}

fn fallback_hash(message: &Message) -> Vec<u8> {
    let id = message.file().and_then(|media| media.id()).unwrap_or_default();
    blake3::hash(&id.to_be_bytes()).as_bytes().to_vec()
}

/// Pretty JSON of the message next to the download.
pub async fn write_meta(message: &Message, entity: &Entity, path: &Path) -> Result<()> {
    let document = message_document(message, entity)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, serde_json::to_vec_pretty(&document)?).await?;
    Ok(())
}
