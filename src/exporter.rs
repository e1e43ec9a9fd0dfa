//! Chat exports as JSON lines, optionally mirrored into the archive.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::{write::GzEncoder, Compression};
use futures_util::{pin_mut, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::config::ExporterOptions;
use crate::database::{self, queries};
use crate::error::{Error, Result};
use crate::export::{message_document, MessageExport};
use crate::tg::{
    get_entity_stats, iter_messages, parse_entity, resolve_entity, Entity, EntityRef, IterMessages,
    SessionCache, TelegramClient,
};
use crate::types::{DbConn, HandlerResult};

/// One finished chat export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatExport {
    pub path: PathBuf,
    /// Top-level messages written.
    pub messages: usize,
    /// Thread replies written.
    pub replies: usize,
}

/// Where export lines go. Gzip output is compressed in memory and written
/// out on [`finish`](ChatSink::finish).
enum ChatSink {
    Plain(BufWriter<tokio::fs::File>),
    Gzip { path: PathBuf, encoder: GzEncoder<Vec<u8>> },
}

impl ChatSink {
    async fn create(path: &Path, gzip: bool) -> Result<ChatSink> {
        if gzip {
            return Ok(ChatSink::Gzip {
                path: path.to_path_buf(),
                encoder: GzEncoder::new(Vec::new(), Compression::best()),
            });
        }
        let file = tokio::fs::File::create(path).await?;
        Ok(ChatSink::Plain(BufWriter::new(file)))
    }

    async fn write_line(&mut self, line: &[u8]) -> Result<()> {
        match self {
            ChatSink::Plain(out) => {
                out.write_all(line).await?;
                out.write_all(b"\n").await?;
            }
            ChatSink::Gzip { encoder, .. } => {
                encoder.write_all(line)?;
                encoder.write_all(b"\n")?;
            }
        }
        Ok(())
    }

    async fn finish(self) -> Result<()> {
        match self {
            ChatSink::Plain(mut out) => out.flush().await?,
            ChatSink::Gzip { path, encoder } => {
                let compressed = encoder.finish()?;
                tokio::fs::write(path, compressed).await?;
            }
        }
        Ok(())
    }
}

fn describe(entity: &Entity) -> String {
    let parsed = parse_entity(entity);
    if parsed.username.is_empty() {
        parsed.id.to_string()
    } else {
        format!("@{}", parsed.username)
    }
}

pub struct Exporter<C: TelegramClient> {
    client: C,
    cache: SessionCache<C::Sender>,
    db: Option<DbConn>,
    options: ExporterOptions,
}

impl<C: TelegramClient> Exporter<C> {
    /// `db` receives the flattened rows when `to_db` is set.
    pub fn new(client: C, db: Option<DbConn>, options: ExporterOptions) -> Self {
        Exporter {
            client,
            cache: SessionCache::default(),
            db,
            options,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn options(&self) -> &ExporterOptions {
        &self.options
    }

    fn archive(&self) -> Result<Option<&DbConn>> {
        match (&self.db, self.options.to_db) {
            (Some(db), true) => Ok(Some(db)),
            (None, true) => Err(Error::InvalidInput("to_db is set but no archive is open".to_string())),
            (_, false) => Ok(None),
        }
    }

    /// Export the given chats, or every dialog above `min_ratio` when `ids`
    /// is empty. A chat that fails is logged and skipped.
    pub async fn run(&self, ids: &[EntityRef]) -> HandlerResult<Vec<ChatExport>> {
        if let Some(db) = self.archive()? {
            database::prepare(db).await?;
        }

        if ids.is_empty() {
            return self.export_dialogs(self.options.min_ratio).await;
        }

        let mut exports = Vec::new();
        for id in ids {
            let result = async {
                let entity = resolve_entity(&self.client, &self.cache.entities, id).await?;
                self.export_chat(&entity, &describe(&entity)).await
            }
            .await;
            match result {
                Ok(export) => exports.push(export),
                Err(err) => log::warn!("skipping input: {} due to error: {}", id, err),
            }
        }
        Ok(exports)
    }

    /// Write every message of `entity`, replies included, to
    /// `<export_path>/<desc>.json` (`.json.gz` with gzip).
    pub async fn export_chat(&self, entity: &Entity, desc: &str) -> Result<ChatExport> {
        let total = self.client.count_messages(entity, None).await?;
        log::info!("exporting {} ({} messages)", desc, total.unwrap_or(0));

        let archive = self.archive()?;
        tokio::fs::create_dir_all(&self.options.export_path).await?;
        let file_name = if self.options.gzip {
            format!("{}.json.gz", desc)
        } else {
            format!("{}.json", desc)
        };
        let path = self.options.export_path.join(file_name);
        let mut sink = ChatSink::create(&path, self.options.gzip).await?;

        let messages = iter_messages(
            &self.client,
            entity,
            IterMessages {
                wait_time: self.options.wait_time,
                ..Default::default()
            },
        );
        pin_mut!(messages);

        let progress = self.progress_bar(desc, total);
        let mut export = ChatExport {
            path,
            messages: 0,
            replies: 0,
        };
        while let Some(item) = messages.next().await {
            let (mut message, reply_id) = item?;
            progress.inc(1);
            match reply_id {
                None => export.messages += 1,
                Some(_) => export.replies += 1,
            }

            let line = serde_json::to_vec(&message_document(&message, entity)?)?;
            sink.write_line(&line).await?;

            if let Some(db) = archive {
                if message.chat.is_none() {
                    message.chat = Some(entity.clone());
                }
                queries::export_message(db, &MessageExport::from_message(&message)).await?;
            }
        }
        sink.finish().await?;
        progress.finish_and_clear();

        log::debug!(
            "exported {} messages and {} replies to {:?}",
            export.messages,
            export.replies,
            export.path
        );
        Ok(export)
    }

    // Bar over the message count when known, a spinner otherwise
    fn progress_bar(&self, desc: &str, total: Option<i64>) -> ProgressBar {
        if !self.options.progress {
            return ProgressBar::hidden();
        }
        let (pb, template) = match total.and_then(|n| u64::try_from(n).ok()) {
            Some(len) => (
                ProgressBar::new(len),
                "{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len}",
            ),
            None => (ProgressBar::new_spinner(), "{spinner:.green} {prefix} {pos} [{elapsed_precise}]"),
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template(template)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_prefix(desc.to_string());
        pb
    }

    /// Export every dialog whose media to message ratio is above
    /// `min_ratio`. Private channels are skipped silently, other failures
    /// are logged.
    pub async fn export_dialogs(&self, min_ratio: f64) -> HandlerResult<Vec<ChatExport>> {
        let mut exports = Vec::new();
        for dialog in self.client.iter_dialogs().await? {
            match self.export_dialog(&dialog, min_ratio).await {
                Ok(Some(export)) => exports.push(export),
                Ok(None) => {}
                Err(Error::ChannelPrivate) => continue,
                Err(err) => log::warn!("skipping {} due to error: {}", dialog.peer(), err),
            }
        }
        Ok(exports)
    }

    async fn export_dialog(&self, dialog: &Entity, min_ratio: f64) -> Result<Option<ChatExport>> {
        let entity = resolve_entity(&self.client, &self.cache.entities, dialog).await?;
        let stats = get_entity_stats(&self.client, &entity).await?;
        let ratio = stats.ratio();
        let repr = format!(
            "{}(id={}, username={:?}, title={:?}, messages={}, media={}, documents={}, ratio={:.3})",
            stats.class, stats.id, stats.username, stats.title, stats.messages, stats.medias, stats.files, ratio
        );

        if ratio > min_ratio {
            log::debug!("processing {}", repr);
            Ok(Some(self.export_chat(&entity, &describe(&entity)).await?))
        } else {
            log::debug!("skipping {}", repr);
            Ok(None)
        }
    }
}
